use std::sync::Arc;

use log::{info, warn};
use tokio::sync::mpsc;

use crate::backend::LauncherBackend;
use crate::events::{BackendEvent, EventIngestor};
use crate::install::InstallInfo;
use crate::networking::NetworkModeGate;
use crate::news::NewsFeed;
use crate::notifications::NotificationQueue;
use crate::session::AccountSessionManager;
use crate::settings::LauncherSettings;
use crate::storage::models::UpdateCodeMap;
use crate::updater::UpdateCoordinator;

pub mod error;
pub mod models;
pub mod state;

/// Every coordinator the launcher UI talks to, wired to one backend.
pub struct LauncherContext {
    pub network: NetworkModeGate,
    pub accounts: AccountSessionManager,
    pub updates: Arc<UpdateCoordinator>,
    pub install: InstallInfo,
    pub settings: LauncherSettings,
    pub news: Arc<NewsFeed>,
    pub notifications: NotificationQueue,
}

impl LauncherContext {
    pub fn new(backend: Arc<dyn LauncherBackend>, codes: UpdateCodeMap) -> Self {
        Self {
            network: NetworkModeGate::new(backend.clone()),
            accounts: AccountSessionManager::new(backend.clone()),
            updates: Arc::new(UpdateCoordinator::new(backend.clone(), codes)),
            install: InstallInfo::new(backend.clone()),
            settings: LauncherSettings::new(backend.clone()),
            news: Arc::new(NewsFeed::new(backend)),
            notifications: NotificationQueue::default(),
        }
    }

    /// Ingestor feeding pushed events into this context's update session and news feed.
    pub fn ingestor(&self, rx: mpsc::UnboundedReceiver<BackendEvent>) -> EventIngestor {
        EventIngestor::new(rx, self.updates.clone(), self.news.clone())
    }

    /// Startup sequence: network mode, session, install info and settings, then (online only)
    /// the update check and a news refresh. Nothing here fails the launcher; an
    /// update check failure becomes an error toast.
    pub async fn bootstrap(&self) {
        info!("bootstrap: probing network mode");
        self.network.check_network_mode(false, "startup").await;

        if self.accounts.check_session_info().await {
            info!("bootstrap: session restored");
        }
        self.install.fetch_install_info().await;
        self.settings.fetch_settings().await;

        if self.network.is_offline() {
            warn!("bootstrap: offline, skipping update check and news");
            return;
        }
        match self.updates.check_for_updates(false).await {
            Ok(Some(_)) => info!("bootstrap: update available"),
            Ok(None) => info!("bootstrap: up to date"),
            Err(err) => {
                self.notifications.show_error(format!("Update check failed: {err}"));
            }
        }
        self.news.refresh().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::backend::BackendCall;
    use crate::backend::testing::{ScriptedBackend, failure};
    use crate::engine::models::{Account, BackendProfile};
    use crate::events::{EventPayload, EventSink};
    use crate::notifications::NotificationKind;

    fn context(backend: &Arc<ScriptedBackend>) -> LauncherContext {
        LauncherContext::new(backend.clone(), UpdateCodeMap::default())
    }

    #[tokio::test]
    async fn bootstrap_online_loads_everything() {
        let backend = Arc::new(ScriptedBackend::default());
        *backend.logged_in.lock().expect("lock") = Ok(true);
        *backend.account.lock().expect("lock") = Ok(Some(Account {
            profiles: vec![BackendProfile {
                uuid: "u-1".into(),
                name: "Steve".into(),
            }],
            selected_profile: Some("u-1".into()),
        }));
        backend.push_update_code(Ok(1));
        let ctx = context(&backend);

        ctx.bootstrap().await;

        assert!(!ctx.network.is_offline());
        assert_eq!(
            backend.last_network_reason.lock().expect("lock").as_deref(),
            Some("startup")
        );
        assert!(ctx.accounts.is_logged_in());
        assert_eq!(
            ctx.accounts.current_profile().map(|p| p.username),
            Some("Steve".to_owned())
        );
        assert!(ctx.updates.availability().is_some());
        assert_eq!(ctx.settings.snapshot().memory.map(|m| m.max_mb), Some(16384));
        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
        assert!(ctx.notifications.visible().is_empty());
    }

    #[tokio::test]
    async fn bootstrap_offline_skips_update_check() {
        let backend = Arc::new(ScriptedBackend::default());
        *backend.network.lock().expect("lock") = Ok(true);
        let ctx = context(&backend);

        ctx.bootstrap().await;

        assert!(ctx.network.is_offline());
        assert!(!ctx.accounts.is_logged_in());
        assert_eq!(ctx.updates.availability(), None);
        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 0);
        assert!(ctx.notifications.visible().is_empty());
    }

    #[tokio::test]
    async fn failed_update_check_becomes_error_toast() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_update_code(Err(failure(BackendCall::CheckForUpdates)));
        let ctx = context(&backend);

        ctx.bootstrap().await;

        let toasts = ctx.notifications.visible();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].kind, NotificationKind::Error);
        assert!(toasts[0].message.contains("CheckForUpdates"));
        assert_eq!(ctx.updates.availability(), None);
    }

    #[tokio::test]
    async fn ingestor_routes_into_context_state() {
        let backend = Arc::new(ScriptedBackend::default());
        let ctx = context(&backend);
        let (sink, rx) = EventSink::channel();
        let mut ingestor = ctx.ingestor(rx);

        sink.emit(EventPayload::FeedUpdated { articles: Vec::new() });
        sink.emit(EventPayload::UpdateFailed {
            reason: "disk full".into(),
        });
        assert_eq!(ingestor.drain(), 2);
        assert!(!ctx.updates.session().is_running);
    }
}
