use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::watch;

use crate::backend::LauncherBackend;
use crate::engine::error::CoordinatorError;
use crate::engine::state::{AccountSession, UserProfile};
use crate::util::Generation;

/// Local view of the logged-in account and its profiles.
///
/// Account refreshes are best-effort; `logout` and `set_user_profile` invalidate any
/// refresh still in flight so an older backend snapshot cannot resurrect stale state.
pub struct AccountSessionManager {
    backend: Arc<dyn LauncherBackend>,
    session: watch::Sender<AccountSession>,
    load_generation: Generation,
}

impl AccountSessionManager {
    pub fn new(backend: Arc<dyn LauncherBackend>) -> Self {
        let (session, _) = watch::channel(AccountSession::default());
        Self {
            backend,
            session,
            load_generation: Generation::default(),
        }
    }

    pub fn snapshot(&self) -> AccountSession {
        self.session.borrow().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.borrow().is_logged_in()
    }

    pub fn current_profile(&self) -> Option<UserProfile> {
        self.session.borrow().current_profile().cloned()
    }

    /// Refresh the account from the backend. Failures are logged and leave the
    /// previous session untouched.
    pub async fn load(&self) {
        let token = self.load_generation.next();
        let account = match self.backend.get_account().await {
            Ok(Some(account)) => account,
            Ok(None) => {
                debug!("session: backend reports no account");
                return;
            }
            Err(err) => {
                error!("session: failed to load account: {err}");
                return;
            }
        };
        if !self.load_generation.is_current(token) {
            debug!("session: discarding overtaken account load #{token}");
            return;
        }

        let profiles: Vec<UserProfile> = account.profiles.iter().map(UserProfile::from).collect();
        let selected = account
            .selected_profile
            .clone()
            .filter(|uuid| !uuid.is_empty());
        info!("session: loaded account with {} profile(s)", profiles.len());
        self.session.send_modify(|session| {
            session.profiles = profiles;
            if selected.is_some() {
                session.selected_profile_uuid = selected;
            }
            session.account = Some(account);
        });
    }

    /// Bootstrap entry point: loads the account when the backend reports a session.
    pub async fn check_session_info(&self) -> bool {
        match self.backend.is_logged_in().await {
            Ok(true) => {
                self.load().await;
                true
            }
            Ok(false) => {
                debug!("session: not logged in");
                false
            }
            Err(err) => {
                warn!("session: failed to check session: {err}");
                false
            }
        }
    }

    /// Log out backend-side and clear the local session. The local session is cleared
    /// even when the backend call fails; that failure is still returned.
    pub async fn logout(&self) -> Result<(), CoordinatorError> {
        self.load_generation.invalidate();
        let result = self.backend.logout().await;
        self.load_generation.invalidate();
        self.session.send_replace(AccountSession::default());
        match result {
            Ok(()) => {
                info!("session: logged out");
                Ok(())
            }
            Err(err) => {
                warn!("session: backend logout failed, local session cleared anyway: {err}");
                Err(err.into())
            }
        }
    }

    /// Select one of the current profiles. The backend write happens first, so a
    /// failure keeps the previous selection.
    pub async fn set_user_profile(&self, uuid: &str) -> Result<(), CoordinatorError> {
        if !self.session.borrow().has_profile(uuid) {
            warn!("session: refusing to select unknown profile {uuid}");
            return Err(CoordinatorError::UnknownProfile(uuid.to_owned()));
        }

        self.load_generation.invalidate();
        if let Err(err) = self.backend.set_user_profile(uuid).await {
            error!("session: failed to select profile {uuid}: {err}");
            return Err(err.into());
        }

        let applied = self.session.send_if_modified(|session| {
            if !session.has_profile(uuid) {
                return false;
            }
            session.selected_profile_uuid = Some(uuid.to_owned());
            true
        });
        if applied {
            info!("session: selected profile {uuid}");
        } else {
            warn!("session: profile {uuid} disappeared while it was being selected");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use tokio::sync::oneshot;

    use super::*;
    use crate::backend::BackendCall;
    use crate::backend::testing::{ScriptedBackend, failure};
    use crate::engine::models::{Account, BackendProfile};

    fn steve_and_alex(selected: Option<&str>) -> Account {
        Account {
            profiles: vec![
                BackendProfile {
                    uuid: "a".into(),
                    name: "Steve".into(),
                },
                BackendProfile {
                    uuid: "b".into(),
                    name: "Alex".into(),
                },
            ],
            selected_profile: selected.map(str::to_owned),
        }
    }

    fn manager_with(account: Account) -> (Arc<ScriptedBackend>, AccountSessionManager) {
        let backend = Arc::new(ScriptedBackend::default());
        *backend.account.lock().expect("lock") = Ok(Some(account));
        let manager = AccountSessionManager::new(backend.clone());
        (backend, manager)
    }

    #[tokio::test]
    async fn load_renames_profiles_in_order() {
        let (_, manager) = manager_with(steve_and_alex(Some("a")));
        manager.load().await;

        let session = manager.snapshot();
        assert_eq!(
            session.profiles,
            vec![
                UserProfile {
                    uuid: "a".into(),
                    username: "Steve".into()
                },
                UserProfile {
                    uuid: "b".into(),
                    username: "Alex".into()
                },
            ]
        );
        assert_eq!(session.selected_profile_uuid.as_deref(), Some("a"));
        assert_eq!(
            manager.current_profile().map(|p| p.username),
            Some("Steve".to_owned())
        );
        assert!(manager.is_logged_in());
    }

    #[tokio::test]
    async fn load_without_selection_keeps_existing_choice() {
        let (backend, manager) = manager_with(steve_and_alex(Some("b")));
        manager.load().await;
        *backend.account.lock().expect("lock") = Ok(Some(steve_and_alex(None)));
        manager.load().await;
        assert_eq!(manager.snapshot().selected_profile_uuid.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_session() {
        let (backend, manager) = manager_with(steve_and_alex(Some("a")));
        manager.load().await;
        let before = manager.snapshot();

        *backend.account.lock().expect("lock") = Err(failure(BackendCall::GetAccount));
        manager.load().await;
        assert_eq!(manager.snapshot(), before);

        *backend.account.lock().expect("lock") = Ok(None);
        manager.load().await;
        assert_eq!(manager.snapshot(), before);
    }

    #[tokio::test]
    async fn session_check_loads_only_when_logged_in() {
        let (backend, manager) = manager_with(steve_and_alex(Some("a")));

        *backend.logged_in.lock().expect("lock") = Ok(false);
        assert!(!manager.check_session_info().await);
        assert!(!manager.is_logged_in());

        *backend.logged_in.lock().expect("lock") = Err(failure(BackendCall::IsLoggedIn));
        assert!(!manager.check_session_info().await);
        assert!(!manager.is_logged_in());

        *backend.logged_in.lock().expect("lock") = Ok(true);
        assert!(manager.check_session_info().await);
        assert!(manager.check_session_info().await);
        assert!(manager.is_logged_in());
        assert_eq!(backend.account_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn logout_clears_everything_and_is_idempotent() {
        let (backend, manager) = manager_with(steve_and_alex(Some("a")));
        manager.load().await;

        manager.logout().await.expect("logout");
        assert_eq!(manager.snapshot(), AccountSession::default());
        manager.logout().await.expect("logout again");
        assert_eq!(manager.snapshot(), AccountSession::default());
        assert_eq!(backend.logout_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn logout_clears_even_when_backend_fails() {
        let (backend, manager) = manager_with(steve_and_alex(Some("a")));
        manager.load().await;
        *backend.logout_result.lock().expect("lock") = Err(failure(BackendCall::Logout));

        assert!(manager.logout().await.is_err());
        assert_eq!(manager.snapshot(), AccountSession::default());
    }

    #[tokio::test]
    async fn logout_beats_in_flight_load() {
        let (backend, manager) = manager_with(steve_and_alex(Some("a")));
        let (release_load, gate) = oneshot::channel();
        *backend.account_gate.lock().expect("lock") = Some(gate);

        let load = manager.load();
        let logout = async {
            manager.logout().await.expect("logout");
            release_load.send(()).ok();
        };
        tokio::join!(load, logout);
        assert_eq!(manager.snapshot(), AccountSession::default());
    }

    #[tokio::test]
    async fn select_profile_writes_backend_first() {
        let (backend, manager) = manager_with(steve_and_alex(Some("a")));
        manager.load().await;

        *backend.set_profile_result.lock().expect("lock") =
            Err(failure(BackendCall::SetUserProfile));
        assert!(manager.set_user_profile("b").await.is_err());
        assert_eq!(manager.snapshot().selected_profile_uuid.as_deref(), Some("a"));

        *backend.set_profile_result.lock().expect("lock") = Ok(());
        manager.set_user_profile("b").await.expect("select");
        assert_eq!(manager.snapshot().selected_profile_uuid.as_deref(), Some("b"));
        assert_eq!(
            backend.last_selected_profile.lock().expect("lock").as_deref(),
            Some("b")
        );
    }

    #[tokio::test]
    async fn select_unknown_profile_is_rejected_without_backend_call() {
        let (backend, manager) = manager_with(steve_and_alex(Some("a")));
        manager.load().await;

        let err = manager.set_user_profile("zzz").await.expect_err("unknown");
        assert_eq!(err, CoordinatorError::UnknownProfile("zzz".into()));
        assert!(err.is_precondition());
        assert_eq!(*backend.last_selected_profile.lock().expect("lock"), None);
        assert_eq!(manager.snapshot().selected_profile_uuid.as_deref(), Some("a"));
    }
}
