use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use md5::{Digest, Md5};
use reqwest::{Client, Url};
use sysinfo::System;
use tokio::sync::Mutex;

use super::{BackendCall, BackendError, LauncherBackend};
use crate::engine::models::{
    Account, BackendProfile, Dependencies, DependencyVersion, LauncherState, MemorySettings,
};
use crate::engine::state::StatusMessage;
use crate::events::{EventPayload, EventSink, UpdateStatusEvent};
use crate::networking::probe::ReachabilityProbe;
use crate::news::html::parse_feed_articles;
use crate::storage::StorageManager;
use crate::storage::models::{
    DEFAULT_CHANNEL, DEFAULT_MEMORY_MB, LauncherConfig, MIN_MEMORY_MB, PlayerProfile,
    UpdateCheckOutcome,
};
use crate::updater::release;
use crate::util::cancel_requested;

const STEP_DELAY: Duration = Duration::from_millis(250);
/// Assumed machine memory when the OS does not report it.
const FALLBACK_SYSTEM_MEMORY_MB: u32 = 4096;

/// Backend running inside the launcher process, backed by the files in the app
/// directory. Long-running work is spawned on the current tokio runtime and
/// reported through the [`EventSink`].
pub struct LocalBackend {
    storage: StorageManager,
    client: Client,
    probe: ReachabilityProbe,
    events: EventSink,
    launcher_version: &'static str,
    last_update_code: Arc<Mutex<Option<i64>>>,
    update_running: Arc<AtomicBool>,
    cancel_flag: Arc<AtomicBool>,
}

impl LocalBackend {
    pub fn new(storage: StorageManager, events: EventSink) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|err| {
                warn!("backend: falling back to default HTTP client configuration ({err})");
                Client::new()
            });
        Self {
            storage,
            probe: ReachabilityProbe::new(client.clone()),
            client,
            events,
            launcher_version: env!("CARGO_PKG_VERSION"),
            last_update_code: Arc::new(Mutex::new(None)),
            update_running: Arc::new(AtomicBool::new(false)),
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn config(&self, call: BackendCall) -> Result<LauncherConfig, BackendError> {
        self.storage
            .load_config()
            .await
            .map_err(|err| BackendError::new(call, err))
    }

    async fn save_config(
        &self,
        call: BackendCall,
        config: &LauncherConfig,
    ) -> Result<(), BackendError> {
        self.storage
            .save_config(config)
            .await
            .map_err(|err| BackendError::new(call, err))
    }

    async fn profile(&self, call: BackendCall) -> Result<PlayerProfile, BackendError> {
        self.storage
            .load_profile()
            .await
            .map_err(|err| BackendError::new(call, err))
    }

    async fn launcher_update_available(&self, config: &LauncherConfig) -> bool {
        match release::newer_launcher_release(
            &self.client,
            &config.release_api_url,
            self.launcher_version,
        )
        .await
        {
            Ok(Some(release)) => {
                info!(
                    "backend: launcher {} available at {}",
                    release.tag_name, release.html_url
                );
                true
            }
            Ok(None) => false,
            Err(err) => {
                warn!("backend: launcher release check skipped ({err})");
                false
            }
        }
    }

    /// The cached manifest version, else the installed one.
    async fn target_game_version(&self, config: &LauncherConfig) -> Option<String> {
        self.storage
            .load_cached_manifest()
            .await
            .and_then(|manifest| manifest.game_version().map(str::to_owned))
            .or_else(|| non_empty(&config.game_version))
    }
}

#[async_trait]
impl LauncherBackend for LocalBackend {
    async fn get_state(&self) -> Result<LauncherState, BackendError> {
        let config = self.config(BackendCall::GetState).await?;
        let game = self.target_game_version(&config).await;
        Ok(LauncherState {
            channel: config.channel.clone(),
            dependencies: Some(Dependencies {
                game: game.map(|version| DependencyVersion { version }),
                lkg: non_empty(&config.lkg_version).map(|version| DependencyVersion { version }),
            }),
        })
    }

    async fn get_user_channels(&self) -> Result<Vec<String>, BackendError> {
        let config = self.config(BackendCall::GetUserChannels).await?;
        let mut channels = vec![DEFAULT_CHANNEL.to_owned()];
        if config.channel != DEFAULT_CHANNEL {
            channels.push(config.channel);
        }
        Ok(channels)
    }

    async fn set_channel(&self, channel: &str) -> Result<(), BackendError> {
        let channel = channel.trim();
        if channel.is_empty() {
            return Err(BackendError::new(
                BackendCall::SetChannel,
                "channel name is empty",
            ));
        }
        let mut config = self.config(BackendCall::SetChannel).await?;
        config.channel = channel.to_owned();
        self.save_config(BackendCall::SetChannel, &config).await?;
        *self.last_update_code.lock().await = None;
        Ok(())
    }

    async fn check_for_updates(&self, force: bool) -> Result<i64, BackendError> {
        let mut cached = self.last_update_code.lock().await;
        if !force && let Some(code) = *cached {
            debug!("backend: reusing update code {code}");
            return Ok(code);
        }

        let config = self.config(BackendCall::CheckForUpdates).await?;
        let outcome = if self.launcher_update_available(&config).await {
            UpdateCheckOutcome::LauncherUpdate
        } else {
            let target = self.target_game_version(&config).await;
            let installed = non_empty(&config.game_version);
            match target {
                Some(target) if Some(&target) != installed.as_ref() => {
                    info!(
                        "backend: game {} available (installed {:?})",
                        target, installed
                    );
                    UpdateCheckOutcome::GameUpdate
                }
                _ => UpdateCheckOutcome::UpToDate,
            }
        };
        let code = config.update_codes.code_for(outcome);
        *cached = Some(code);
        Ok(code)
    }

    async fn check_network_mode(&self, force: bool, reason: &str) -> Result<bool, BackendError> {
        let config = self.config(BackendCall::CheckNetworkMode).await?;
        info!(
            "backend: probing {} (reason: {reason}, force: {force})",
            config.probe_url
        );
        let reachable = self.probe.is_reachable(&config.probe_url).await;
        Ok(!reachable)
    }

    async fn get_account(&self) -> Result<Option<Account>, BackendError> {
        let mut profile = self.profile(BackendCall::GetAccount).await?;
        if !profile.is_logged_in() {
            return Ok(None);
        }
        if profile.player_uuid.trim().is_empty() {
            profile.player_uuid = offline_uuid(&profile.player_name);
            if let Err(err) = self.storage.save_profile(&profile).await {
                warn!("backend: unable to persist generated player uuid ({err})");
            }
        }
        Ok(Some(Account {
            profiles: vec![BackendProfile {
                uuid: profile.player_uuid.clone(),
                name: profile.player_name,
            }],
            selected_profile: Some(profile.player_uuid),
        }))
    }

    async fn is_logged_in(&self) -> Result<bool, BackendError> {
        Ok(self.profile(BackendCall::IsLoggedIn).await?.is_logged_in())
    }

    async fn logout(&self) -> Result<(), BackendError> {
        let profile = self.profile(BackendCall::Logout).await?;
        if !profile.is_logged_in() {
            return Ok(());
        }
        self.storage
            .save_profile(&PlayerProfile::default())
            .await
            .map_err(|err| BackendError::new(BackendCall::Logout, err))
    }

    async fn set_user_profile(&self, uuid: &str) -> Result<(), BackendError> {
        let mut profile = self.profile(BackendCall::SetUserProfile).await?;
        if !profile.is_logged_in() {
            return Err(BackendError::new(
                BackendCall::SetUserProfile,
                "no player profile to update",
            ));
        }
        profile.player_uuid = uuid.to_owned();
        self.storage
            .save_profile(&profile)
            .await
            .map_err(|err| BackendError::new(BackendCall::SetUserProfile, err))
    }

    async fn refresh_news_feed(&self) -> Result<(), BackendError> {
        let config = self.config(BackendCall::RefreshNewsFeed).await?;
        let url = Url::parse(&config.news_url)
            .map_err(|err| BackendError::new(BackendCall::RefreshNewsFeed, err.to_string()))?;
        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            match fetch_feed(&client, &url).await {
                Ok(articles) => {
                    events.emit(EventPayload::FeedUpdated { articles });
                }
                Err(err) => warn!("backend: news refresh failed ({err})"),
            }
        });
        Ok(())
    }

    async fn start_update(&self) -> Result<(), BackendError> {
        let config = self.config(BackendCall::StartUpdate).await?;
        let Some(target) = self.target_game_version(&config).await else {
            return Err(BackendError::new(
                BackendCall::StartUpdate,
                "no game version known; refresh the manifest first",
            ));
        };
        if self.update_running.swap(true, Ordering::SeqCst) {
            return Err(BackendError::new(
                BackendCall::StartUpdate,
                "an update is already running",
            ));
        }
        self.cancel_flag.store(false, Ordering::SeqCst);

        let job = UpdateJob {
            storage: self.storage.clone(),
            events: self.events.clone(),
            cancel_flag: self.cancel_flag.clone(),
            last_update_code: self.last_update_code.clone(),
            target,
        };
        let running = self.update_running.clone();
        tokio::spawn(async move {
            job.run().await;
            running.store(false, Ordering::SeqCst);
        });
        Ok(())
    }

    async fn cancel_update(&self) -> Result<(), BackendError> {
        if !self.update_running.load(Ordering::SeqCst) {
            return Err(BackendError::new(
                BackendCall::CancelUpdate,
                "no update is running",
            ));
        }
        self.cancel_flag.store(true, Ordering::SeqCst);
        info!("backend: cancellation requested");
        Ok(())
    }

    async fn get_memory_settings(&self) -> Result<MemorySettings, BackendError> {
        let config = self.config(BackendCall::GetMemorySettings).await?;
        Ok(memory_settings(config.memory_mb, system_memory_mb()))
    }

    async fn set_memory_mb(&self, mb: u32) -> Result<u32, BackendError> {
        let mut config = self.config(BackendCall::SetMemoryMb).await?;
        config.memory_mb = clamp_memory_mb(mb, system_memory_mb());
        self.save_config(BackendCall::SetMemoryMb, &config).await?;
        info!("backend: heap size set to {} MB", config.memory_mb);
        Ok(config.memory_mb)
    }

    async fn get_console_enabled(&self) -> Result<bool, BackendError> {
        Ok(self.config(BackendCall::GetConsoleEnabled).await?.console_enabled)
    }

    async fn set_console_enabled(&self, enabled: bool) -> Result<(), BackendError> {
        let mut config = self.config(BackendCall::SetConsoleEnabled).await?;
        config.console_enabled = enabled;
        self.save_config(BackendCall::SetConsoleEnabled, &config).await
    }

    async fn get_install_dir(&self) -> Result<String, BackendError> {
        Ok(self.config(BackendCall::GetInstallDir).await?.install_dir)
    }

    async fn set_install_dir(&self, path: &str) -> Result<(), BackendError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(BackendError::new(
                BackendCall::SetInstallDir,
                "install dir required",
            ));
        }
        let mut config = self.config(BackendCall::SetInstallDir).await?;
        config.install_dir = path.to_owned();
        self.save_config(BackendCall::SetInstallDir, &config).await
    }
}

/// Records `target` as the installed game version, checking for cancellation between steps.
struct UpdateJob {
    storage: StorageManager,
    events: EventSink,
    cancel_flag: Arc<AtomicBool>,
    last_update_code: Arc<Mutex<Option<i64>>>,
    target: String,
}

impl UpdateJob {
    async fn run(self) {
        info!("backend: updating game to {}", self.target);
        let steps = [
            (StatusMessage::Verifying, 0.1, true),
            (StatusMessage::Installing { step: 1, total: 2 }, 0.5, true),
        ];
        for (message, progress, can_cancel) in steps {
            self.status(message, progress, can_cancel);
            tokio::time::sleep(STEP_DELAY).await;
            if cancel_requested(&self.cancel_flag) {
                warn!("backend: update cancelled before commit");
                self.events.emit(EventPayload::CancellationCompleted);
                return;
            }
        }

        // Commit phase: no cancellation past this point.
        self.status(StatusMessage::Installing { step: 2, total: 2 }, 0.9, false);
        if let Err(err) = self.commit().await {
            error!("backend: update failed: {err}");
            self.events.emit(EventPayload::UpdateFailed { reason: err });
            return;
        }
        *self.last_update_code.lock().await = None;
        info!("backend: game updated to {}", self.target);
        self.events.emit(EventPayload::UpdateCompleted);
    }

    fn status(&self, message: StatusMessage, progress: f32, can_cancel: bool) {
        self.events
            .emit(EventPayload::UpdateStatus(UpdateStatusEvent {
                message,
                progress,
                download: None,
                can_cancel,
            }));
    }

    async fn commit(&self) -> Result<(), String> {
        let mut config = self.storage.load_config().await?;
        if let Some(previous) = non_empty(&config.game_version)
            && previous != self.target
        {
            config.lkg_version = previous;
        }
        config.game_version = self.target.clone();
        self.storage.save_config(&config).await
    }
}

async fn fetch_feed(
    client: &Client,
    url: &Url,
) -> Result<Vec<crate::engine::models::FeedArticle>, String> {
    let resp = client
        .get(url.clone())
        .header("User-Agent", "ShineCoreLauncher/0.3")
        .send()
        .await
        .map_err(|err| err.to_string())?;
    if !resp.status().is_success() {
        return Err(format!("news request failed: {}", resp.status()));
    }
    let body = resp.text().await.map_err(|err| err.to_string())?;
    let articles = parse_feed_articles(&body, &url.origin().ascii_serialization());
    if articles.is_empty() {
        return Err("no news entries found".into());
    }
    Ok(articles)
}

/// Name-based (version 3) uuid for a player name, used when the profile has none yet.
fn offline_uuid(name: &str) -> String {
    let mut hash = [0u8; 16];
    hash.copy_from_slice(&Md5::digest(format!("OfflinePlayer:{name}").as_bytes()));
    uuid::Builder::from_md5_bytes(hash).into_uuid().to_string()
}

fn system_memory_mb() -> u32 {
    let mut system = System::new();
    system.refresh_memory();
    match system.total_memory() / (1024 * 1024) {
        0 => FALLBACK_SYSTEM_MEMORY_MB,
        mb => u32::try_from(mb).unwrap_or(u32::MAX),
    }
}

fn memory_settings(configured_mb: u32, system_mb: u32) -> MemorySettings {
    let max_mb = system_mb.max(MIN_MEMORY_MB);
    let current_mb = match configured_mb {
        0 => DEFAULT_MEMORY_MB,
        mb => mb,
    };
    MemorySettings {
        current_mb: current_mb.clamp(MIN_MEMORY_MB, max_mb),
        min_mb: MIN_MEMORY_MB,
        max_mb,
    }
}

fn clamp_memory_mb(requested: u32, system_mb: u32) -> u32 {
    requested.clamp(MIN_MEMORY_MB, system_mb.max(MIN_MEMORY_MB))
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}
