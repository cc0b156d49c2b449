use std::sync::Arc;

use log::{error, info};
use tokio::sync::watch;

use crate::backend::LauncherBackend;
use crate::engine::error::CoordinatorError;

/// Channel selection and installed versions as reported by the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstallState {
    pub current_channel: String,
    pub allowed_channels: Vec<String>,
    pub game_version: Option<String>,
    pub last_known_good_version: Option<String>,
}

/// Read-mostly install metadata. Refreshes never fail outward; only an explicit
/// channel change reports errors.
pub struct InstallInfo {
    backend: Arc<dyn LauncherBackend>,
    state: watch::Sender<InstallState>,
}

impl InstallInfo {
    pub fn new(backend: Arc<dyn LauncherBackend>) -> Self {
        let (state, _) = watch::channel(InstallState::default());
        Self { backend, state }
    }

    pub fn snapshot(&self) -> InstallState {
        self.state.borrow().clone()
    }

    pub async fn fetch_channels(&self) {
        let channels = match self.backend.get_user_channels().await {
            Ok(channels) => channels,
            Err(err) => {
                error!("install: failed to fetch channels: {err}");
                return;
            }
        };
        let state = self.backend.get_state().await;
        self.state.send_modify(|install| {
            install.allowed_channels = channels;
            match state {
                Ok(state) if !state.channel.is_empty() => install.current_channel = state.channel,
                Ok(_) => {}
                Err(err) => error!("install: failed to fetch current channel: {err}"),
            }
        });
    }

    /// Persist the channel backend-side, then adopt it locally.
    pub async fn set_channel(&self, channel: &str) -> Result<(), CoordinatorError> {
        self.backend.set_channel(channel).await?;
        info!("install: switched to channel {channel}");
        self.state
            .send_modify(|install| install.current_channel = channel.to_owned());
        Ok(())
    }

    pub async fn fetch_game_version(&self) {
        match self.backend.get_state().await {
            Ok(state) => {
                if let Some(version) = state.game_version() {
                    let version = version.to_owned();
                    self.state
                        .send_modify(|install| install.game_version = Some(version));
                }
            }
            Err(err) => error!("install: failed to fetch game version: {err}"),
        }
    }

    pub async fn fetch_last_known_good_version(&self) {
        match self.backend.get_state().await {
            Ok(state) => {
                if let Some(version) = state.lkg_version() {
                    let version = version.to_owned();
                    self.state
                        .send_modify(|install| install.last_known_good_version = Some(version));
                }
            }
            Err(err) => error!("install: failed to fetch LKG version: {err}"),
        }
    }

    pub async fn fetch_install_info(&self) {
        self.fetch_channels().await;
        self.fetch_game_version().await;
        self.fetch_last_known_good_version().await;
    }
}
