use std::sync::Arc;

use log::{error, info};
use tokio::sync::watch;

use crate::backend::LauncherBackend;
use crate::engine::error::CoordinatorError;
use crate::engine::models::MemorySettings;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettingsState {
    pub memory: Option<MemorySettings>,
    pub console_enabled: bool,
    pub install_dir: Option<String>,
}

/// Player-editable launcher settings. Reads are best effort; every setter
/// persists backend-side before the local copy changes.
pub struct LauncherSettings {
    backend: Arc<dyn LauncherBackend>,
    state: watch::Sender<SettingsState>,
}

impl LauncherSettings {
    pub fn new(backend: Arc<dyn LauncherBackend>) -> Self {
        let (state, _) = watch::channel(SettingsState::default());
        Self { backend, state }
    }

    pub fn snapshot(&self) -> SettingsState {
        self.state.borrow().clone()
    }

    pub async fn fetch_settings(&self) {
        match self.backend.get_memory_settings().await {
            Ok(memory) => self.state.send_modify(|s| s.memory = Some(memory)),
            Err(err) => error!("settings: failed to fetch memory settings: {err}"),
        }
        match self.backend.get_console_enabled().await {
            Ok(enabled) => self.state.send_modify(|s| s.console_enabled = enabled),
            Err(err) => error!("settings: failed to fetch console flag: {err}"),
        }
        match self.backend.get_install_dir().await {
            Ok(dir) if !dir.is_empty() => self.state.send_modify(|s| s.install_dir = Some(dir)),
            Ok(_) => {}
            Err(err) => error!("settings: failed to fetch install dir: {err}"),
        }
    }

    /// Returns the heap size the backend actually stored.
    pub async fn set_memory_mb(&self, mb: u32) -> Result<u32, CoordinatorError> {
        let stored = self.backend.set_memory_mb(mb).await?;
        if stored != mb {
            info!("settings: heap size {mb} MB clamped to {stored} MB");
        }
        self.state.send_modify(|s| {
            if let Some(memory) = s.memory.as_mut() {
                memory.current_mb = stored;
            }
        });
        Ok(stored)
    }

    pub async fn set_console_enabled(&self, enabled: bool) -> Result<(), CoordinatorError> {
        self.backend.set_console_enabled(enabled).await?;
        self.state.send_modify(|s| s.console_enabled = enabled);
        Ok(())
    }

    pub async fn set_install_dir(&self, path: &str) -> Result<(), CoordinatorError> {
        self.backend.set_install_dir(path).await?;
        info!("settings: install dir set to {path}");
        self.state.send_modify(|s| s.install_dir = Some(path.to_owned()));
        Ok(())
    }
}
