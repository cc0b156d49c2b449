use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::engine::models::{Account, LauncherState, MemorySettings};

pub mod local;
#[cfg(test)]
pub mod testing;

pub use local::LocalBackend;

/// Calls exposed by the launcher backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendCall {
    GetState,
    GetUserChannels,
    SetChannel,
    CheckForUpdates,
    CheckNetworkMode,
    GetAccount,
    IsLoggedIn,
    Logout,
    SetUserProfile,
    RefreshNewsFeed,
    StartUpdate,
    CancelUpdate,
    GetMemorySettings,
    SetMemoryMb,
    GetConsoleEnabled,
    SetConsoleEnabled,
    GetInstallDir,
    SetInstallDir,
}

impl BackendCall {
    pub const fn name(self) -> &'static str {
        match self {
            BackendCall::GetState => "GetState",
            BackendCall::GetUserChannels => "GetUserChannels",
            BackendCall::SetChannel => "SetChannel",
            BackendCall::CheckForUpdates => "CheckForUpdates",
            BackendCall::CheckNetworkMode => "CheckNetworkMode",
            BackendCall::GetAccount => "GetAccount",
            BackendCall::IsLoggedIn => "IsLoggedIn",
            BackendCall::Logout => "Logout",
            BackendCall::SetUserProfile => "SetUserProfile",
            BackendCall::RefreshNewsFeed => "RefreshNewsFeed",
            BackendCall::StartUpdate => "StartUpdate",
            BackendCall::CancelUpdate => "CancelUpdate",
            BackendCall::GetMemorySettings => "GetMemorySettings",
            BackendCall::SetMemoryMb => "SetMemoryMB",
            BackendCall::GetConsoleEnabled => "GetConsoleEnabled",
            BackendCall::SetConsoleEnabled => "SetConsoleEnabled",
            BackendCall::GetInstallDir => "GetInstallDir",
            BackendCall::SetInstallDir => "SetInstallDir",
        }
    }
}

impl fmt::Display for BackendCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Generic failure of a backend call.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{call} failed: {message}")]
pub struct BackendError {
    pub call: BackendCall,
    pub message: String,
}

impl BackendError {
    pub fn new(call: BackendCall, message: impl Into<String>) -> Self {
        Self {
            call,
            message: message.into(),
        }
    }
}

/// Request/response surface of the native launcher backend.
///
/// Long-running work (`start_update`, `refresh_news_feed`) resolves as soon as it has
/// been started; its progress and outcome arrive later as [`crate::events::BackendEvent`]s.
#[async_trait]
pub trait LauncherBackend: Send + Sync {
    async fn get_state(&self) -> Result<LauncherState, BackendError>;

    async fn get_user_channels(&self) -> Result<Vec<String>, BackendError>;

    async fn set_channel(&self, channel: &str) -> Result<(), BackendError>;

    /// Returns a raw status code; see [`crate::storage::models::UpdateCodeMap`].
    async fn check_for_updates(&self, force: bool) -> Result<i64, BackendError>;

    /// Returns `true` when the launcher should run offline. `reason` is diagnostic only.
    async fn check_network_mode(&self, force: bool, reason: &str) -> Result<bool, BackendError>;

    async fn get_account(&self) -> Result<Option<Account>, BackendError>;

    async fn is_logged_in(&self) -> Result<bool, BackendError>;

    async fn logout(&self) -> Result<(), BackendError>;

    async fn set_user_profile(&self, uuid: &str) -> Result<(), BackendError>;

    async fn refresh_news_feed(&self) -> Result<(), BackendError>;

    async fn start_update(&self) -> Result<(), BackendError>;

    async fn cancel_update(&self) -> Result<(), BackendError>;

    async fn get_memory_settings(&self) -> Result<MemorySettings, BackendError>;

    /// Stores the requested heap size after clamping it; returns the stored value.
    async fn set_memory_mb(&self, mb: u32) -> Result<u32, BackendError>;

    async fn get_console_enabled(&self) -> Result<bool, BackendError>;

    async fn set_console_enabled(&self, enabled: bool) -> Result<(), BackendError>;

    async fn get_install_dir(&self) -> Result<String, BackendError>;

    async fn set_install_dir(&self, path: &str) -> Result<(), BackendError>;
}
