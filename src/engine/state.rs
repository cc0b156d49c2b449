use serde::{Deserialize, Serialize};

use crate::engine::models::{Account, BackendProfile};

/// Localisable status line for the update flow. Each variant carries only the
/// parameters its message template substitutes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "id", content = "params")]
pub enum StatusMessage {
    #[default]
    #[serde(rename = "update_status.checking_for_updates")]
    CheckingForUpdates,
    #[serde(rename = "update_status.up_to_date")]
    UpToDate,
    #[serde(rename = "update_status.downloading")]
    Downloading { file: String },
    #[serde(rename = "update_status.verifying")]
    Verifying,
    #[serde(rename = "update_status.installing")]
    Installing { step: u32, total: u32 },
    #[serde(rename = "update_status.completed")]
    Completed,
    #[serde(rename = "update_status.cancelling_updates")]
    CancellingUpdates,
    #[serde(rename = "update_status.cancelled")]
    Cancelled,
    #[serde(rename = "update_status.cancellation_failed")]
    CancellationFailed { reason: String },
    #[serde(rename = "update_status.failed")]
    Failed { reason: String },
}

impl StatusMessage {
    /// Message-catalog key used by the UI for lookup.
    pub const fn id(&self) -> &'static str {
        match self {
            StatusMessage::CheckingForUpdates => "update_status.checking_for_updates",
            StatusMessage::UpToDate => "update_status.up_to_date",
            StatusMessage::Downloading { .. } => "update_status.downloading",
            StatusMessage::Verifying => "update_status.verifying",
            StatusMessage::Installing { .. } => "update_status.installing",
            StatusMessage::Completed => "update_status.completed",
            StatusMessage::CancellingUpdates => "update_status.cancelling_updates",
            StatusMessage::Cancelled => "update_status.cancelled",
            StatusMessage::CancellationFailed { .. } => "update_status.cancellation_failed",
            StatusMessage::Failed { .. } => "update_status.failed",
        }
    }

    /// Substitution parameters as `(name, value)` pairs.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            StatusMessage::Downloading { file } => vec![("file", file.clone())],
            StatusMessage::Installing { step, total } => {
                vec![("step", step.to_string()), ("total", total.to_string())]
            }
            StatusMessage::CancellationFailed { reason } | StatusMessage::Failed { reason } => {
                vec![("reason", reason.clone())]
            }
            _ => Vec::new(),
        }
    }

    /// English rendering for logs and the command line.
    pub fn english(&self) -> String {
        match self {
            StatusMessage::CheckingForUpdates => "Checking for updates".into(),
            StatusMessage::UpToDate => "Up to date".into(),
            StatusMessage::Downloading { file } => format!("Downloading {file}"),
            StatusMessage::Verifying => "Verifying game files".into(),
            StatusMessage::Installing { step, total } => format!("Installing ({step}/{total})"),
            StatusMessage::Completed => "Update complete".into(),
            StatusMessage::CancellingUpdates => "Cancelling updates".into(),
            StatusMessage::Cancelled => "Update cancelled".into(),
            StatusMessage::CancellationFailed { reason } => {
                format!("Could not cancel update: {reason}")
            }
            StatusMessage::Failed { reason } => format!("Update failed: {reason}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadMetrics {
    pub downloaded: u64,
    pub total: u64,
    pub bytes_per_second: f32,
}

/// In-progress view of an update operation.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateSession {
    pub status: StatusMessage,
    pub progress: f32,
    pub download: Option<DownloadMetrics>,
    pub is_running: bool,
    pub is_cancelling: bool,
    pub can_cancel: bool,
    pub cancellation_status: Option<StatusMessage>,
}

impl Default for UpdateSession {
    fn default() -> Self {
        Self {
            status: StatusMessage::CheckingForUpdates,
            progress: 0.0,
            download: None,
            is_running: false,
            is_cancelling: false,
            can_cancel: true,
            cancellation_status: None,
        }
    }
}

impl UpdateSession {
    /// Leave the running state in one step after a terminal backend signal.
    pub fn finish(&mut self, status: StatusMessage, progress: f32) {
        self.status = status;
        self.progress = progress;
        self.download = None;
        self.is_running = false;
        self.is_cancelling = false;
        self.can_cancel = true;
        self.cancellation_status = None;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimaryAction {
    Install,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateAvailability {
    pub primary_action: PrimaryAction,
    pub game_version: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NetworkModeCache {
    pub is_offline: bool,
    pub has_been_checked: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub uuid: String,
    pub username: String,
}

impl From<&BackendProfile> for UserProfile {
    fn from(profile: &BackendProfile) -> Self {
        Self {
            uuid: profile.uuid.clone(),
            username: profile.name.clone(),
        }
    }
}

/// Local view of the logged-in account.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountSession {
    pub account: Option<Account>,
    pub profiles: Vec<UserProfile>,
    pub selected_profile_uuid: Option<String>,
}

impl AccountSession {
    pub fn is_logged_in(&self) -> bool {
        self.account.is_some()
    }

    /// Profile matching the selected uuid; a selection that no longer matches resolves to `None`.
    pub fn current_profile(&self) -> Option<&UserProfile> {
        let selected = self.selected_profile_uuid.as_deref()?;
        self.profiles.iter().find(|profile| profile.uuid == selected)
    }

    pub fn has_profile(&self, uuid: &str) -> bool {
        self.profiles.iter().any(|profile| profile.uuid == uuid)
    }
}
