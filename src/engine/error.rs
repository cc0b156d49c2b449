use thiserror::Error;

use crate::backend::BackendError;

/// Failures surfaced by the coordinators to their callers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("an update is already running")]
    AlreadyRunning,
    #[error("no update is running")]
    NotRunning,
    #[error("the running update cannot be cancelled right now")]
    NotCancellable,
    #[error("profile {0} is not part of the current session")]
    UnknownProfile(String),
}

impl CoordinatorError {
    /// Precondition violations are caller bugs; everything else came from the backend.
    pub fn is_precondition(&self) -> bool {
        !matches!(self, CoordinatorError::Backend(_))
    }
}
