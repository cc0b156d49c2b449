use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::watch;

use crate::backend::LauncherBackend;
use crate::engine::error::CoordinatorError;
use crate::engine::state::{PrimaryAction, StatusMessage, UpdateAvailability, UpdateSession};
use crate::events::EventPayload;
use crate::storage::models::UpdateCodeMap;
use crate::util::{Generation, SequenceWatermark, clamp_fraction};

pub mod release;

/// Owns the check/apply/cancel lifecycle of game and launcher updates.
///
/// Pull-based calls go through the backend; progress and terminal outcomes of a
/// running update only ever arrive through [`UpdateCoordinator::apply`].
pub struct UpdateCoordinator {
    backend: Arc<dyn LauncherBackend>,
    codes: UpdateCodeMap,
    session: watch::Sender<UpdateSession>,
    availability: watch::Sender<Option<UpdateAvailability>>,
    check_generation: Generation,
    event_watermark: SequenceWatermark,
}

impl UpdateCoordinator {
    pub fn new(backend: Arc<dyn LauncherBackend>, codes: UpdateCodeMap) -> Self {
        let (session, _) = watch::channel(UpdateSession::default());
        let (availability, _) = watch::channel(None);
        Self {
            backend,
            codes,
            session,
            availability,
            check_generation: Generation::default(),
            event_watermark: SequenceWatermark::default(),
        }
    }

    pub fn session(&self) -> UpdateSession {
        self.session.borrow().clone()
    }

    pub fn availability(&self) -> Option<UpdateAvailability> {
        self.availability.borrow().clone()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<UpdateSession> {
        self.session.subscribe()
    }

    /// Ask the backend whether an update is pending. Failures are returned, never
    /// folded into "no update". Only the most recently issued check may write state;
    /// an overtaken check still reports its own result to its caller.
    pub async fn check_for_updates(
        &self,
        force: bool,
    ) -> Result<Option<UpdateAvailability>, CoordinatorError> {
        let token = self.check_generation.next();
        debug!("updates: check #{token} (force={force})");
        let code = match self.backend.check_for_updates(force).await {
            Ok(code) => code,
            Err(err) => {
                error!("updates: check #{token} failed: {err}");
                return Err(err.into());
            }
        };

        let availability = self
            .codes
            .indicates_update(code)
            .then_some(UpdateAvailability {
                primary_action: PrimaryAction::Install,
                game_version: None,
            });

        if self.check_generation.is_current(token) {
            info!(
                "updates: check #{token} returned code {code} (update available: {})",
                availability.is_some()
            );
            self.availability.send_replace(availability.clone());
        } else {
            debug!("updates: discarding stale check #{token} (code {code})");
        }
        Ok(availability)
    }

    /// Forced check interpreted as "the launcher itself must update first".
    /// Any other code, or a failed call, is `false`.
    pub async fn check_for_launcher_update(&self) -> bool {
        match self.backend.check_for_updates(true).await {
            Ok(code) => {
                let required = code == self.codes.launcher_update;
                debug!("updates: launcher update check code {code} (required: {required})");
                required
            }
            Err(err) => {
                warn!("updates: launcher update check failed: {err}");
                false
            }
        }
    }

    /// Start applying updates. `is_running` is set optimistically before the backend
    /// call and rolled back if the call fails; everything after a successful start
    /// arrives as events.
    pub async fn apply_updates(&self) -> Result<(), CoordinatorError> {
        let started = self.session.send_if_modified(|session| {
            if session.is_running {
                return false;
            }
            session.is_running = true;
            session.is_cancelling = false;
            session.can_cancel = true;
            session.cancellation_status = None;
            session.progress = 0.0;
            session.download = None;
            true
        });
        if !started {
            return Err(CoordinatorError::AlreadyRunning);
        }

        info!("updates: starting update");
        if let Err(err) = self.backend.start_update().await {
            error!("updates: failed to start update: {err}");
            self.session.send_modify(|session| {
                session.is_running = false;
                session.is_cancelling = false;
                session.cancellation_status = None;
            });
            return Err(err.into());
        }
        Ok(())
    }

    /// Request cooperative cancellation of the running update. Repeated calls while a
    /// cancellation is pending only restate the cancellation status. The running state
    /// is left to the terminal event.
    pub async fn cancel_updates(&self) -> Result<(), CoordinatorError> {
        let mut rejection = None;
        let mut already_cancelling = false;
        self.session.send_if_modified(|session| {
            if !session.is_running {
                rejection = Some(CoordinatorError::NotRunning);
                return false;
            }
            if session.is_cancelling {
                already_cancelling = true;
                session.cancellation_status = Some(StatusMessage::CancellingUpdates);
                return true;
            }
            if !session.can_cancel {
                rejection = Some(CoordinatorError::NotCancellable);
                return false;
            }
            session.is_cancelling = true;
            session.cancellation_status = Some(StatusMessage::CancellingUpdates);
            true
        });
        if let Some(err) = rejection {
            warn!("updates: cancel rejected: {err}");
            return Err(err);
        }
        if already_cancelling {
            debug!("updates: cancellation already requested");
            return Ok(());
        }

        info!("updates: requesting cancellation");
        if let Err(err) = self.backend.cancel_update().await {
            error!("updates: cancellation request failed: {err}");
            self.session.send_modify(|session| {
                if session.is_running && session.is_cancelling {
                    session.is_cancelling = false;
                    session.cancellation_status = None;
                }
            });
            return Err(err.into());
        }
        Ok(())
    }

    /// Entry point for pushed update events. Events at or below the highest sequence
    /// already applied are dropped. Returns whether the session changed.
    pub fn apply(&self, seq: u64, payload: EventPayload) -> bool {
        if matches!(payload, EventPayload::FeedUpdated { .. }) {
            return false;
        }
        if !self.event_watermark.advance(seq) {
            debug!("updates: dropping stale event seq {seq}");
            return false;
        }

        match payload {
            EventPayload::UpdateStatus(status) => {
                self.session.send_modify(|session| {
                    session.status = status.message;
                    session.progress = clamp_fraction(status.progress);
                    session.download = status.download;
                    session.can_cancel = status.can_cancel;
                });
            }
            EventPayload::UpdateCompleted => {
                info!("updates: update completed (seq {seq})");
                self.session.send_modify(|session| session.finish(StatusMessage::Completed, 1.0));
                // Checks issued before completion would report the applied update.
                self.check_generation.invalidate();
                self.availability.send_replace(None);
            }
            EventPayload::UpdateFailed { reason } => {
                error!("updates: update failed (seq {seq}): {reason}");
                self.session.send_modify(|session| {
                    let progress = session.progress;
                    session.finish(StatusMessage::Failed { reason }, progress);
                });
            }
            EventPayload::CancellationCompleted => {
                info!("updates: update cancelled (seq {seq})");
                self.session
                    .send_modify(|session| session.finish(StatusMessage::Cancelled, 0.0));
            }
            EventPayload::CancellationFailed { reason } => {
                warn!("updates: cancellation failed (seq {seq}): {reason}");
                self.session.send_modify(|session| {
                    session.is_cancelling = false;
                    session.cancellation_status =
                        Some(StatusMessage::CancellationFailed { reason });
                });
            }
            EventPayload::FeedUpdated { .. } => return false,
        }
        true
    }
}
