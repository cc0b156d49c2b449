//! Scriptable in-memory backend for coordinator tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{BackendCall, BackendError, LauncherBackend};
use crate::engine::models::{Account, LauncherState, MemorySettings};

pub fn failure(call: BackendCall) -> BackendError {
    BackendError::new(call, "backend unreachable")
}

type Gate = Option<oneshot::Receiver<()>>;

async fn wait(gate: Gate) {
    if let Some(gate) = gate {
        gate.await.ok();
    }
}

fn take_gate(slot: &Mutex<Gate>) -> Gate {
    slot.lock().expect("gate lock").take()
}

/// Each field scripts one call; `*_calls` counters record how often it ran.
/// Settings setters write through to their getter's slot when they succeed.
pub struct ScriptedBackend {
    pub state: Mutex<Result<LauncherState, BackendError>>,
    pub channels: Mutex<Result<Vec<String>, BackendError>>,
    pub set_channel_result: Mutex<Result<(), BackendError>>,
    pub update_codes: Mutex<VecDeque<(Result<i64, BackendError>, Gate)>>,
    pub forced_checks: AtomicUsize,
    pub network: Mutex<Result<bool, BackendError>>,
    pub network_calls: AtomicUsize,
    pub last_network_reason: Mutex<Option<String>>,
    pub account: Mutex<Result<Option<Account>, BackendError>>,
    pub account_gate: Mutex<Gate>,
    pub account_calls: AtomicUsize,
    pub logged_in: Mutex<Result<bool, BackendError>>,
    pub logout_result: Mutex<Result<(), BackendError>>,
    pub logout_calls: AtomicUsize,
    pub set_profile_result: Mutex<Result<(), BackendError>>,
    pub last_selected_profile: Mutex<Option<String>>,
    pub refresh_result: Mutex<Result<(), BackendError>>,
    pub refresh_calls: AtomicUsize,
    pub start_result: Mutex<Result<(), BackendError>>,
    pub start_gate: Mutex<Gate>,
    pub start_calls: AtomicUsize,
    pub cancel_result: Mutex<Result<(), BackendError>>,
    pub cancel_calls: AtomicUsize,
    pub memory: Mutex<Result<MemorySettings, BackendError>>,
    pub set_memory_result: Mutex<Result<(), BackendError>>,
    pub console: Mutex<Result<bool, BackendError>>,
    pub set_console_result: Mutex<Result<(), BackendError>>,
    pub install_dir: Mutex<Result<String, BackendError>>,
    pub set_install_dir_result: Mutex<Result<(), BackendError>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            state: Mutex::new(Ok(LauncherState::default())),
            channels: Mutex::new(Ok(Vec::new())),
            set_channel_result: Mutex::new(Ok(())),
            update_codes: Mutex::new(VecDeque::new()),
            forced_checks: AtomicUsize::new(0),
            network: Mutex::new(Ok(false)),
            network_calls: AtomicUsize::new(0),
            last_network_reason: Mutex::new(None),
            account: Mutex::new(Ok(None)),
            account_gate: Mutex::new(None),
            account_calls: AtomicUsize::new(0),
            logged_in: Mutex::new(Ok(false)),
            logout_result: Mutex::new(Ok(())),
            logout_calls: AtomicUsize::new(0),
            set_profile_result: Mutex::new(Ok(())),
            last_selected_profile: Mutex::new(None),
            refresh_result: Mutex::new(Ok(())),
            refresh_calls: AtomicUsize::new(0),
            start_result: Mutex::new(Ok(())),
            start_gate: Mutex::new(None),
            start_calls: AtomicUsize::new(0),
            cancel_result: Mutex::new(Ok(())),
            cancel_calls: AtomicUsize::new(0),
            memory: Mutex::new(Ok(MemorySettings {
                current_mb: 4096,
                min_mb: 512,
                max_mb: 16384,
            })),
            set_memory_result: Mutex::new(Ok(())),
            console: Mutex::new(Ok(false)),
            set_console_result: Mutex::new(Ok(())),
            install_dir: Mutex::new(Ok(String::new())),
            set_install_dir_result: Mutex::new(Ok(())),
        }
    }
}

impl ScriptedBackend {
    pub fn push_update_code(&self, result: Result<i64, BackendError>) {
        self.update_codes
            .lock()
            .expect("codes lock")
            .push_back((result, None));
    }

    /// Queue a response that resolves only once `gate` fires.
    pub fn push_gated_update_code(
        &self,
        result: Result<i64, BackendError>,
        gate: oneshot::Receiver<()>,
    ) {
        self.update_codes
            .lock()
            .expect("codes lock")
            .push_back((result, Some(gate)));
    }
}

#[async_trait]
impl LauncherBackend for ScriptedBackend {
    async fn get_state(&self) -> Result<LauncherState, BackendError> {
        self.state.lock().expect("state lock").clone()
    }

    async fn get_user_channels(&self) -> Result<Vec<String>, BackendError> {
        self.channels.lock().expect("channels lock").clone()
    }

    async fn set_channel(&self, _channel: &str) -> Result<(), BackendError> {
        self.set_channel_result.lock().expect("channel lock").clone()
    }

    async fn check_for_updates(&self, force: bool) -> Result<i64, BackendError> {
        if force {
            self.forced_checks.fetch_add(1, Ordering::SeqCst);
        }
        let next = self.update_codes.lock().expect("codes lock").pop_front();
        let (result, gate) =
            next.unwrap_or_else(|| (Err(failure(BackendCall::CheckForUpdates)), None));
        wait(gate).await;
        result
    }

    async fn check_network_mode(&self, _force: bool, reason: &str) -> Result<bool, BackendError> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_network_reason.lock().expect("reason lock") = Some(reason.to_owned());
        self.network.lock().expect("network lock").clone()
    }

    async fn get_account(&self) -> Result<Option<Account>, BackendError> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.account.lock().expect("account lock").clone();
        wait(take_gate(&self.account_gate)).await;
        result
    }

    async fn is_logged_in(&self) -> Result<bool, BackendError> {
        self.logged_in.lock().expect("logged in lock").clone()
    }

    async fn logout(&self) -> Result<(), BackendError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.logout_result.lock().expect("logout lock").clone()
    }

    async fn set_user_profile(&self, uuid: &str) -> Result<(), BackendError> {
        let result = self.set_profile_result.lock().expect("profile lock").clone();
        if result.is_ok() {
            *self.last_selected_profile.lock().expect("profile lock") = Some(uuid.to_owned());
        }
        result
    }

    async fn refresh_news_feed(&self) -> Result<(), BackendError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_result.lock().expect("refresh lock").clone()
    }

    async fn start_update(&self) -> Result<(), BackendError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.start_result.lock().expect("start lock").clone();
        wait(take_gate(&self.start_gate)).await;
        result
    }

    async fn cancel_update(&self) -> Result<(), BackendError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.cancel_result.lock().expect("cancel lock").clone()
    }
    async fn get_memory_settings(&self) -> Result<MemorySettings, BackendError> {
        self.memory.lock().expect("memory lock").clone()
    }

    async fn set_memory_mb(&self, mb: u32) -> Result<u32, BackendError> {
        self.set_memory_result.lock().expect("memory lock").clone()?;
        let mut memory = self.memory.lock().expect("memory lock");
        if let Ok(settings) = memory.as_mut() {
            settings.current_mb = mb.clamp(settings.min_mb, settings.max_mb);
            return Ok(settings.current_mb);
        }
        Ok(mb)
    }

    async fn get_console_enabled(&self) -> Result<bool, BackendError> {
        self.console.lock().expect("console lock").clone()
    }

    async fn set_console_enabled(&self, enabled: bool) -> Result<(), BackendError> {
        self.set_console_result.lock().expect("console lock").clone()?;
        *self.console.lock().expect("console lock") = Ok(enabled);
        Ok(())
    }

    async fn get_install_dir(&self) -> Result<String, BackendError> {
        self.install_dir.lock().expect("install dir lock").clone()
    }

    async fn set_install_dir(&self, path: &str) -> Result<(), BackendError> {
        self.set_install_dir_result
            .lock()
            .expect("install dir lock")
            .clone()?;
        *self.install_dir.lock().expect("install dir lock") = Ok(path.to_owned());
        Ok(())
    }
}
