use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::watch;

use crate::backend::LauncherBackend;
use crate::engine::state::NetworkModeCache;
use crate::util::Generation;

pub mod probe;

/// Cached verdict on whether the launcher runs offline.
pub struct NetworkModeGate {
    backend: Arc<dyn LauncherBackend>,
    cache: watch::Sender<NetworkModeCache>,
    generation: Generation,
}

impl NetworkModeGate {
    pub fn new(backend: Arc<dyn LauncherBackend>) -> Self {
        let (cache, _) = watch::channel(NetworkModeCache::default());
        Self {
            backend,
            cache,
            generation: Generation::default(),
        }
    }

    pub fn snapshot(&self) -> NetworkModeCache {
        *self.cache.borrow()
    }

    pub fn is_offline(&self) -> bool {
        self.cache.borrow().is_offline
    }

    /// Probe reachability unless a verdict is cached and `force` is false.
    /// A failed probe is recorded as offline.
    pub async fn check_network_mode(&self, force: bool, reason: &str) {
        if !force && self.cache.borrow().has_been_checked {
            debug!("network: using cached verdict ({reason})");
            return;
        }

        let token = self.generation.next();
        let is_offline = match self.backend.check_network_mode(force, reason).await {
            Ok(offline) => {
                info!("network: offline={offline} ({reason})");
                offline
            }
            Err(err) => {
                warn!("network: {err}; assuming offline");
                true
            }
        };

        if !self.generation.is_current(token) {
            debug!("network: discarding overtaken probe ({reason})");
            return;
        }
        self.cache.send_replace(NetworkModeCache {
            is_offline,
            has_been_checked: true,
        });
    }
}
