use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;

use crate::env;

pub mod models;

use self::models::{CachedManifest, LauncherConfig, PlayerProfile};

/// JSON-file persistence for launcher config, the player profile and the manifest cache.
#[derive(Clone, Debug)]
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    pub fn new() -> Self {
        Self::with_base_dir(env::default_app_dir())
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        // Best-effort directory creation; failures are surfaced on write.
        if let Err(err) = env::ensure_base_dirs(&base_dir) {
            warn!("storage: unable to create {} ({err})", base_dir.display());
        }
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Missing file yields defaults; a malformed file is an error.
    pub async fn load_config(&self) -> Result<LauncherConfig, String> {
        let install_dir = self.base_dir.display().to_string();
        let config: LauncherConfig = read_json(&env::config_file(&self.base_dir))
            .await?
            .unwrap_or_default();
        Ok(config.apply_defaults(&install_dir))
    }

    pub async fn save_config(&self, config: &LauncherConfig) -> Result<(), String> {
        write_json(&env::config_file(&self.base_dir), config).await
    }

    pub async fn load_profile(&self) -> Result<PlayerProfile, String> {
        Ok(read_json(&env::profile_file(&self.base_dir))
            .await?
            .unwrap_or_default())
    }

    pub async fn save_profile(&self, profile: &PlayerProfile) -> Result<(), String> {
        write_json(&env::profile_file(&self.base_dir), profile).await
    }

    /// Last manifest the launcher saw; unreadable caches count as absent.
    pub async fn load_cached_manifest(&self) -> Option<CachedManifest> {
        match read_json(&env::manifest_cache_file(&self.base_dir)).await {
            Ok(manifest) => manifest,
            Err(err) => {
                warn!("storage: ignoring manifest cache ({err})");
                None
            }
        }
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, String> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("storage: {} not found, using defaults", path.display());
            return Ok(None);
        }
        Err(err) => return Err(format!("unable to read {}: {err}", path.display())),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|err| format!("unable to parse {}: {err}", path.display()))
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("unable to create {}: {e}", parent.display()))?;
    }
    let payload =
        serde_json::to_vec_pretty(value).map_err(|e| format!("unable to encode json: {e}"))?;
    fs::write(path, payload)
        .await
        .map_err(|e| format!("unable to write {}: {e}", path.display()))
}
