use serde::{Deserialize, Serialize};

pub const DEFAULT_CHANNEL: &str = "stable";
pub const DEFAULT_MEMORY_MB: u32 = 4096;
pub const MIN_MEMORY_MB: u32 = 512;
const DEFAULT_PROBE_URL: &str = "https://api.be-sunshainy.ru";
const DEFAULT_NEWS_URL: &str = "https://be-sunshainy.ru/news";
const DEFAULT_RELEASE_API_URL: &str =
    "https://api.github.com/repos/shinecore/launcher/releases/latest";

/// What a raw `CheckForUpdates` status code means.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateCheckOutcome {
    UpToDate,
    GameUpdate,
    LauncherUpdate,
}

/// Status-code protocol of the backend update check. The backend contract does not
/// document these values, so they are read from config instead of being fixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateCodeMap {
    pub none: i64,
    pub game_update: i64,
    pub launcher_update: i64,
}

impl Default for UpdateCodeMap {
    fn default() -> Self {
        Self {
            none: 0,
            game_update: 1,
            launcher_update: 2,
        }
    }
}

impl UpdateCodeMap {
    pub fn classify(&self, code: i64) -> UpdateCheckOutcome {
        if code == self.none {
            UpdateCheckOutcome::UpToDate
        } else if code == self.launcher_update {
            UpdateCheckOutcome::LauncherUpdate
        } else {
            UpdateCheckOutcome::GameUpdate
        }
    }

    /// Any code other than `none` means something can be installed.
    pub fn indicates_update(&self, code: i64) -> bool {
        self.classify(code) != UpdateCheckOutcome::UpToDate
    }

    pub fn code_for(&self, outcome: UpdateCheckOutcome) -> i64 {
        match outcome {
            UpdateCheckOutcome::UpToDate => self.none,
            UpdateCheckOutcome::GameUpdate => self.game_update,
            UpdateCheckOutcome::LauncherUpdate => self.launcher_update,
        }
    }
}

/// `launcher.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub install_dir: String,
    pub game_version: String,
    pub lkg_version: String,
    pub channel: String,
    pub memory_mb: u32,
    pub console_enabled: bool,
    pub update_codes: UpdateCodeMap,
    pub probe_url: String,
    pub news_url: String,
    pub release_api_url: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            install_dir: String::new(),
            game_version: String::new(),
            lkg_version: String::new(),
            channel: DEFAULT_CHANNEL.into(),
            memory_mb: DEFAULT_MEMORY_MB,
            console_enabled: false,
            update_codes: UpdateCodeMap::default(),
            probe_url: DEFAULT_PROBE_URL.into(),
            news_url: DEFAULT_NEWS_URL.into(),
            release_api_url: DEFAULT_RELEASE_API_URL.into(),
        }
    }
}

impl LauncherConfig {
    /// Fill blanks and clamp values read from disk.
    pub fn apply_defaults(mut self, install_dir: &str) -> Self {
        let defaults = Self::default();
        if self.install_dir.trim().is_empty() {
            self.install_dir = install_dir.to_owned();
        }
        if self.channel.trim().is_empty() {
            self.channel = defaults.channel;
        }
        if self.memory_mb == 0 {
            self.memory_mb = DEFAULT_MEMORY_MB;
        }
        self.memory_mb = self.memory_mb.max(MIN_MEMORY_MB);
        if self.probe_url.trim().is_empty() {
            self.probe_url = defaults.probe_url;
        }
        if self.news_url.trim().is_empty() {
            self.news_url = defaults.news_url;
        }
        if self.release_api_url.trim().is_empty() {
            self.release_api_url = defaults.release_api_url;
        }
        self
    }
}

/// `profile.json`. An empty `player_name` means nobody is logged in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProfile {
    pub player_name: String,
    pub player_uuid: String,
}

impl PlayerProfile {
    pub fn is_logged_in(&self) -> bool {
        !self.player_name.trim().is_empty()
    }
}

/// Subset of the server manifest kept in `manifest_cache.json`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachedManifest {
    pub version: String,
    pub dependencies: ManifestDependencies,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestDependencies {
    pub game_version: String,
}

impl CachedManifest {
    pub fn game_version(&self) -> Option<&str> {
        [self.version.as_str(), self.dependencies.game_version.as_str()]
            .into_iter()
            .map(str::trim)
            .find(|version| !version.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_update_codes_with_defaults() {
        let codes = UpdateCodeMap::default();
        assert_eq!(codes.classify(0), UpdateCheckOutcome::UpToDate);
        assert_eq!(codes.classify(1), UpdateCheckOutcome::GameUpdate);
        assert_eq!(codes.classify(2), UpdateCheckOutcome::LauncherUpdate);
        assert_eq!(codes.classify(-7), UpdateCheckOutcome::GameUpdate);
        assert!(codes.indicates_update(2));
        assert!(!codes.indicates_update(0));
    }

    #[test]
    fn update_codes_are_overridable_from_json() {
        let codes: UpdateCodeMap =
            serde_json::from_str(r#"{"launcher_update": 9}"#).expect("parse");
        assert_eq!(codes.none, 0);
        assert_eq!(codes.classify(9), UpdateCheckOutcome::LauncherUpdate);
        assert_eq!(codes.classify(2), UpdateCheckOutcome::GameUpdate);
        assert_eq!(codes.code_for(UpdateCheckOutcome::LauncherUpdate), 9);
    }

    #[test]
    fn config_defaults_fill_blanks_and_clamp_memory() {
        let cfg: LauncherConfig =
            serde_json::from_str(r#"{"memory_mb": 128, "channel": " "}"#).expect("parse");
        let cfg = cfg.apply_defaults("/games/shinecore");
        assert_eq!(cfg.install_dir, "/games/shinecore");
        assert_eq!(cfg.channel, DEFAULT_CHANNEL);
        assert_eq!(cfg.memory_mb, MIN_MEMORY_MB);

        let cfg = LauncherConfig {
            memory_mb: 0,
            ..LauncherConfig::default()
        }
        .apply_defaults("x");
        assert_eq!(cfg.memory_mb, DEFAULT_MEMORY_MB);
    }

    #[test]
    fn manifest_prefers_top_level_version() {
        let manifest: CachedManifest = serde_json::from_str(
            r#"{"version": "", "dependencies": {"game_version": "1.20.1"}}"#,
        )
        .expect("parse");
        assert_eq!(manifest.game_version(), Some("1.20.1"));
        assert_eq!(CachedManifest::default().game_version(), None);
    }
}
