use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyVersion {
    pub version: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    #[serde(default)]
    pub game: Option<DependencyVersion>,
    #[serde(default)]
    pub lkg: Option<DependencyVersion>,
}

/// Aggregate state reported by `GetState`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherState {
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub dependencies: Option<Dependencies>,
}

impl LauncherState {
    pub fn game_version(&self) -> Option<&str> {
        self.dependencies
            .as_ref()
            .and_then(|deps| deps.game.as_ref())
            .map(|game| game.version.as_str())
            .filter(|version| !version.is_empty())
    }

    pub fn lkg_version(&self) -> Option<&str> {
        self.dependencies
            .as_ref()
            .and_then(|deps| deps.lkg.as_ref())
            .map(|lkg| lkg.version.as_str())
            .filter(|version| !version.is_empty())
    }
}

/// Heap size bounds offered in settings, all in MB.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySettings {
    pub current_mb: u32,
    pub min_mb: u32,
    pub max_mb: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendProfile {
    pub uuid: String,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub profiles: Vec<BackendProfile>,
    #[serde(default)]
    pub selected_profile: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedArticle {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_url: Option<String>,
}
