use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Overrides the launcher data directory when set.
pub const HOME_OVERRIDE_VAR: &str = "SHINECORE_HOME";

/// Returns the root directory used by the launcher for config, profile and caches.
pub fn default_app_dir() -> PathBuf {
    if let Some(dir) = env::var_os(HOME_OVERRIDE_VAR).filter(|value| !value.is_empty()) {
        return PathBuf::from(dir);
    }

    let base = match env::consts::OS {
        "windows" => env::var_os("APPDATA")
            .or_else(|| env::var_os("LOCALAPPDATA"))
            .map(PathBuf::from),
        "macos" => env::var_os("HOME")
            .map(PathBuf::from)
            .map(|home| home.join("Library").join("Application Support")),
        _ => env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))),
    }
    .unwrap_or_else(|| PathBuf::from("."));

    base.join("shinecore")
}

pub fn config_file(base: &Path) -> PathBuf {
    base.join("launcher.json")
}

pub fn profile_file(base: &Path) -> PathBuf {
    base.join("profile.json")
}

pub fn manifest_cache_file(base: &Path) -> PathBuf {
    base.join("manifest_cache.json")
}

pub fn logs_dir(base: &Path) -> PathBuf {
    base.join("logs")
}

/// Create the on-disk folder layout expected by the launcher.
pub fn ensure_base_dirs(base: &Path) -> std::io::Result<()> {
    for dir in [base.to_path_buf(), logs_dir(base)] {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn places_launcher_files_under_base_dir() {
        let base = PathBuf::from("/tmp/shinecore-test");
        assert_eq!(config_file(&base), base.join("launcher.json"));
        assert_eq!(profile_file(&base), base.join("profile.json"));
        assert_eq!(manifest_cache_file(&base), base.join("manifest_cache.json"));
    }

    #[test]
    fn creates_base_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path().join("nested").join("shinecore");
        ensure_base_dirs(&base).expect("create dirs");
        assert!(base.is_dir());
        assert!(logs_dir(&base).is_dir());
    }
}
