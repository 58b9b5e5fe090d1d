use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::options::DEFAULT_USERNAME;
use crate::core::launch::DisplaySettings;
use crate::core::profile::Profile;

const APP_DIR_NAME: &str = "Minelaunch";
const SETTINGS_FILE: &str = "launcher_settings.json";

/// Overrides `minecraft_dir` when set.
pub const MINECRAFT_DIR_ENV: &str = "MINELAUNCH_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LauncherSettings {
    pub minecraft_dir: PathBuf,
    /// `None` runs `java` from PATH.
    pub java_path: Option<PathBuf>,
    pub default_username: String,
    pub default_profile: Profile,
    pub display: DisplaySettings,
    pub download_concurrency: usize,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            minecraft_dir: PathBuf::from("minecraft"),
            java_path: None,
            default_username: DEFAULT_USERNAME.into(),
            default_profile: Profile::Standard,
            display: DisplaySettings::default(),
            download_concurrency: 8,
        }
    }
}

impl LauncherSettings {
    /// Read `launcher_settings.json` from `config_dir`. A missing file yields
    /// defaults; an unreadable or corrupt one yields defaults and a warning.
    pub fn load(config_dir: &Path) -> Self {
        let path = config_dir.join(SETTINGS_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {:?}, using defaults", path);
                return Self::default();
            }
            Err(e) => {
                warn!("Cannot read settings {:?}: {}", path, e);
                return Self::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring corrupt settings {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn exists_in(config_dir: &Path) -> bool {
        config_dir.join(SETTINGS_FILE).is_file()
    }

    pub fn save(&self, config_dir: &Path) -> LauncherResult<()> {
        std::fs::create_dir_all(config_dir).map_err(|source| LauncherError::Io {
            path: config_dir.to_path_buf(),
            source,
        })?;
        let path = config_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|source| LauncherError::Io { path, source })
    }

    /// Apply [`MINECRAFT_DIR_ENV`] from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_minecraft_dir_override(std::env::var_os(MINECRAFT_DIR_ENV))
    }

    fn with_minecraft_dir_override(mut self, value: Option<OsString>) -> Self {
        if let Some(dir) = value.filter(|v| !v.is_empty()) {
            self.minecraft_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn java_program(&self) -> PathBuf {
        self.java_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("java"))
    }
}

/// `<data dir>/Minelaunch`, or `./Minelaunch` when the platform has no data dir.
pub fn default_config_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let settings = LauncherSettings::load(temp.path());
        assert_eq!(settings, LauncherSettings::default());
        assert_eq!(settings.minecraft_dir, PathBuf::from("minecraft"));
        assert_eq!(settings.download_concurrency, 8);
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join(SETTINGS_FILE), "{ not json").unwrap();
        assert_eq!(LauncherSettings::load(temp.path()), LauncherSettings::default());
    }

    #[test]
    fn save_then_load_keeps_values() {
        let temp = tempfile::tempdir().unwrap();
        let config_dir = temp.path().join("config");
        let settings = LauncherSettings {
            default_username: "Steve".into(),
            default_profile: Profile::FpsBoost,
            java_path: Some(PathBuf::from("/usr/lib/jvm/java-17/bin/java")),
            ..Default::default()
        };

        assert!(!LauncherSettings::exists_in(&config_dir));
        settings.save(&config_dir).unwrap();
        assert!(LauncherSettings::exists_in(&config_dir));
        assert_eq!(LauncherSettings::load(&config_dir), settings);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join(SETTINGS_FILE),
            r#"{"default_profile": "ultra_optimized"}"#,
        )
        .unwrap();

        let settings = LauncherSettings::load(temp.path());
        assert_eq!(settings.default_profile, Profile::UltraOptimized);
        assert_eq!(settings.default_username, "OfflinePlayer");
        assert_eq!(settings.java_program(), PathBuf::from("java"));
    }

    #[test]
    fn env_override_replaces_minecraft_dir() {
        let settings = LauncherSettings::default()
            .with_minecraft_dir_override(Some(OsString::from("/srv/minecraft")));
        assert_eq!(settings.minecraft_dir, PathBuf::from("/srv/minecraft"));

        let untouched = LauncherSettings::default().with_minecraft_dir_override(Some(OsString::new()));
        assert_eq!(untouched.minecraft_dir, PathBuf::from("minecraft"));
    }
}
