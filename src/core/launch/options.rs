use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::profile::RuntimeArguments;

pub const DEFAULT_USERNAME: &str = "OfflinePlayer";
const OFFLINE_UUID: &str = "00000000000000000000000000000000";
const OFFLINE_ACCESS_TOKEN: &str = "offline_access_token";
const CLIENT_ID_FALLBACK: &str = "00000000402B5328";

/// Who the game is started as. Only offline identities are produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub username: String,
    pub uuid: String,
    pub access_token: String,
    pub xuid: String,
    pub user_type: String,
    pub client_id: String,
}

impl Default for PlayerIdentity {
    fn default() -> Self {
        Self::offline(DEFAULT_USERNAME)
    }
}

impl PlayerIdentity {
    /// Blank usernames become [`DEFAULT_USERNAME`].
    pub fn offline(username: &str) -> Self {
        let username = match username.trim() {
            "" => DEFAULT_USERNAME,
            name => name,
        };
        Self {
            username: username.to_string(),
            uuid: OFFLINE_UUID.into(),
            access_token: OFFLINE_ACCESS_TOKEN.into(),
            xuid: "0".into(),
            user_type: "legacy".into(),
            client_id: CLIENT_ID_FALLBACK.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplaySettings {
    pub width: u32,
    pub height: u32,
    pub custom_resolution: bool,
    pub fullscreen: bool,
    pub max_fps: u32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            custom_resolution: true,
            fullscreen: true,
            max_fps: 300,
        }
    }
}

impl DisplaySettings {
    /// Window flags appended after the version's own game arguments.
    pub fn game_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.custom_resolution && self.width > 0 && self.height > 0 {
            args.extend([
                "--width".to_string(),
                self.width.to_string(),
                "--height".to_string(),
                self.height.to_string(),
            ]);
        }
        if self.fullscreen {
            args.push("--fullscreen".to_string());
        }
        args
    }
}

/// Everything a command builder needs for one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub identity: PlayerIdentity,
    pub display: DisplaySettings,
    pub runtime: RuntimeArguments,
}

/// Set `maxFps:<cap>` in the game's `options.txt`, creating the file if
/// needed and leaving every other line untouched.
pub async fn apply_frame_rate_cap(options_file: &Path, max_fps: u32) -> LauncherResult<()> {
    let existing = match tokio::fs::read_to_string(options_file).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(LauncherError::Io {
                path: options_file.to_path_buf(),
                source,
            })
        }
    };

    let updated = with_max_fps(&existing, max_fps);
    if let Some(parent) = options_file.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| LauncherError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(options_file, updated)
        .await
        .map_err(|source| LauncherError::Io {
            path: options_file.to_path_buf(),
            source,
        })
}

fn with_max_fps(options: &str, max_fps: u32) -> String {
    let setting = format!("maxFps:{}", max_fps);
    let mut replaced = false;
    let mut lines: Vec<String> = options
        .lines()
        .map(|line| {
            if line.starts_with("maxFps:") {
                replaced = true;
                setting.clone()
            } else {
                line.to_string()
            }
        })
        .collect();
    if !replaced {
        lines.push(setting);
    }
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_username_falls_back() {
        assert_eq!(PlayerIdentity::offline("   ").username, "OfflinePlayer");
        let steve = PlayerIdentity::offline(" Steve ");
        assert_eq!(steve.username, "Steve");
        assert_eq!(steve.uuid, "00000000000000000000000000000000");
        assert_eq!(steve.user_type, "legacy");
    }

    #[test]
    fn display_args_follow_toggles() {
        let display = DisplaySettings::default();
        assert_eq!(
            display.game_args(),
            vec!["--width", "1280", "--height", "720", "--fullscreen"]
        );

        let windowed = DisplaySettings {
            custom_resolution: false,
            fullscreen: false,
            ..Default::default()
        };
        assert!(windowed.game_args().is_empty());
    }

    #[test]
    fn display_settings_fill_missing_fields() {
        let display: DisplaySettings = serde_json::from_str(r#"{"max_fps": 144}"#).unwrap();
        assert_eq!(display.max_fps, 144);
        assert_eq!(display.width, 1280);
    }

    #[test]
    fn max_fps_line_is_replaced_in_place() {
        let updated = with_max_fps("version:3465\nmaxFps:120\nfov:0.0\n", 300);
        assert_eq!(updated, "version:3465\nmaxFps:300\nfov:0.0\n");
        assert_eq!(with_max_fps("", 60), "maxFps:60\n");
    }

    #[tokio::test]
    async fn frame_rate_cap_creates_options_file() {
        let temp = tempfile::tempdir().unwrap();
        let options = temp.path().join("options.txt");

        apply_frame_rate_cap(&options, 144).await.unwrap();
        apply_frame_rate_cap(&options, 240).await.unwrap();

        assert_eq!(std::fs::read_to_string(&options).unwrap(), "maxFps:240\n");
    }
}
