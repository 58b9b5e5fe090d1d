// ─── Performance Profiles ───
// Named presets that turn into JVM flags at launch time.

pub mod memory;
pub mod resolver;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::LauncherError;

pub use memory::{MemoryProbe, SystemMemoryProbe};
pub use resolver::{resolve, resolve_with, RuntimeArguments};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    #[default]
    Standard,
    FpsBoost,
    UltraOptimized,
}

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::Standard, Profile::FpsBoost, Profile::UltraOptimized];

    pub fn display_name(self) -> &'static str {
        match self {
            Profile::Standard => "Standard",
            Profile::FpsBoost => "FPS Boost",
            Profile::UltraOptimized => "Ultra Optimized",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Profile {
    type Err = LauncherError;

    /// Accepts display names, serde names and the usual dashed spellings,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "standard" | "default" => Ok(Profile::Standard),
            "fpsboost" | "fps" => Ok(Profile::FpsBoost),
            "ultraoptimized" | "ultra" => Ok(Profile::UltraOptimized),
            _ => Err(LauncherError::Other(format!(
                "Unknown profile {:?} (expected standard, fps-boost or ultra)",
                s
            ))),
        }
    }
}
