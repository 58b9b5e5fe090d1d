use std::path::{Component, Path, PathBuf};

use crate::core::error::{LauncherError, LauncherResult};

/// On-disk layout of a Minecraft root directory.
///
/// - `versions/<id>/` — version JSON, client jar, natives (existence = installed)
/// - `libraries/`     — shared Maven-layout library jars
/// - `assets/`        — asset indexes and hashed objects
/// - `options.txt`    — game options written by the game itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameLayout {
    root: PathBuf,
}

impl GameLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    /// Path to `versions/<version>/`, the install-completion marker.
    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.versions_dir().join(version)
    }

    /// Temporary directory an installer fills before renaming it into place.
    pub fn staging_dir(&self, version: &str) -> PathBuf {
        self.versions_dir().join(format!(".{}.partial", version))
    }

    pub fn version_json(&self, version: &str) -> PathBuf {
        self.version_dir(version).join(format!("{}.json", version))
    }

    pub fn client_jar(&self, version: &str) -> PathBuf {
        self.version_dir(version).join(format!("{}.jar", version))
    }

    pub fn natives_dir(&self, version: &str) -> PathBuf {
        self.version_dir(version).join("natives")
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn options_file(&self) -> PathBuf {
        self.root.join("options.txt")
    }

    /// Ids of versions that look installed: `versions/<id>/<id>.json` exists.
    pub fn installed_versions(&self) -> LauncherResult<Vec<String>> {
        let versions_dir = self.versions_dir();
        if !versions_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&versions_dir).map_err(|source| LauncherError::Io {
            path: versions_dir.clone(),
            source,
        })?;

        let mut installed = Vec::new();
        for entry in entries.flatten() {
            let id = entry.file_name().to_string_lossy().to_string();
            if validate_version_id(&id).is_err() {
                continue;
            }
            if self.version_json(&id).is_file() {
                installed.push(id);
            }
        }
        installed.sort();
        Ok(installed)
    }
}

/// A version id names a single directory under `versions/`.
pub fn validate_version_id(version: &str) -> LauncherResult<()> {
    let trimmed = version.trim();
    if trimmed.is_empty() || trimmed != version || version.starts_with('.') {
        return Err(LauncherError::InvalidVersion(version.to_string()));
    }

    let mut components = Path::new(version).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !version.contains(['/', '\\']) => Ok(()),
        _ => Err(LauncherError::InvalidVersion(version.to_string())),
    }
}
