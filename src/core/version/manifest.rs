// ─── Version Manifest ───
// Fetches the Mojang version manifest v2 and lists installable versions.

use serde::Deserialize;
use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::layout::GameLayout;

const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// Top-level Mojang version manifest.
#[derive(Debug, Deserialize)]
pub struct VersionManifest {
    #[serde(default)]
    pub latest: Option<LatestVersions>,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

/// A single entry in the manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    #[serde(rename = "releaseTime")]
    pub release_time: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionManifest {
    /// Fetch the version manifest from Mojang using a shared HTTP client.
    pub async fn fetch(client: &reqwest::Client) -> LauncherResult<Self> {
        info!("Fetching Minecraft version manifest...");

        let response = client.get(VERSION_MANIFEST_URL).send().await?;
        if !response.status().is_success() {
            return Err(LauncherError::DownloadFailed {
                url: VERSION_MANIFEST_URL.to_string(),
                status: response.status().as_u16(),
            });
        }
        let manifest: VersionManifest = response.json().await?;

        info!("Loaded {} versions from manifest", manifest.versions.len());
        Ok(manifest)
    }

    /// Find a specific version entry by ID (e.g. "1.20.4").
    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// List all official stable versions (release only), newest first.
    pub fn releases(&self) -> Vec<&VersionEntry> {
        self.versions
            .iter()
            .filter(|v| v.version_type == "release")
            .collect()
    }
}

/// Versions offered to the user, read once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionCatalog {
    /// Manifest order (every type, newest first), then local-only installs.
    pub versions: Vec<String>,
    pub latest_release: Option<String>,
    pub installed: Vec<String>,
}

impl VersionCatalog {
    pub fn from_sources(manifest: Option<&VersionManifest>, installed: Vec<String>) -> Self {
        let mut versions: Vec<String> = manifest
            .map(|m| m.versions.iter().map(|entry| entry.id.clone()).collect())
            .unwrap_or_default();

        for id in &installed {
            if !versions.contains(id) {
                versions.push(id.clone());
            }
        }

        let latest_release = manifest
            .and_then(|m| {
                m.latest
                    .as_ref()
                    .map(|l| l.release.clone())
                    .or_else(|| m.releases().first().map(|entry| entry.id.clone()))
            })
            .or_else(|| versions.first().cloned());

        Self {
            versions,
            latest_release,
            installed,
        }
    }

    /// Load the catalog; a manifest failure degrades to installed versions only.
    pub async fn load(client: &reqwest::Client, layout: &GameLayout) -> LauncherResult<Self> {
        let installed = layout.installed_versions()?;
        let manifest = match VersionManifest::fetch(client).await {
            Ok(manifest) => Some(manifest),
            Err(err) => {
                warn!("Version manifest unavailable, listing installed versions only: {}", err);
                None
            }
        };
        Ok(Self::from_sources(manifest.as_ref(), installed))
    }

    /// Version selected when the user has not picked one yet.
    pub fn default_version(&self) -> Option<&str> {
        self.latest_release
            .as_deref()
            .or_else(|| self.versions.first().map(String::as_str))
    }
}
