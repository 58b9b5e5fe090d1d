use std::path::Path;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::core::assets::AssetManager;
use crate::core::downloader::{DownloadEntry, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::{VersionJson, VersionManifest};

use super::installer::{InstallContext, VersionInstaller};
use super::natives::extract_natives;

/// Vanilla installer — resolves the official Mojang version JSON and fetches
/// the client jar, libraries (with OS rules evaluation), and assets.
///
/// Version files are assembled in `versions/.<id>.partial/` and renamed to
/// `versions/<id>/` only after everything is in place, so an interrupted
/// install never looks complete.
pub struct VanillaInstaller {
    client: reqwest::Client,
    downloader: Downloader,
}

impl VanillaInstaller {
    pub fn new(client: reqwest::Client, downloader: Downloader) -> Self {
        Self { client, downloader }
    }

    async fn install_into(&self, ctx: &InstallContext<'_>, staging: &Path) -> LauncherResult<()> {
        let version = ctx.version;
        let progress = ctx.progress;

        // 1. Resolve the version JSON through the manifest
        progress.set_status("Fetching version manifest");
        let manifest = VersionManifest::fetch(&self.client).await?;
        let entry = manifest
            .find_version(version)
            .ok_or_else(|| LauncherError::VersionNotFound(version.to_string()))?;

        progress.set_status(format!("Resolving {}", version));
        let (version_json, raw_json) = VersionJson::fetch(&self.client, &entry.url).await?;

        // 2. Plan every file (client jar, libraries, assets) up front
        let mut plan: Vec<DownloadEntry> = Vec::new();
        plan.extend(version_json.client_download(staging.join(format!("{}.jar", version))));

        let libraries = version_json.plan_libraries(&ctx.layout.libraries_dir());
        plan.extend(libraries.downloads);

        if let Some(asset_index) = &version_json.asset_index {
            progress.set_status(format!("Resolving asset index {}", asset_index.id));
            plan.extend(
                AssetManager::plan_assets(asset_index, &ctx.layout.assets_dir(), &self.downloader)
                    .await?,
            );
        }

        // 3. Download in chunks; each progress report is a pause point
        let total = plan.len() as u64;
        progress.set_max(total);
        progress.set_status(format!("Downloading {} files", total));
        info!("Install plan for {}: {} files", version, total);

        let mut done = 0u64;
        for chunk in plan.chunks(self.downloader.concurrency()) {
            let failures = self.downloader.download_batch(chunk.to_vec()).await;
            if let Some((entry, err)) = failures.into_iter().next() {
                warn!("Download of {} failed: {}", entry.url, err);
                return Err(err);
            }
            done += chunk.len() as u64;
            progress.set_progress(done).await?;
        }

        // 4. Natives, version JSON, then publish the version directory
        if !libraries.native_archives.is_empty() {
            progress.set_status("Extracting natives");
            extract_natives(&libraries.native_archives, &staging.join("natives")).await?;
        }

        let json_path = staging.join(format!("{}.json", version));
        tokio::fs::write(&json_path, raw_json)
            .await
            .map_err(|source| LauncherError::Io {
                path: json_path,
                source,
            })?;

        Ok(())
    }
}

#[async_trait]
impl VersionInstaller for VanillaInstaller {
    async fn install(&self, ctx: InstallContext<'_>) -> LauncherResult<()> {
        info!("Installing Vanilla {}", ctx.version);

        let staging = ctx.layout.staging_dir(ctx.version);
        reset_dir(&staging).await?;

        if let Err(err) = self.install_into(&ctx, &staging).await {
            if let Err(cleanup) = tokio::fs::remove_dir_all(&staging).await {
                warn!("Cannot remove staging dir {:?}: {}", staging, cleanup);
            }
            return Err(err);
        }

        let target = ctx.layout.version_dir(ctx.version);
        tokio::fs::rename(&staging, &target)
            .await
            .map_err(|source| LauncherError::Io {
                path: target.clone(),
                source,
            })?;

        info!("Vanilla {} installed successfully", ctx.version);
        Ok(())
    }
}

async fn reset_dir(path: &Path) -> LauncherResult<()> {
    if path.exists() {
        tokio::fs::remove_dir_all(path)
            .await
            .map_err(|source| LauncherError::Io {
                path: path.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })
}
