use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::core::downloader::{DownloadEntry, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::AssetIndexInfo;

/// Plans Minecraft asset downloads (sounds, textures referenced by asset index).
pub struct AssetManager;

/// Top-level asset index JSON structure.
#[derive(Debug, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

impl AssetManager {
    /// Make sure `assets/indexes/<id>.json` is present, then return the
    /// objects it references that are not cached under `assets/objects/`.
    pub async fn plan_assets(
        info: &AssetIndexInfo,
        assets_dir: &Path,
        downloader: &Downloader,
    ) -> LauncherResult<Vec<DownloadEntry>> {
        let index_path = assets_dir
            .join("indexes")
            .join(format!("{}.json", info.id));
        if !index_path.exists() {
            downloader
                .download_file(&info.url, &index_path, info.sha1.as_deref())
                .await?;
        }

        let raw = tokio::fs::read_to_string(&index_path)
            .await
            .map_err(|source| LauncherError::Io {
                path: index_path.clone(),
                source,
            })?;
        let index: AssetIndex = serde_json::from_str(&raw)?;

        let entries = Self::missing_objects(&index, &assets_dir.join("objects"));
        info!(
            "Asset index {}: {} objects to download ({} already cached)",
            info.id,
            entries.len(),
            index.objects.len() - entries.len()
        );
        Ok(entries)
    }

    /// One entry per distinct hash that is not on disk yet.
    pub fn missing_objects(index: &AssetIndex, objects_dir: &Path) -> Vec<DownloadEntry> {
        let mut entries: Vec<DownloadEntry> = Vec::new();
        let mut hashes: Vec<&str> = index.objects.values().map(|o| o.hash.as_str()).collect();
        hashes.sort_unstable();
        hashes.dedup();

        for hash in hashes {
            if !is_sha1_hex(hash) {
                warn!("Skipping asset with malformed hash {:?}", hash);
                continue;
            }
            let prefix = &hash[..2];
            let dest = objects_dir.join(prefix).join(hash);
            if dest.exists() {
                continue;
            }
            let size = index
                .objects
                .values()
                .find(|o| o.hash == hash)
                .map(|o| o.size);
            entries.push(DownloadEntry {
                url: format!("{}/{}/{}", RESOURCES_URL, prefix, hash),
                dest,
                sha1: Some(hash.to_string()),
                size,
            });
        }

        entries
    }
}

/// Lowercase 40-digit hex; anything else is unsafe as a path component.
fn is_sha1_hex(hash: &str) -> bool {
    hash.len() == 40
        && hash
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
