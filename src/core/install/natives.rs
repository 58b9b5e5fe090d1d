use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

/// Extract `.dll`/`.so`/`.dylib`/`.jnilib` files from native archives into
/// `natives_dir`. Only top-level entries are taken; `META-INF` and class
/// files are skipped. Returns the number of files written.
pub async fn extract_natives(archives: &[PathBuf], natives_dir: &Path) -> LauncherResult<usize> {
    tokio::fs::create_dir_all(natives_dir)
        .await
        .map_err(|source| LauncherError::Io {
            path: natives_dir.to_path_buf(),
            source,
        })?;

    let archives = archives.to_vec();
    let dest_dir = natives_dir.to_path_buf();
    tokio::task::spawn_blocking(move || -> LauncherResult<usize> {
        let mut extracted = 0;
        for archive_path in &archives {
            extracted += extract_archive(archive_path, &dest_dir)?;
        }
        Ok(extracted)
    })
    .await
    .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))?
}

fn extract_archive(archive_path: &Path, dest_dir: &Path) -> LauncherResult<usize> {
    let file = std::fs::File::open(archive_path).map_err(|source| LauncherError::Io {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut extracted = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if !is_native_library(&name) {
            continue;
        }

        let dest = dest_dir.join(&name);
        let mut out = std::fs::File::create(&dest).map_err(|source| LauncherError::Io {
            path: dest.clone(),
            source,
        })?;
        std::io::copy(&mut entry, &mut out).map_err(|source| LauncherError::Io {
            path: dest.clone(),
            source,
        })?;
        debug!("Extracted native: {}", name);
        extracted += 1;
    }

    Ok(extracted)
}

fn is_native_library(name: &str) -> bool {
    if name.starts_with("META-INF") || name.contains('/') || name.contains('\\') {
        return false;
    }
    [".dll", ".so", ".dylib", ".jnilib"]
        .iter()
        .any(|ext| name.ends_with(ext))
}
