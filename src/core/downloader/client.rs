use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};

const DEFAULT_CONCURRENCY: usize = 8;

static PARTIAL_SEQ: AtomicU64 = AtomicU64::new(0);

/// A single file to download with optional SHA-1 for validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
    pub size: Option<u64>,
}

/// Concurrent, SHA-1 validated downloader.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    /// Maximum number of parallel downloads in one batch.
    concurrency: usize,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    // ── Single file download ────────────────────────────

    /// Download a single file to `dest`, optionally validating SHA-1.
    ///
    /// The body is written to a uniquely named `<dest>.<pid>-<n>.part` and
    /// renamed into place, so an interrupted download never leaves a
    /// truncated file at `dest`. Installs of different versions share
    /// `libraries/` and `assets/objects/`; when another writer got the same
    /// file into place first, that copy is kept.
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> LauncherResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| LauncherError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;

        if let Some(expected) = sha1_expected {
            let actual = sha1_hex(&bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(LauncherError::Sha1Mismatch {
                    path: dest.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        let partial = partial_path(dest);
        if let Err(err) = write_partial(&partial, &bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(err);
        }
        if let Err(source) = tokio::fs::rename(&partial, dest).await {
            let _ = tokio::fs::remove_file(&partial).await;
            if !dest.is_file() {
                return Err(LauncherError::Io {
                    path: dest.to_path_buf(),
                    source,
                });
            }
            debug!("{:?} was put in place by another download", dest);
        }

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, bytes.len());
        Ok(())
    }

    // ── Batch concurrent downloads ──────────────────────

    /// Download many files concurrently using `buffer_unordered`.
    ///
    /// Returns the list of files that failed (if any).
    pub async fn download_batch(
        &self,
        entries: Vec<DownloadEntry>,
    ) -> Vec<(DownloadEntry, LauncherError)> {
        debug!(
            "Starting batch download: {} files, concurrency={}",
            entries.len(),
            self.concurrency
        );

        let results: Vec<_> = stream::iter(entries)
            .map(|entry| async move {
                let result = self
                    .download_file(&entry.url, &entry.dest, entry.sha1.as_deref())
                    .await;
                (entry, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let failures: Vec<_> = results
            .into_iter()
            .filter_map(|(entry, result)| result.err().map(|e| (entry, e)))
            .collect();

        if !failures.is_empty() {
            info!("{} downloads in batch failed", failures.len());
        }
        failures
    }
}

fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

async fn write_partial(partial: &Path, bytes: &[u8]) -> LauncherResult<()> {
    let io_err = |source| LauncherError::Io {
        path: partial.to_path_buf(),
        source,
    };
    let mut file = tokio::fs::File::create(partial).await.map_err(io_err)?;
    file.write_all(bytes).await.map_err(io_err)?;
    file.flush().await.map_err(io_err)?;
    // handle dropped before the rename (required on Windows)
    Ok(())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    let seq = PARTIAL_SEQ.fetch_add(1, Ordering::Relaxed);
    name.push(format!(".{}-{}.part", std::process::id(), seq));
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;

    #[test]
    fn sha1_matches_known_digest() {
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn partial_paths_are_unique_siblings() {
        let dest = Path::new("/tmp/libs/lwjgl-3.3.3.jar");
        let first = partial_path(dest);
        let second = partial_path(dest);

        assert_ne!(first, second);
        for partial in [&first, &second] {
            assert_eq!(partial.parent(), dest.parent());
            let name = partial.file_name().unwrap().to_string_lossy();
            assert!(name.starts_with("lwjgl-3.3.3.jar."));
            assert!(name.ends_with(".part"));
        }
    }

    /// Serves `body` to every connection until the test ends.
    async fn serve(body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body = Arc::new(body);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let body = Arc::clone(&body);
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let head = format!(
                        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    let _ = socket.write_all(&body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{}/lwjgl-3.3.3.jar", addr)
    }

    #[tokio::test]
    async fn concurrent_downloads_of_one_file_all_succeed() {
        let body: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let expected_sha1 = sha1_hex(&body);
        let url = serve(body.clone()).await;

        let temp = tempfile::tempdir().unwrap();
        let dest = temp
            .path()
            .join("libraries/org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3.jar");
        let downloader = Downloader::new(Client::builder().no_proxy().build().unwrap());

        for _ in 0..20 {
            let (a, b, c) = tokio::join!(
                downloader.download_file(&url, &dest, Some(&expected_sha1)),
                downloader.download_file(&url, &dest, Some(&expected_sha1)),
                downloader.download_file(&url, &dest, None),
            );
            a.unwrap();
            b.unwrap();
            c.unwrap();
        }

        assert_eq!(std::fs::read(&dest).unwrap(), body);
        let leftovers: Vec<_> = std::fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name.to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty(), "stale partial files: {:?}", leftovers);
    }

    #[test]
    fn concurrency_is_at_least_one() {
        let downloader = Downloader::new(Client::new()).with_concurrency(0);
        assert_eq!(downloader.concurrency(), 1);
    }
}
