use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the install/launch core.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Versions ────────────────────────────────────────
    #[error("Invalid version identifier: {0:?}")]
    InvalidVersion(String),

    #[error("Minecraft version {0} not found in manifest")]
    VersionNotFound(String),

    #[error("Version {0} is not installed")]
    VersionNotInstalled(String),

    // ── Tasks ───────────────────────────────────────────
    #[error("Installation of {0} was cancelled")]
    InstallCancelled(String),

    // ── Launch ──────────────────────────────────────────
    #[error("Launch failed: {0}")]
    LaunchFailed(String),

    // ── System resources ────────────────────────────────
    #[error("System resource query failed: {0}")]
    ResourceQuery(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl LauncherError {
    /// Collapse any error raised while preparing or spawning the game into
    /// the single launch failure reported to the user.
    pub fn into_launch_failure(self) -> Self {
        match self {
            LauncherError::LaunchFailed(_) => self,
            other => LauncherError::LaunchFailed(other.to_string()),
        }
    }
}
