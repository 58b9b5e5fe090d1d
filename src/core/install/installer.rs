use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::layout::GameLayout;
use crate::core::progress::ProgressReporter;
use crate::core::task::PauseGate;

/// Everything an installer needs for one run.
pub struct InstallContext<'a> {
    pub version: &'a str,
    pub layout: &'a GameLayout,
    pub progress: &'a InstallProgress,
}

/// The version-install procedure driven by an install task.
///
/// Implementations report through `ctx.progress` and must call
/// [`InstallProgress::set_progress`] between discrete work units; that call
/// is where pausing and cancellation take effect.
#[async_trait]
pub trait VersionInstaller: Send + Sync {
    async fn install(&self, ctx: InstallContext<'_>) -> LauncherResult<()>;
}

/// Progress callbacks handed to an installer, bound to one task's reporter,
/// pause gate, and cancel token.
#[derive(Debug, Clone)]
pub struct InstallProgress {
    version: String,
    reporter: ProgressReporter,
    gate: PauseGate,
    cancel: CancellationToken,
}

impl InstallProgress {
    pub fn new(
        version: impl Into<String>,
        reporter: ProgressReporter,
        gate: PauseGate,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            version: version.into(),
            reporter,
            gate,
            cancel,
        }
    }

    pub fn set_status(&self, status: impl Into<String>) {
        self.reporter.set_status(status);
    }

    pub fn set_max(&self, total: u64) {
        self.reporter.set_max(total);
    }

    /// Block while the gate is paused, then record `completed`.
    ///
    /// Returns [`LauncherError::InstallCancelled`] if the task was cancelled
    /// before or while waiting; nothing is recorded in that case.
    pub async fn set_progress(&self, completed: u64) -> LauncherResult<()> {
        if self.gate.is_paused() {
            debug!("Install of {} parked at {} units", self.version, completed);
        }
        if !self.gate.wait_or_cancel(&self.cancel).await {
            return Err(LauncherError::InstallCancelled(self.version.clone()));
        }
        self.reporter.set_progress(completed);
        Ok(())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
