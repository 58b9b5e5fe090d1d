use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::core::error::LauncherError;
use crate::core::install::{InstallContext, InstallProgress, VersionInstaller};
use crate::core::layout::{validate_version_id, GameLayout};
use crate::core::progress::ProgressReporter;

use super::gate::PauseGate;

/// Lifecycle state of the install slot for one version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallState {
    #[default]
    Idle,
    Installing,
    Paused,
    Completed,
    Failed,
}

impl InstallState {
    /// A task is running (possibly parked at the gate).
    pub fn is_active(self) -> bool {
        matches!(self, InstallState::Installing | InstallState::Paused)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, InstallState::Completed | InstallState::Failed)
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InstallState::Idle => "idle",
            InstallState::Installing => "installing",
            InstallState::Paused => "paused",
            InstallState::Completed => "completed",
            InstallState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// How an install task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    AlreadyInstalled,
    Installed,
    Cancelled(String),
    Failed(String),
}

impl TaskOutcome {
    pub fn state(&self) -> InstallState {
        match self {
            TaskOutcome::AlreadyInstalled | TaskOutcome::Installed => InstallState::Completed,
            TaskOutcome::Cancelled(_) | TaskOutcome::Failed(_) => InstallState::Failed,
        }
    }

    pub fn error(&self) -> Option<String> {
        match self {
            TaskOutcome::Cancelled(message) | TaskOutcome::Failed(message) => {
                Some(message.clone())
            }
            _ => None,
        }
    }
}

/// One install run for one version, bound to its own reporter, gate and
/// cancel token. Consumed by [`run`](Self::run).
pub struct InstallTask {
    version: String,
    layout: GameLayout,
    installer: Arc<dyn VersionInstaller>,
    reporter: ProgressReporter,
    progress: InstallProgress,
}

impl InstallTask {
    pub fn new(
        version: impl Into<String>,
        layout: GameLayout,
        installer: Arc<dyn VersionInstaller>,
        reporter: ProgressReporter,
        gate: PauseGate,
        cancel: CancellationToken,
    ) -> Self {
        let version = version.into();
        let progress = InstallProgress::new(version.clone(), reporter.clone(), gate, cancel);
        Self {
            version,
            layout,
            installer,
            reporter,
            progress,
        }
    }

    pub async fn run(self) -> TaskOutcome {
        let version = self.version.as_str();

        if let Err(err) = validate_version_id(version) {
            error!("Refusing to install {:?}: {}", version, err);
            self.reporter.set_status("Install failed");
            return TaskOutcome::Failed(err.to_string());
        }

        if self.layout.version_dir(version).exists() {
            info!("Version {} already installed, skipping", version);
            self.reporter
                .set_status(format!("{} already installed", version));
            return TaskOutcome::AlreadyInstalled;
        }

        self.reporter.set_status(format!("Installing {}...", version));
        let ctx = InstallContext {
            version,
            layout: &self.layout,
            progress: &self.progress,
        };

        match self.installer.install(ctx).await {
            Ok(()) => {
                info!("Install of {} finished", version);
                self.reporter.set_status(format!("{} installed", version));
                TaskOutcome::Installed
            }
            Err(err @ LauncherError::InstallCancelled(_)) => {
                info!("Install of {} cancelled", version);
                self.reporter.set_status("Install cancelled");
                TaskOutcome::Cancelled(err.to_string())
            }
            Err(err) => {
                error!("Install of {} failed: {}", version, err);
                self.reporter.set_status("Install failed");
                TaskOutcome::Failed(err.to_string())
            }
        }
    }
}
