// ─── Task Supervisor ───
// Owns at most one install task per version. The foreground calls in here
// synchronously; installs run on their own Tokio tasks and publish state
// through watch channels.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::core::install::VersionInstaller;
use crate::core::layout::GameLayout;
use crate::core::progress::{ProgressReporter, ProgressSnapshot, ProgressWatcher};

use super::gate::PauseGate;
use super::install::{InstallState, InstallTask, TaskOutcome};

/// Point-in-time view of one version's install slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStatus {
    pub version: String,
    pub state: InstallState,
    pub progress: ProgressSnapshot,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A task for this version was already installing or paused.
    AlreadyRunning,
}

#[derive(Debug, Clone, Default)]
struct TaskRecord {
    state: InstallState,
    error: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

struct TaskSlot {
    reporter: ProgressReporter,
    gate: PauseGate,
    cancel: CancellationToken,
    record: Arc<watch::Sender<TaskRecord>>,
}

impl TaskSlot {
    fn with_record(record: TaskRecord) -> Self {
        let (tx, _rx) = watch::channel(record);
        Self {
            reporter: ProgressReporter::new(),
            gate: PauseGate::new(),
            cancel: CancellationToken::new(),
            record: Arc::new(tx),
        }
    }

    fn idle() -> Self {
        Self::with_record(TaskRecord::default())
    }

    fn started() -> Self {
        Self::with_record(TaskRecord {
            state: InstallState::Installing,
            started_at: Some(Utc::now()),
            ..Default::default()
        })
    }

    fn state(&self) -> InstallState {
        self.record.borrow().state
    }

    fn status(&self, version: &str) -> TaskStatus {
        let record = self.record.borrow().clone();
        TaskStatus {
            version: version.to_string(),
            state: record.state,
            progress: self.reporter.snapshot(),
            error: record.error,
            started_at: record.started_at,
            finished_at: record.finished_at,
        }
    }
}

pub struct TaskSupervisor {
    layout: GameLayout,
    installer: Arc<dyn VersionInstaller>,
    slots: Mutex<HashMap<String, TaskSlot>>,
}

impl TaskSupervisor {
    pub fn new(layout: GameLayout, installer: Arc<dyn VersionInstaller>) -> Self {
        Self {
            layout,
            installer,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn layout(&self) -> &GameLayout {
        &self.layout
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<String, TaskSlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn an install task for `version` unless one is already running.
    ///
    /// Must be called from within a Tokio runtime. The slot is switched to
    /// `Installing` before this returns, so an immediate second call is
    /// coalesced.
    pub fn start(&self, version: &str) -> StartOutcome {
        let mut slots = self.lock_slots();
        if let Some(slot) = slots.get(version) {
            if slot.state().is_active() {
                info!("Install of {} already running", version);
                return StartOutcome::AlreadyRunning;
            }
        }

        let slot = TaskSlot::started();
        let task = InstallTask::new(
            version,
            self.layout.clone(),
            Arc::clone(&self.installer),
            slot.reporter.clone(),
            slot.gate.clone(),
            slot.cancel.clone(),
        );
        let record = Arc::clone(&slot.record);
        slots.insert(version.to_string(), slot);
        drop(slots);

        let version = version.to_string();
        let handle = tokio::spawn(task.run());
        tokio::spawn(async move {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    error!("Install task for {} aborted: {}", version, join_err);
                    TaskOutcome::Failed(format!("Install task aborted: {}", join_err))
                }
            };
            debug!("Install task for {} ended: {:?}", version, outcome);
            record.send_modify(|record| {
                record.state = outcome.state();
                record.error = outcome.error();
                record.finished_at = Some(Utc::now());
            });
        });

        StartOutcome::Started
    }

    /// Flip the pause flag for `version` and return the new value.
    ///
    /// An installing task becomes `Paused` and vice versa, and its status
    /// text says so; in any other state only the flag changes.
    pub fn toggle_pause(&self, version: &str) -> bool {
        let mut slots = self.lock_slots();
        let slot = slots
            .entry(version.to_string())
            .or_insert_with(TaskSlot::idle);

        let paused = slot.gate.toggle();
        let moved = slot.record.send_if_modified(|record| {
            let next = match (record.state, paused) {
                (InstallState::Installing, true) => InstallState::Paused,
                (InstallState::Paused, false) => InstallState::Installing,
                _ => return false,
            };
            record.state = next;
            true
        });
        if moved {
            slot.reporter
                .set_status(if paused { "Install paused" } else { "Install resumed" });
        }

        info!(
            "Install of {} {}",
            version,
            if paused { "paused" } else { "resumed" }
        );
        paused
    }

    /// Signal the running task for `version` to stop at its next progress
    /// report. Returns `false` if nothing was running.
    pub fn cancel(&self, version: &str) -> bool {
        let slots = self.lock_slots();
        match slots.get(version) {
            Some(slot) if slot.state().is_active() => {
                info!("Cancelling install of {}", version);
                slot.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    pub fn status(&self, version: &str) -> Option<TaskStatus> {
        self.lock_slots()
            .get(version)
            .map(|slot| slot.status(version))
    }

    /// Every known slot, sorted by version id.
    pub fn statuses(&self) -> Vec<TaskStatus> {
        let slots = self.lock_slots();
        let mut statuses: Vec<TaskStatus> = slots
            .iter()
            .map(|(version, slot)| slot.status(version))
            .collect();
        statuses.sort_by(|a, b| a.version.cmp(&b.version));
        statuses
    }

    /// Live progress feed for the current task of `version`.
    pub fn watch_progress(&self, version: &str) -> Option<ProgressWatcher> {
        self.lock_slots()
            .get(version)
            .map(|slot| slot.reporter.watcher())
    }

    /// Resolve once `version` is no longer installing or paused.
    pub async fn wait(&self, version: &str) -> Option<TaskStatus> {
        let mut rx = {
            let slots = self.lock_slots();
            slots.get(version)?.record.subscribe()
        };
        // The completion task holds the sender until it has written the
        // terminal state, so a closed channel means we are already done.
        let _ = rx.wait_for(|record| !record.state.is_active()).await;
        self.status(version)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::core::error::{LauncherError, LauncherResult};
    use crate::core::install::InstallContext;

    struct FakeInstaller {
        steps: u64,
        step_delay: Duration,
        fail_for: Option<&'static str>,
        release: Option<Arc<Notify>>,
        calls: AtomicUsize,
    }

    impl Default for FakeInstaller {
        fn default() -> Self {
            Self {
                steps: 3,
                step_delay: Duration::from_millis(5),
                fail_for: None,
                release: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VersionInstaller for FakeInstaller {
        async fn install(&self, ctx: InstallContext<'_>) -> LauncherResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(release) = &self.release {
                release.notified().await;
            }
            if self.fail_for == Some(ctx.version) {
                return Err(LauncherError::Other("connection reset by peer".into()));
            }

            ctx.progress.set_max(self.steps);
            for step in 1..=self.steps {
                tokio::time::sleep(self.step_delay).await;
                ctx.progress.set_progress(step).await?;
            }
            Ok(())
        }
    }

    fn harness(
        installer: FakeInstaller,
    ) -> (tempfile::TempDir, Arc<FakeInstaller>, TaskSupervisor) {
        let temp = tempfile::tempdir().unwrap();
        let installer = Arc::new(installer);
        let supervisor = TaskSupervisor::new(GameLayout::new(temp.path()), installer.clone());
        (temp, installer, supervisor)
    }

    async fn wait_for_progress(supervisor: &TaskSupervisor, version: &str, at_least: u64) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let status = supervisor.status(version).unwrap();
                if status.progress.completed >= at_least {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("install should make progress");
    }

    #[tokio::test]
    async fn installed_version_completes_without_installer() {
        let (temp, installer, supervisor) = harness(FakeInstaller::default());
        std::fs::create_dir_all(temp.path().join("versions").join("1.20.4")).unwrap();

        assert_eq!(supervisor.start("1.20.4"), StartOutcome::Started);
        let status = supervisor.wait("1.20.4").await.unwrap();

        assert_eq!(status.state, InstallState::Completed);
        assert_eq!(status.progress.status, "1.20.4 already installed");
        assert!(status.finished_at.is_some());
        assert_eq!(installer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn second_start_while_installing_is_coalesced() {
        let release = Arc::new(Notify::new());
        let (_temp, installer, supervisor) = harness(FakeInstaller {
            release: Some(release.clone()),
            ..Default::default()
        });

        assert_eq!(supervisor.start("1.20.4"), StartOutcome::Started);
        assert_eq!(supervisor.status("1.20.4").unwrap().state, InstallState::Installing);
        assert_eq!(supervisor.start("1.20.4"), StartOutcome::AlreadyRunning);

        release.notify_one();
        let status = supervisor.wait("1.20.4").await.unwrap();

        assert_eq!(status.state, InstallState::Completed);
        assert_eq!(installer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn paused_install_makes_no_progress_until_resumed() {
        let (_temp, _installer, supervisor) = harness(FakeInstaller {
            steps: 5,
            step_delay: Duration::from_millis(20),
            ..Default::default()
        });

        supervisor.start("1.20.4");
        wait_for_progress(&supervisor, "1.20.4", 1).await;

        assert_eq!(
            supervisor.status("1.20.4").unwrap().progress.status,
            "Installing 1.20.4..."
        );
        assert!(supervisor.toggle_pause("1.20.4"));
        let paused = supervisor.status("1.20.4").unwrap();
        assert_eq!(paused.state, InstallState::Paused);
        assert_eq!(paused.progress.status, "Install paused");

        // Let the unit in flight settle, then nothing may move.
        tokio::time::sleep(Duration::from_millis(60)).await;
        let parked = supervisor.status("1.20.4").unwrap().progress.completed;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(supervisor.status("1.20.4").unwrap().progress.completed, parked);
        assert!(parked < 5);

        assert!(!supervisor.toggle_pause("1.20.4"));
        let resumed = supervisor.status("1.20.4").unwrap();
        assert_eq!(resumed.state, InstallState::Installing);
        assert_eq!(resumed.progress.status, "Install resumed");

        let status = supervisor.wait("1.20.4").await.unwrap();
        assert_eq!(status.state, InstallState::Completed);
        assert_eq!(status.progress.completed, 5);
        assert_eq!(status.progress.status, "1.20.4 installed");
    }

    #[tokio::test]
    async fn failure_keeps_error_text_and_other_versions_still_install() {
        let (_temp, installer, supervisor) = harness(FakeInstaller {
            fail_for: Some("1.19.2"),
            ..Default::default()
        });

        supervisor.start("1.19.2");
        let failed = supervisor.wait("1.19.2").await.unwrap();
        assert_eq!(failed.state, InstallState::Failed);
        assert_eq!(failed.error.as_deref(), Some("connection reset by peer"));
        assert_eq!(failed.progress.status, "Install failed");

        assert_eq!(supervisor.start("1.20.4"), StartOutcome::Started);
        let done = supervisor.wait("1.20.4").await.unwrap();
        assert_eq!(done.state, InstallState::Completed);
        assert_eq!(installer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_version_can_be_restarted() {
        let (_temp, installer, supervisor) = harness(FakeInstaller {
            fail_for: Some("1.19.2"),
            ..Default::default()
        });

        supervisor.start("1.19.2");
        supervisor.wait("1.19.2").await;
        assert_eq!(supervisor.start("1.19.2"), StartOutcome::Started);
        supervisor.wait("1.19.2").await;

        assert_eq!(installer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancel_wakes_a_paused_install() {
        let (_temp, _installer, supervisor) = harness(FakeInstaller {
            steps: 5,
            step_delay: Duration::from_millis(20),
            ..Default::default()
        });

        supervisor.start("1.20.4");
        wait_for_progress(&supervisor, "1.20.4", 1).await;
        supervisor.toggle_pause("1.20.4");

        assert!(supervisor.cancel("1.20.4"));
        let status = tokio::time::timeout(Duration::from_secs(2), supervisor.wait("1.20.4"))
            .await
            .expect("cancel should end the task")
            .unwrap();

        assert_eq!(status.state, InstallState::Failed);
        assert_eq!(status.progress.status, "Install cancelled");
        assert!(!supervisor.cancel("1.20.4"));
    }

    #[tokio::test]
    async fn toggle_without_task_only_flips_the_flag() {
        let (_temp, installer, supervisor) = harness(FakeInstaller::default());

        assert!(supervisor.toggle_pause("1.20.4"));
        let idle = supervisor.status("1.20.4").unwrap();
        assert_eq!(idle.state, InstallState::Idle);
        assert_eq!(idle.progress.status, "");
        assert!(!supervisor.toggle_pause("1.20.4"));
        assert_eq!(installer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn start_resets_a_paused_flag() {
        let (_temp, _installer, supervisor) = harness(FakeInstaller::default());

        supervisor.toggle_pause("1.20.4");
        supervisor.start("1.20.4");
        let status = supervisor.wait("1.20.4").await.unwrap();

        assert_eq!(status.state, InstallState::Completed);
    }

    #[tokio::test]
    async fn statuses_are_sorted_and_unknown_is_none() {
        let (_temp, _installer, supervisor) = harness(FakeInstaller::default());

        supervisor.start("1.20.4");
        supervisor.start("1.16.5");
        supervisor.wait("1.20.4").await;
        supervisor.wait("1.16.5").await;

        let versions: Vec<_> = supervisor.statuses().into_iter().map(|s| s.version).collect();
        assert_eq!(versions, vec!["1.16.5", "1.20.4"]);
        assert!(supervisor.status("1.8.9").is_none());
        assert!(supervisor.wait("1.8.9").await.is_none());
    }
}
