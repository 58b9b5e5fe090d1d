// ─── Progress Reporter ───
// Producer/consumer pair over a single-slot latest-value channel.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

/// Latest known progress values for one task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub total: u64,
    pub completed: u64,
    pub status: String,
}

impl ProgressSnapshot {
    /// Whole-number percentage, `floor(100 * completed / total)`; 0 when no
    /// total has been reported yet.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let completed = self.completed.min(self.total) as u128;
        (completed * 100 / self.total as u128) as u8
    }

    /// `"<completed> / <total> (<percent>%)"`, the format shown next to the bar.
    pub fn counter_label(&self) -> String {
        format!("{} / {} ({}%)", self.completed, self.total, self.percent())
    }
}

/// Producer side. Cheap to clone; clones write the same slot.
///
/// Malformed input never fails: counts above the total are clamped, and a
/// count lower than the one already recorded is ignored so that readers only
/// ever see progress move forward.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: Arc<watch::Sender<ProgressSnapshot>>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    /// Record the number of work units. May be called again if the total is
    /// revised; the current count is clamped to the new total.
    pub fn set_max(&self, total: u64) {
        self.tx.send_modify(|snapshot| {
            snapshot.total = total;
            snapshot.completed = snapshot.completed.min(total);
        });
    }

    pub fn set_progress(&self, completed: u64) {
        self.tx.send_if_modified(|snapshot| {
            let next = completed.min(snapshot.total);
            if next <= snapshot.completed {
                return false;
            }
            snapshot.completed = next;
            true
        });
    }

    pub fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        self.tx.send_modify(|snapshot| snapshot.status = status);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.tx.borrow().clone()
    }

    pub fn watcher(&self) -> ProgressWatcher {
        ProgressWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

/// Consumer side. Reads never block and always return the most recent values.
#[derive(Debug, Clone)]
pub struct ProgressWatcher {
    rx: watch::Receiver<ProgressSnapshot>,
}

impl ProgressWatcher {
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.rx.borrow().clone()
    }

    /// Wait for the next update and return it. `None` once the producer is gone.
    pub async fn changed(&mut self) -> Option<ProgressSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
