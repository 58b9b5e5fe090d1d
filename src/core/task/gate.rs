// ─── Pause Gate ───
// Cooperative pause flag checked by a running install between work units.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Binary pause flag shared between the foreground and one install task.
///
/// The task only looks at the gate at its own yield points, so a paused
/// install finishes the work unit it is in and then parks until resumed.
#[derive(Debug, Clone)]
pub struct PauseGate {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Flip the flag and return the new value (`true` = paused).
    pub fn toggle(&self) -> bool {
        let mut paused = false;
        self.tx.send_modify(|flag| {
            *flag = !*flag;
            paused = *flag;
        });
        paused
    }

    pub fn is_paused(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn pause(&self) {
        self.tx.send_if_modified(|flag| !std::mem::replace(flag, true));
    }

    pub fn resume(&self) {
        self.tx.send_if_modified(|flag| std::mem::replace(flag, false));
    }

    /// Return once the gate is open. Suspends without polling while paused.
    pub async fn wait_until_resumed(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|paused| !*paused).await;
    }

    /// Like [`wait_until_resumed`](Self::wait_until_resumed), but gives up
    /// when `cancel` fires. Returns `false` if cancelled.
    pub async fn wait_or_cancel(&self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = self.wait_until_resumed() => !cancel.is_cancelled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn toggle_flips_and_reports_new_state() {
        let gate = PauseGate::new();
        assert!(!gate.is_paused());
        assert!(gate.toggle());
        assert!(gate.is_paused());
        assert!(!gate.toggle());
        assert!(!gate.is_paused());
    }

    #[test]
    fn clones_share_the_flag() {
        let gate = PauseGate::new();
        let other = gate.clone();
        other.pause();
        assert!(gate.is_paused());
        gate.resume();
        assert!(!other.is_paused());
    }

    #[tokio::test]
    async fn open_gate_does_not_block() {
        let gate = PauseGate::new();
        tokio::time::timeout(Duration::from_millis(100), gate.wait_until_resumed())
            .await
            .expect("open gate should pass immediately");
    }

    #[tokio::test]
    async fn paused_gate_blocks_until_resume() {
        let gate = PauseGate::new();
        gate.pause();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait_until_resumed().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        gate.toggle();
        tokio::time::timeout(Duration::from_millis(500), waiter)
            .await
            .expect("waiter should wake after resume")
            .expect("waiter task should not panic");
    }

    #[tokio::test]
    async fn cancel_wakes_a_paused_waiter() {
        let gate = PauseGate::new();
        let cancel = CancellationToken::new();
        gate.pause();

        let waiter = {
            let gate = gate.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { gate.wait_or_cancel(&cancel).await })
        };

        cancel.cancel();
        let resumed = tokio::time::timeout(Duration::from_millis(500), waiter)
            .await
            .expect("cancel should wake the waiter")
            .expect("waiter task should not panic");
        assert!(!resumed);
        assert!(gate.is_paused());
    }
}
