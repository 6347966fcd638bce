//! Repeating timers with explicit cancellation.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// A fixed-period task that calls `on_tick` until cancelled.
///
/// Cancellation is deterministic: once `cancel` returns (or the value is
/// dropped) no further tick is delivered. Missed ticks are skipped, never
/// bunched up.
pub struct RepeatingTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl RepeatingTask {
    /// Spawns the timer. The first tick fires immediately. Returning `false`
    /// from `on_tick` ends the task (the receiver is gone).
    pub fn spawn<F>(name: &'static str, period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if !on_tick() {
                            break;
                        }
                    }
                }
            }
            trace!(timer = name, "timer exited");
        });
        Self { cancel, handle }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
