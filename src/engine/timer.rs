use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::engine::clock::Clock;

/// What the countdown task reports to its driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerSignal {
    Tick { seconds_left: u64 },
    Expired,
}

/// Per-session countdown. Bound to one session for its lifetime: started
/// once, stopped at most effectively-once, and emits exactly one
/// `Expired` even when `stop` races the final tick.
///
/// The deadline is absolute (`start + duration` on the monotonic clock),
/// never a decrementing counter, so the countdown survives scheduling
/// jitter and system sleep.
pub(crate) struct Timer {
    stop_tx: watch::Sender<bool>,
}

impl Timer {
    pub(crate) fn start(
        clock: Arc<dyn Clock>,
        duration: Duration,
        tick_interval: Duration,
        signals: mpsc::UnboundedSender<TimerSignal>,
    ) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        tokio::spawn(async move {
            let deadline = clock.monotonic() + duration;
            let mut interval =
                tokio::time::interval_at(clock.monotonic() + tick_interval, tick_interval);
            // After a long suspension the deadline math already accounts
            // for the lost time; a burst of catch-up ticks would not.
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        let left = deadline.saturating_duration_since(clock.monotonic());
                        if left.is_zero() {
                            let _ = signals.send(TimerSignal::Expired);
                            break;
                        }
                        let _ = signals.send(TimerSignal::Tick { seconds_left: left.as_secs() });
                    }
                }
            }
        });

        Self { stop_tx }
    }

    /// Cancel all pending wakes. Idempotent: a second call, or a call
    /// after natural expiry, is a no-op.
    pub(crate) fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}
