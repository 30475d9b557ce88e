pub mod daily_backup;
pub mod log_poller;
pub mod refresh;
pub mod state;

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Waits until the shutdown flag is raised, or its sender is gone.
pub(crate) async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Interval whose first tick fires immediately. A zero period is raised to
/// one millisecond, since `tokio::time::interval` panics on zero.
pub(crate) fn ticker(period: Duration, missed: MissedTickBehavior) -> Interval {
    let mut ticker = tokio::time::interval(period.max(MIN_PERIOD));
    ticker.set_missed_tick_behavior(missed);
    ticker
}
