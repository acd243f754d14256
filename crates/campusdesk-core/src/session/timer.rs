//! A recurring timer with explicit start/stop.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

/// Runs a task on a fixed period until stopped or dropped.
///
/// Ticks that fall due while the previous run is still executing are
/// skipped, never queued.
pub struct RecurringTimer {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl RecurringTimer {
    pub fn new(name: &'static str) -> Self {
        Self { name, handle: None }
    }

    /// Start (or restart) the schedule. The first run happens after
    /// `initial_delay`, then every `period`.
    pub fn start<F, Fut>(&mut self, period: Duration, initial_delay: Duration, mut task: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();

        let name = self.name;
        let period = period.max(Duration::from_millis(1));
        debug!(timer = name, period_ms = period.as_millis() as u64, "Timer started");

        self.handle = Some(tokio::spawn(async move {
            let start = time::Instant::now() + initial_delay;
            let mut interval = time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                task().await;
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!(timer = self.name, "Timer stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}

impl Drop for RecurringTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
