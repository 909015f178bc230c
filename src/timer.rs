//! Wall-clock timing of the target's run window

use crate::clock::Clock;
use std::sync::Arc;
use std::time::Duration;

/// Measures the duration between `start()` and `stop()`
pub struct ExecutionTimer {
    clock: Arc<dyn Clock>,
    started: Option<Duration>,
    stopped: Option<Duration>,
}

impl ExecutionTimer {
    /// Create a timer reading the given clock
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            started: None,
            stopped: None,
        }
    }

    /// Record the start boundary (restarting clears a previous stop)
    pub fn start(&mut self) {
        self.started = Some(self.clock.now());
        self.stopped = None;
    }

    /// Record the stop boundary
    pub fn stop(&mut self) {
        if self.started.is_some() {
            self.stopped = Some(self.clock.now());
        }
    }

    /// Elapsed time of the window
    ///
    /// Zero before `start()`; measured up to now while still running.
    pub fn elapsed(&self) -> Duration {
        match (self.started, self.stopped) {
            (Some(start), Some(stop)) => stop.saturating_sub(start),
            (Some(start), None) => self.clock.now().saturating_sub(start),
            (None, _) => Duration::ZERO,
        }
    }

    /// Elapsed time in seconds
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}
