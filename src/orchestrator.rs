//! Run orchestration
//!
//! Owns the lifecycle of the three observers around one execution of a
//! target:
//!
//! ```text
//! start:    timer → call tracer → sampler thread
//! execute:  target runs on the calling thread, tracer handles its events inline
//! teardown: stop + join sampler → stop tracer → stop timer
//! assemble: RunResult from the final state of each observer
//! ```
//!
//! Teardown always happens, including when the target fails or panics, so
//! the sampler thread never outlives `run()`. A failed target yields an error
//! and no result. A sampler that dies mid-run only costs the resource
//! figures: the run is still reported, with CPU and memory at 0.0.

use crate::call_tracer::{CallTracer, SourceFilter};
use crate::clock::{Clock, MonotonicClock};
use crate::report::RunResult;
use crate::sampler::{ResourceSampler, SamplerError, SamplerHandle, DEFAULT_SAMPLE_INTERVAL};
use crate::target::{Target, TargetError};
use crate::timer::ExecutionTimer;
use chrono::Utc;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default number of hotspots kept in a run record
pub const DEFAULT_TOP_N: usize = 10;

/// Errors that abort a run
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Target execution failed: {0}")]
    Target(#[from] TargetError),

    /// The sampler thread could not be started
    #[error(transparent)]
    Sampler(#[from] SamplerError),
}

/// Coordinates timer, call tracer and resource sampler around a target
pub struct RunOrchestrator {
    clock: Arc<dyn Clock>,
    filter: SourceFilter,
    top_n: usize,
    sample_interval: Duration,
}

impl Default for RunOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl RunOrchestrator {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(MonotonicClock::new()),
            filter: SourceFilter::default(),
            top_n: DEFAULT_TOP_N,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }

    /// Time source shared by the timer and the tracer
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_filter(mut self, filter: SourceFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Execute `target` once under instrumentation
    pub fn run(&self, target: &mut dyn Target) -> Result<RunResult, RunError> {
        let identifier = target.identifier().to_string();
        let sampler = ResourceSampler::new(target.resource_probe());

        let mut timer = ExecutionTimer::new(self.clock.clone());
        let mut tracer = CallTracer::new(self.clock.clone(), self.filter.clone());

        let started_at = Utc::now();
        timer.start();
        tracer.start();
        let handle = match SamplerHandle::spawn(sampler, self.sample_interval) {
            Ok(handle) => handle,
            Err(e) => {
                tracer.stop();
                timer.stop();
                return Err(e.into());
            }
        };

        tracing::info!(target_name = %identifier, "Run started");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| target.execute(&mut tracer)))
            .unwrap_or_else(|payload| Err(TargetError::Panicked(panic_message(payload.as_ref()))));

        let sampled = handle.stop();
        tracer.stop();
        timer.stop();

        if let Err(e) = outcome {
            tracing::warn!(target_name = %identifier, "Run aborted: {}", e);
            return Err(e.into());
        }

        let (avg_cpu_percent, peak_memory_mb, samples) = match sampled {
            Ok(sampler) => (sampler.average_cpu(), sampler.peak_memory(), sampler.sample_count()),
            Err(e) => {
                tracing::warn!(target_name = %identifier, "Resource samples lost: {}", e);
                (0.0, 0.0, 0)
            }
        };

        let result = RunResult {
            target: identifier,
            timestamp: started_at,
            execution_time: timer.elapsed_secs(),
            avg_cpu_percent,
            peak_memory_mb,
            hotspots: tracer.top(self.top_n),
            suggestions: None,
            regression: None,
        };

        tracing::info!(
            target_name = %result.target,
            execution_time = result.execution_time,
            samples,
            hotspots = result.hotspots.len(),
            "Run finished"
        );

        Ok(result)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
