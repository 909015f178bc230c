//! Concurrent process resource sampling
//!
//! A [`ResourceSampler`] accumulates CPU% and resident memory readings taken
//! through a [`ResourceProbe`]. [`SamplerHandle`] runs the sampling loop on a
//! dedicated background thread:
//!
//! ```text
//! ┌──────────────────────────────┐        ┌───────────────────────────────┐
//! │ ORCHESTRATOR THREAD          │        │ SAMPLER THREAD                │
//! │   spawn()  ──────────────────┼──────► │ while running {               │
//! │   ... target executes ...    │        │     sampler.sample();         │
//! │   stop():                    │        │     sleep(interval);          │
//! │     running.store(false)  ───┼──────► │ }                             │
//! │     join() ◄─────────────────┼─────── │ return sampler                │
//! └──────────────────────────────┘        └───────────────────────────────┘
//! ```
//!
//! The running flag is the only state shared across threads. Samples are
//! owned by the sampler thread and handed back through `join`, so reading
//! averages after `stop()` cannot race an in-flight sample.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use thiserror::Error;

/// Fixed period between successive resource observations
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One instantaneous reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    /// Process CPU utilisation (percent of one core, may exceed 100)
    pub cpu_percent: f64,
    /// Resident memory in megabytes
    pub memory_mb: f64,
}

/// Process resource query primitive
pub trait ResourceProbe: Send {
    /// Read the current CPU% and resident memory
    ///
    /// `None` when the process cannot be observed right now (not spawned
    /// yet, already exited).
    fn read(&mut self) -> Option<ResourceSample>;
}

/// Which process a [`SysinfoProbe`] observes
#[derive(Debug, Clone)]
pub enum ProcessSelector {
    /// The profiler's own process
    Current,
    /// A known process id
    Pid(u32),
    /// A process id published later (e.g. by a target once it spawns a child)
    Deferred(Arc<OnceLock<u32>>),
}

impl ProcessSelector {
    fn resolve(&self) -> Option<u32> {
        match self {
            Self::Current => Some(std::process::id()),
            Self::Pid(pid) => Some(*pid),
            Self::Deferred(cell) => cell.get().copied(),
        }
    }
}

/// [`ResourceProbe`] backed by `sysinfo`
///
/// CPU usage is computed by sysinfo from the delta between two refreshes,
/// so the first reading of a process reports 0%.
pub struct SysinfoProbe {
    system: System,
    selector: ProcessSelector,
}

impl SysinfoProbe {
    pub fn new(selector: ProcessSelector) -> Self {
        Self {
            system: System::new(),
            selector,
        }
    }

    /// Probe observing the current process
    pub fn current_process() -> Self {
        Self::new(ProcessSelector::Current)
    }
}

impl ResourceProbe for SysinfoProbe {
    fn read(&mut self) -> Option<ResourceSample> {
        let pid = Pid::from_u32(self.selector.resolve()?);
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );

        self.system.process(pid).map(|process| ResourceSample {
            cpu_percent: f64::from(process.cpu_usage()),
            memory_mb: process.memory() as f64 / BYTES_PER_MB,
        })
    }
}

/// Accumulates resource samples for one run
pub struct ResourceSampler {
    probe: Box<dyn ResourceProbe>,
    samples: Vec<ResourceSample>,
}

impl ResourceSampler {
    pub fn new(probe: Box<dyn ResourceProbe>) -> Self {
        Self {
            probe,
            samples: Vec::new(),
        }
    }

    /// Capture one reading; skipped when the probe cannot observe the process
    pub fn sample(&mut self) -> Option<ResourceSample> {
        let Some(sample) = self.probe.read() else {
            tracing::trace!("Resource probe returned no reading");
            return None;
        };
        self.samples.push(sample);
        Some(sample)
    }

    /// Samples in capture order
    pub fn samples(&self) -> &[ResourceSample] {
        &self.samples
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Arithmetic mean CPU% (0.0 without samples)
    pub fn average_cpu(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|s| s.cpu_percent).sum::<f64>() / self.samples.len() as f64
    }

    /// Maximum resident memory in MB (0.0 without samples)
    pub fn peak_memory(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.memory_mb)
            .fold(0.0, f64::max)
    }
}

/// Errors from the background sampling thread
#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("Failed to spawn sampler thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Sampler thread panicked")]
    Panicked,
}

/// Handle to a sampling loop running on its own thread
///
/// Dropping the handle without calling [`SamplerHandle::stop`] still signals
/// and joins the thread.
pub struct SamplerHandle {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<ResourceSampler>>,
}

impl SamplerHandle {
    /// Start sampling every `interval` until stopped
    pub fn spawn(sampler: ResourceSampler, interval: Duration) -> Result<Self, SamplerError> {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = thread::Builder::new()
            .name("hotscope-sampler".to_string())
            .spawn(move || Self::sampling_loop(sampler, running_clone, interval))?;

        tracing::debug!(interval_ms = interval.as_millis() as u64, "Resource sampler started");

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    fn sampling_loop(
        mut sampler: ResourceSampler,
        running: Arc<AtomicBool>,
        interval: Duration,
    ) -> ResourceSampler {
        while running.load(Ordering::Acquire) {
            sampler.sample();
            thread::sleep(interval);
        }
        sampler
    }

    /// Whether the sampling thread is still alive
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the loop to exit, wait for it, and take back the samples
    ///
    /// Blocks for at most one sampling interval plus an in-flight sample.
    pub fn stop(mut self) -> Result<ResourceSampler, SamplerError> {
        self.running.store(false, Ordering::Release);
        let handle = self.handle.take().ok_or(SamplerError::Panicked)?;
        let sampler = handle.join().map_err(|_| SamplerError::Panicked)?;

        tracing::debug!(samples = sampler.sample_count(), "Resource sampler stopped");
        Ok(sampler)
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.running.store(false, Ordering::Release);
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Replays a fixed list of readings, then repeats the last one
    struct ScriptedProbe {
        readings: Vec<Option<ResourceSample>>,
        next: usize,
    }

    impl ScriptedProbe {
        fn new(readings: Vec<Option<ResourceSample>>) -> Self {
            Self { readings, next: 0 }
        }
    }

    impl ResourceProbe for ScriptedProbe {
        fn read(&mut self) -> Option<ResourceSample> {
            let i = self.next.min(self.readings.len().saturating_sub(1));
            self.next += 1;
            self.readings.get(i).copied().flatten()
        }
    }

    struct CountingProbe {
        reads: Arc<AtomicUsize>,
    }

    impl ResourceProbe for CountingProbe {
        fn read(&mut self) -> Option<ResourceSample> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Some(ResourceSample {
                cpu_percent: 50.0,
                memory_mb: 10.0,
            })
        }
    }

    fn reading(cpu: f64, mem: f64) -> Option<ResourceSample> {
        Some(ResourceSample {
            cpu_percent: cpu,
            memory_mb: mem,
        })
    }

    #[test]
    fn test_empty_sampler_statistics() {
        let sampler = ResourceSampler::new(Box::new(ScriptedProbe::new(vec![])));
        assert_eq!(sampler.average_cpu(), 0.0);
        assert_eq!(sampler.peak_memory(), 0.0);
        assert_eq!(sampler.sample_count(), 0);
    }

    #[test]
    fn test_average_cpu_and_peak_memory() {
        let probe = ScriptedProbe::new(vec![
            reading(10.0, 100.0),
            reading(30.0, 250.5),
            reading(50.0, 180.0),
        ]);
        let mut sampler = ResourceSampler::new(Box::new(probe));
        for _ in 0..3 {
            sampler.sample();
        }

        assert_eq!(sampler.sample_count(), 3);
        assert!((sampler.average_cpu() - 30.0).abs() < 1e-9);
        assert_eq!(sampler.peak_memory(), 250.5);
    }

    #[test]
    fn test_missing_readings_are_skipped() {
        let probe = ScriptedProbe::new(vec![None, reading(40.0, 12.0), None, reading(60.0, 8.0)]);
        let mut sampler = ResourceSampler::new(Box::new(probe));
        for _ in 0..4 {
            sampler.sample();
        }

        assert_eq!(sampler.sample_count(), 2);
        assert!((sampler.average_cpu() - 50.0).abs() < 1e-9);
        assert_eq!(sampler.peak_memory(), 12.0);
    }

    #[test]
    fn test_background_loop_collects_and_stops() {
        let reads = Arc::new(AtomicUsize::new(0));
        let sampler = ResourceSampler::new(Box::new(CountingProbe { reads: reads.clone() }));

        let handle = SamplerHandle::spawn(sampler, Duration::from_millis(5)).unwrap();
        assert!(handle.is_running());
        thread::sleep(Duration::from_millis(60));

        let sampler = handle.stop().unwrap();
        assert!(sampler.sample_count() >= 2);
        assert_eq!(sampler.sample_count(), reads.load(Ordering::SeqCst));

        // joined: no further reads after stop
        let after_stop = reads.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(reads.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_immediate_stop_is_bounded_by_interval() {
        let sampler = ResourceSampler::new(Box::new(ScriptedProbe::new(vec![reading(1.0, 1.0)])));
        let handle = SamplerHandle::spawn(sampler, Duration::from_millis(20)).unwrap();

        let started = std::time::Instant::now();
        let sampler = handle.stop().unwrap();
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(sampler.sample_count() <= 1);
    }

    #[test]
    fn test_drop_joins_thread() {
        let reads = Arc::new(AtomicUsize::new(0));
        let sampler = ResourceSampler::new(Box::new(CountingProbe { reads: reads.clone() }));
        let handle = SamplerHandle::spawn(sampler, Duration::from_millis(5)).unwrap();
        thread::sleep(Duration::from_millis(20));
        drop(handle);

        let after_drop = reads.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(reads.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn test_panicking_probe_surfaces_error() {
        struct PanickingProbe;
        impl ResourceProbe for PanickingProbe {
            fn read(&mut self) -> Option<ResourceSample> {
                panic!("probe failure");
            }
        }

        let handle =
            SamplerHandle::spawn(ResourceSampler::new(Box::new(PanickingProbe)), Duration::from_millis(1))
                .unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(matches!(handle.stop(), Err(SamplerError::Panicked)));
    }

    #[test]
    fn test_deferred_selector_waits_for_pid() {
        let cell = Arc::new(OnceLock::new());
        let selector = ProcessSelector::Deferred(cell.clone());
        assert_eq!(selector.resolve(), None);

        cell.set(std::process::id()).unwrap();
        assert_eq!(selector.resolve(), Some(std::process::id()));
    }

    #[test]
    fn test_sysinfo_probe_reads_current_process() {
        let mut probe = SysinfoProbe::current_process();
        let sample = probe.read().expect("current process should be observable");
        assert!(sample.memory_mb > 0.0);
        assert!(sample.cpu_percent >= 0.0);
    }

    #[test]
    fn test_sysinfo_probe_unpublished_pid() {
        let mut probe = SysinfoProbe::new(ProcessSelector::Deferred(Arc::new(OnceLock::new())));
        assert!(probe.read().is_none());
    }

    #[test]
    fn test_samples_are_ordered() {
        let shared = Arc::new(Mutex::new(0.0));
        struct RisingProbe(Arc<Mutex<f64>>);
        impl ResourceProbe for RisingProbe {
            fn read(&mut self) -> Option<ResourceSample> {
                let mut level = self.0.lock().unwrap();
                *level += 1.0;
                Some(ResourceSample {
                    cpu_percent: *level,
                    memory_mb: *level,
                })
            }
        }

        let mut sampler = ResourceSampler::new(Box::new(RisingProbe(shared)));
        for _ in 0..4 {
            sampler.sample();
        }
        let cpus: Vec<f64> = sampler.samples().iter().map(|s| s.cpu_percent).collect();
        assert_eq!(cpus, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(sampler.peak_memory(), 4.0);
    }
}
