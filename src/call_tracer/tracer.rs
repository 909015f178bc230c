// Call/return event aggregation
//
// The tracer keeps an explicit stack of open frames. Each return pops the
// innermost frame and charges its elapsed interval to that frame's identity,
// so nested calls are counted once per frame and cumulative totals across
// functions can exceed wall-clock time.

use crate::call_tracer::filter::SourceFilter;
use crate::call_tracer::identity::{FunctionIdentity, HotspotEntry};
use crate::clock::Clock;
use fnv::FnvHashMap;
use std::sync::Arc;
use std::time::Duration;

/// Maximum cumulative-time difference (seconds) for which a module body
/// frame is considered a duplicate of the function below it; compared in
/// whole nanoseconds, so exactly this much apart keeps both
pub const COLLAPSE_EPSILON_SECS: f64 = 0.001;

/// Instrumentation boundary between an event source and the tracer
///
/// Anything able to observe entry/exit of callable units (manual
/// instrumentation, a child process trace stream, a bytecode hook) reports
/// through this trait.
pub trait CallProbe {
    /// A callable unit was entered
    fn on_enter(&mut self, identity: FunctionIdentity);
    /// The innermost open callable unit returned
    fn on_exit(&mut self);

    /// The event source named a standard library location of its runtime
    fn on_stdlib_path(&mut self, _path: String) {}
}

/// Run `f` inside an enter/exit pair for `identity`
///
/// # Example
/// ```
/// use hotscope::call_tracer::{traced, CallTracer, FunctionIdentity};
///
/// let mut tracer = CallTracer::with_defaults();
/// tracer.start();
/// let sum = traced(&mut tracer, FunctionIdentity::new("demo.rs", "sum"), |_| 1 + 2);
/// tracer.stop();
///
/// assert_eq!(sum, 3);
/// assert_eq!(tracer.top(10)[0].calls, 1);
/// ```
pub fn traced<R>(
    probe: &mut dyn CallProbe,
    identity: FunctionIdentity,
    f: impl FnOnce(&mut dyn CallProbe) -> R,
) -> R {
    probe.on_enter(identity);
    let result = f(&mut *probe);
    probe.on_exit();
    result
}

/// An open invocation
#[derive(Debug, Clone)]
struct CallFrame {
    identity: FunctionIdentity,
    entered: Duration,
}

/// Hotspot engine: per-function call counts and cumulative time
pub struct CallTracer {
    clock: Arc<dyn Clock>,
    filter: SourceFilter,
    active: bool,
    stack: Vec<CallFrame>,
    /// Aggregates in discovery order
    entries: Vec<HotspotEntry>,
    index: FnvHashMap<FunctionIdentity, usize>,
    discarded_returns: u64,
}

impl CallTracer {
    /// Create an idle tracer
    pub fn new(clock: Arc<dyn Clock>, filter: SourceFilter) -> Self {
        Self {
            clock,
            filter,
            active: false,
            stack: Vec::new(),
            entries: Vec::new(),
            index: FnvHashMap::default(),
            discarded_returns: 0,
        }
    }

    /// Tracer on a real monotonic clock with the default filter
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(crate::clock::MonotonicClock::new()),
            SourceFilter::default(),
        )
    }

    /// Begin accepting call/return events
    pub fn start(&mut self) {
        self.active = true;
    }

    /// Stop accepting events; frames still open are dropped uncounted
    pub fn stop(&mut self) {
        self.active = false;
        if !self.stack.is_empty() {
            tracing::debug!(
                open_frames = self.stack.len(),
                "Discarding unfinished frames at tracer stop"
            );
            self.stack.clear();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Number of currently open frames
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Return events that had no matching open frame
    pub fn discarded_returns(&self) -> u64 {
        self.discarded_returns
    }

    /// Unfiltered aggregate for one identity
    pub fn aggregate(&self, identity: &FunctionIdentity) -> Option<&HotspotEntry> {
        self.index.get(identity).map(|&i| &self.entries[i])
    }

    /// All unfiltered aggregates in discovery order
    pub fn entries(&self) -> &[HotspotEntry] {
        &self.entries
    }

    fn record(&mut self, frame: CallFrame, elapsed: Duration) {
        let slot = match self.index.get(&frame.identity) {
            Some(&i) => i,
            None => {
                self.entries.push(HotspotEntry::new(frame.identity.clone()));
                self.index.insert(frame.identity, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[slot];
        entry.calls += 1;
        entry.total_time += elapsed.as_secs_f64();
    }

    /// The `limit` hottest actionable functions, by cumulative time
    ///
    /// Filtering is applied here only. Ties keep discovery order. A module
    /// body frame that merely duplicates the single function below it (same
    /// call count, less than 1ms apart) is dropped.
    pub fn top(&self, limit: usize) -> Vec<HotspotEntry> {
        let mut ranked: Vec<HotspotEntry> = self
            .entries
            .iter()
            .filter(|entry| self.filter.accepts(&entry.identity))
            .cloned()
            .collect();

        // stable: equal times stay in discovery order
        ranked.sort_by(|a, b| b.total_time.total_cmp(&a.total_time));

        if is_redundant_module_frame(&ranked) {
            tracing::trace!(
                frame = %ranked[0].identity,
                "Collapsing module body frame into dominant function"
            );
            ranked.remove(0);
        }

        ranked.truncate(limit);
        ranked
    }
}

fn is_redundant_module_frame(ranked: &[HotspotEntry]) -> bool {
    match ranked {
        [first, second, ..] => {
            let gap = whole_nanos(first.total_time - second.total_time);
            first.identity.is_module_body()
                && first.calls == second.calls
                && gap < whole_nanos(COLLAPSE_EPSILON_SECS)
        }
        _ => false,
    }
}

/// Magnitude of a seconds value rounded to whole nanoseconds
///
/// Totals are sums of clock readings at nanosecond resolution; rounding
/// strips the binary error so a difference of exactly 1 ms is not seen as
/// 0.999999... ms.
fn whole_nanos(secs: f64) -> f64 {
    (secs.abs() * 1e9).round()
}

impl CallProbe for CallTracer {
    fn on_enter(&mut self, identity: FunctionIdentity) {
        if !self.active {
            return;
        }
        let entered = self.clock.now();
        self.stack.push(CallFrame { identity, entered });
    }

    fn on_exit(&mut self) {
        if !self.active {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            self.discarded_returns += 1;
            tracing::trace!("Ignoring return event with empty call stack");
            return;
        };
        let elapsed = self.clock.now().saturating_sub(frame.entered);
        self.record(frame, elapsed);
    }

    fn on_stdlib_path(&mut self, path: String) {
        tracing::debug!(path = %path, "Filtering announced standard library path");
        self.filter.add_stdlib_path(path);
    }
}
