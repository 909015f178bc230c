// Call Tracer (hotspot engine)
//
// Reconstructs per-function call counts and cumulative time from a stream of
// enter/exit events delivered through the `CallProbe` boundary. The tracer is
// independent of how events are sourced: in-process closures, a child
// process's trace stream, or any other instrumentation hook.

mod filter;
mod identity;
mod tracer;

pub use filter::{Rejection, SourceFilter, ENGINE_SOURCE_PREFIX, RUST_STDLIB_PREFIX};
pub use identity::{FunctionIdentity, HotspotEntry, MODULE_BODY};
pub use tracer::{traced, CallProbe, CallTracer, COLLAPSE_EPSILON_SECS};
