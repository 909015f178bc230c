//! Line protocol for call/return events reported by a child process
//!
//! A traced program writes one event per line to stderr:
//!
//! ```text
//! @hotscope<TAB>call<TAB><source unit><TAB><function name>
//! @hotscope<TAB>return
//! @hotscope<TAB>stdlib<TAB><path>
//! ```
//!
//! A `stdlib` line names a standard library location of the child's runtime
//! (for example its `sysconfig` stdlib directory); frames under it are
//! left out of the hotspot report.
//!
//! The child is told tracing is active through the `HOTSCOPE_TRACE`
//! environment variable. Lines without the prefix are ordinary stderr
//! output and are passed through untouched.

use crate::call_tracer::FunctionIdentity;
use thiserror::Error;

/// Marker opening every trace line
pub const TRACE_PREFIX: &str = "@hotscope";

/// Environment variable set to `1` for traced child processes
pub const TRACE_ENV: &str = "HOTSCOPE_TRACE";

/// A decoded trace event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Call(FunctionIdentity),
    Return,
    StdlibPath(String),
}

/// A line carried the trace prefix but could not be decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unknown trace event: {0}")]
    UnknownEvent(String),

    #[error("Trace event missing {0}")]
    MissingField(&'static str),
}

/// Decode one line
///
/// Returns `None` for lines that are not trace lines.
///
/// # Example
/// ```
/// use hotscope::trace_protocol::{parse_line, TraceEvent};
///
/// let event = parse_line("@hotscope\tcall\tjob.py\tload").unwrap().unwrap();
/// assert!(matches!(event, TraceEvent::Call(ref id) if id.name == "load"));
/// assert_eq!(parse_line("@hotscope\treturn"), Some(Ok(TraceEvent::Return)));
/// assert_eq!(parse_line("plain output"), None);
/// ```
pub fn parse_line(line: &str) -> Option<Result<TraceEvent, ProtocolError>> {
    let line = line.trim_end_matches(['\r', '\n']);
    let rest = line.strip_prefix(TRACE_PREFIX)?.strip_prefix('\t')?;

    let mut fields = rest.splitn(3, '\t');
    let event = match fields.next().unwrap_or_default() {
        "call" => {
            let unit = fields.next().ok_or(ProtocolError::MissingField("source unit"));
            let name = fields.next().ok_or(ProtocolError::MissingField("function name"));
            match (unit, name) {
                (Ok(unit), Ok(name)) if !name.is_empty() => {
                    Ok(TraceEvent::Call(FunctionIdentity::new(unit, name)))
                }
                (Ok(_), Ok(_)) => Err(ProtocolError::MissingField("function name")),
                (Err(e), _) | (_, Err(e)) => Err(e),
            }
        }
        "return" => Ok(TraceEvent::Return),
        "stdlib" => match fields.next() {
            Some(path) if !path.is_empty() => Ok(TraceEvent::StdlibPath(path.to_string())),
            _ => Err(ProtocolError::MissingField("path")),
        },
        other => Err(ProtocolError::UnknownEvent(other.to_string())),
    };

    Some(event)
}

/// Encode a call event
pub fn format_call(identity: &FunctionIdentity) -> String {
    format!(
        "{}\tcall\t{}\t{}",
        TRACE_PREFIX, identity.source_unit, identity.name
    )
}

/// Encode a return event
pub fn format_return() -> String {
    format!("{}\treturn", TRACE_PREFIX)
}

/// Encode a standard library announcement
pub fn format_stdlib(path: &str) -> String {
    format!("{}\tstdlib\t{}", TRACE_PREFIX, path)
}
