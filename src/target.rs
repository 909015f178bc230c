//! Executable targets
//!
//! A [`Target`] is the code whose run window is measured. It reports its
//! call/return events to the [`CallProbe`] it is handed and chooses which
//! process the resource sampler should observe.
//!
//! - [`FnTarget`]: in-process closure, instrumented by hand through the probe
//! - [`CommandTarget`]: child process streaming events over the
//!   [`trace_protocol`](crate::trace_protocol) on its stderr

use crate::call_tracer::CallProbe;
use crate::sampler::{ProcessSelector, ResourceProbe, SysinfoProbe};
use crate::trace_protocol::{self, TraceEvent, TRACE_ENV};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Errors raised by a target's own execution
#[derive(Error, Debug)]
pub enum TargetError {
    #[error("Target command is empty")]
    EmptyCommand,

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read trace stream from {program}: {source}")]
    TraceStream {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}", describe_exit(.code))]
    ExitStatus { program: String, code: Option<i32> },

    #[error("Target failed: {0}")]
    Failed(String),

    #[error("Target panicked: {0}")]
    Panicked(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "termination by signal".to_string(),
    }
}

/// Something that can be run under instrumentation
pub trait Target {
    /// Identifier persisted with each run; history is grouped by it
    fn identifier(&self) -> &str;

    /// Probe for the process whose resources should be sampled
    fn resource_probe(&self) -> Box<dyn ResourceProbe> {
        Box::new(SysinfoProbe::current_process())
    }

    /// Run to completion on the calling thread, reporting call events
    fn execute(&mut self, probe: &mut dyn CallProbe) -> Result<(), TargetError>;
}

/// In-process target wrapping a closure
///
/// # Example
/// ```
/// use hotscope::call_tracer::{traced, CallProbe, FunctionIdentity};
/// use hotscope::target::{FnTarget, Target};
/// use hotscope::call_tracer::CallTracer;
///
/// let mut target = FnTarget::new("checksum", |probe: &mut dyn CallProbe| {
///     traced(probe, FunctionIdentity::new(file!(), "checksum"), |_| {
///         (0..1000u64).sum::<u64>()
///     });
///     Ok(())
/// });
///
/// let mut tracer = CallTracer::with_defaults();
/// tracer.start();
/// target.execute(&mut tracer).unwrap();
/// assert_eq!(target.identifier(), "checksum");
/// ```
pub struct FnTarget<F> {
    identifier: String,
    body: F,
}

impl<F> FnTarget<F>
where
    F: FnMut(&mut dyn CallProbe) -> Result<(), TargetError>,
{
    pub fn new(identifier: impl Into<String>, body: F) -> Self {
        Self {
            identifier: identifier.into(),
            body,
        }
    }
}

impl<F> Target for FnTarget<F>
where
    F: FnMut(&mut dyn CallProbe) -> Result<(), TargetError>,
{
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn execute(&mut self, probe: &mut dyn CallProbe) -> Result<(), TargetError> {
        (self.body)(probe)
    }
}

/// Child process target
///
/// The child runs with `HOTSCOPE_TRACE=1` and stderr piped back. Trace lines
/// are turned into probe events as they arrive; every other stderr line is
/// forwarded to our own stderr. The child's pid is published once it is
/// spawned so the sampler can start observing it.
#[derive(Debug)]
pub struct CommandTarget {
    program: String,
    args: Vec<String>,
    identifier: String,
    pid: Arc<OnceLock<u32>>,
}

impl CommandTarget {
    /// Build from `[program, args...]`; the identifier defaults to the
    /// script or binary being run (see [`default_identifier`])
    pub fn new(command: &[String]) -> Result<Self, TargetError> {
        let (program, args) = command.split_first().ok_or(TargetError::EmptyCommand)?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            identifier: default_identifier(program, args),
            pid: Arc::new(OnceLock::new()),
        })
    }

    /// Override the identifier runs are recorded under
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Pid of the spawned child, once running
    pub fn pid(&self) -> Option<u32> {
        self.pid.get().copied()
    }

    fn pump_stderr(
        &self,
        stderr: impl std::io::Read,
        probe: &mut dyn CallProbe,
    ) -> std::io::Result<()> {
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(());
            }
            let line = String::from_utf8_lossy(&buf);

            match trace_protocol::parse_line(&line) {
                Some(Ok(TraceEvent::Call(identity))) => probe.on_enter(identity),
                Some(Ok(TraceEvent::Return)) => probe.on_exit(),
                Some(Ok(TraceEvent::StdlibPath(path))) => probe.on_stdlib_path(path),
                Some(Err(e)) => tracing::warn!("Skipping malformed trace line: {}", e),
                None => eprint!("{}", line),
            }
        }
    }

    fn check_status(&self, status: ExitStatus) -> Result<(), TargetError> {
        if status.success() {
            Ok(())
        } else {
            Err(TargetError::ExitStatus {
                program: self.program.clone(),
                code: status.code(),
            })
        }
    }
}

/// Identifier a command's runs are recorded under
///
/// A program given by path (`./bench`, `/usr/local/bin/job`) names itself.
/// A bare program is usually an interpreter, so the first non-flag argument
/// naming an existing file (`python job.py`) wins. Otherwise the program.
/// Arguments are never appended, so flag or output-path changes between
/// runs keep one history.
pub fn default_identifier(program: &str, args: &[String]) -> String {
    if program.chars().any(std::path::is_separator) {
        return program.to_string();
    }

    args.iter()
        .find(|arg| !arg.starts_with('-') && Path::new(arg.as_str()).is_file())
        .cloned()
        .unwrap_or_else(|| program.to_string())
}

impl Target for CommandTarget {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn resource_probe(&self) -> Box<dyn ResourceProbe> {
        Box::new(SysinfoProbe::new(ProcessSelector::Deferred(self.pid.clone())))
    }

    fn execute(&mut self, probe: &mut dyn CallProbe) -> Result<(), TargetError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(TRACE_ENV, "1")
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TargetError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let _ = self.pid.set(child.id());
        tracing::debug!(pid = child.id(), program = %self.program, "Spawned target process");

        if let Some(stderr) = child.stderr.take() {
            if let Err(source) = self.pump_stderr(stderr, probe) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(TargetError::TraceStream {
                    program: self.program.clone(),
                    source,
                });
            }
        }

        let status = child.wait().map_err(|source| TargetError::TraceStream {
            program: self.program.clone(),
            source,
        })?;
        self.check_status(status)
    }
}
