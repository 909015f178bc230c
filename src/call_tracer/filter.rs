// Read-time noise filtering for hotspot reports
//
// Aggregation records every identity it sees; only `top()` consults this
// filter. Rejected identities are:
// - not backed by a real user source file (empty, synthetic `<...>` units,
//   no file extension, or an extension outside the configured set)
// - part of the profiler's own sources
// - located under a standard runtime library installation path
// - matched by a user exclusion regex on `unit:name`

use crate::call_tracer::identity::FunctionIdentity;
use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;

/// Default install prefix of the Rust standard library in debug info
///
/// Other runtimes differ per install; a traced child announces its own
/// locations with a `stdlib` trace line, and config can list more.
pub const RUST_STDLIB_PREFIX: &str = "/rustc/";

/// Source directory of this crate; frames from here are profiler internals
///
/// Absolute. Identities built from `file!()` carry paths relative to the
/// workspace (`src/...`) and are not matched; register such a prefix with
/// [`SourceFilter::with_internal_prefix`].
pub const ENGINE_SOURCE_PREFIX: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/");

/// Why an identity was left out of the hotspot report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Synthetic or non-file-backed code (e.g. `<string>`, `<frozen ...>`)
    NotFileBacked,
    /// The interception engine's own code
    Internal,
    /// Code under a standard library path
    StandardLibrary,
    /// Matched a user exclusion pattern
    Excluded,
}

/// Filter deciding which identities are actionable user code
#[derive(Debug, Clone)]
pub struct SourceFilter {
    stdlib_paths: Vec<String>,
    internal_prefixes: Vec<String>,
    source_extensions: Vec<String>,
    exclude_patterns: Vec<Regex>,
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self {
            stdlib_paths: vec![RUST_STDLIB_PREFIX.to_string()],
            internal_prefixes: vec![ENGINE_SOURCE_PREFIX.to_string()],
            source_extensions: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl SourceFilter {
    /// Filter with the default standard library and engine prefixes
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a standard library installation path
    pub fn with_stdlib_path(mut self, path: impl Into<String>) -> Self {
        self.stdlib_paths.push(path.into());
        self
    }

    /// Add a standard library path in place, ignoring repeats
    pub fn add_stdlib_path(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !path.is_empty() && !self.stdlib_paths.contains(&path) {
            self.stdlib_paths.push(path);
        }
    }

    /// Add a path prefix whose code belongs to the interception engine
    pub fn with_internal_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.internal_prefixes.push(prefix.into());
        self
    }

    /// Restrict file-backed units to these extensions (with or without dot)
    pub fn with_source_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.source_extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }

    /// Exclude identities whose `unit:name` matches the regex
    pub fn with_exclude_pattern(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .with_context(|| format!("Invalid exclude pattern: {}", pattern))?;
        self.exclude_patterns.push(regex);
        Ok(self)
    }

    /// Whether a source unit names a real user source file
    pub fn is_file_backed(&self, source_unit: &str) -> bool {
        if source_unit.is_empty() || source_unit.starts_with('<') {
            return false;
        }

        let Some(ext) = Path::new(source_unit).extension().and_then(|e| e.to_str()) else {
            return false;
        };

        self.source_extensions.is_empty() || self.source_extensions.iter().any(|e| e == ext)
    }

    /// Classify an identity; `None` means it is kept
    pub fn classify(&self, identity: &FunctionIdentity) -> Option<Rejection> {
        let unit = identity.source_unit.as_str();

        if !self.is_file_backed(unit) {
            return Some(Rejection::NotFileBacked);
        }
        if self.internal_prefixes.iter().any(|p| is_under(unit, p)) {
            return Some(Rejection::Internal);
        }
        if self.stdlib_paths.iter().any(|p| is_under(unit, p)) {
            return Some(Rejection::StandardLibrary);
        }
        if !self.exclude_patterns.is_empty() {
            let display = identity.to_string();
            if self.exclude_patterns.iter().any(|re| re.is_match(&display)) {
                return Some(Rejection::Excluded);
            }
        }

        None
    }

    /// Whether an identity should appear in hotspot reports
    pub fn accepts(&self, identity: &FunctionIdentity) -> bool {
        self.classify(identity).is_none()
    }
}

/// Path-component-aware prefix check
fn is_under(unit: &str, prefix: &str) -> bool {
    !prefix.is_empty() && Path::new(unit).starts_with(Path::new(prefix))
}
