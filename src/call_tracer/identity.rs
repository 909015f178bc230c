// Function identity and per-function aggregate entries

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name given to the synthetic frame representing a whole source unit's
/// top-level execution
pub const MODULE_BODY: &str = "<module>";

/// Key for a callable unit: (source unit, function name)
///
/// Two functions with the same name in the same source unit share an
/// identity; that collision is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionIdentity {
    /// Path of the source unit the function was defined in
    pub source_unit: String,
    /// Function name
    pub name: String,
}

impl FunctionIdentity {
    pub fn new(source_unit: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source_unit: source_unit.into(),
            name: name.into(),
        }
    }

    /// The top-level execution frame of a source unit
    pub fn module_body(source_unit: impl Into<String>) -> Self {
        Self::new(source_unit, MODULE_BODY)
    }

    pub fn is_module_body(&self) -> bool {
        self.name == MODULE_BODY
    }
}

impl fmt::Display for FunctionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source_unit, self.name)
    }
}

/// Aggregated call statistics for one function identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotEntry {
    #[serde(flatten)]
    pub identity: FunctionIdentity,
    /// Number of completed calls
    pub calls: u64,
    /// Cumulative time across completed calls (seconds)
    pub total_time: f64,
}

impl HotspotEntry {
    pub fn new(identity: FunctionIdentity) -> Self {
        Self {
            identity,
            calls: 0,
            total_time: 0.0,
        }
    }

    /// Average time per call (0.0 when never completed)
    pub fn average_time(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.total_time / self.calls as f64
        }
    }
}
