// Cross-run regression detection
//
// Compares the two most recent persisted runs of a target and flags
// execution time, peak memory, or top hotspot cost that grew beyond a
// relative threshold. Fewer than two runs is reported as a status of its
// own, not an error.

mod analyzer;
mod config;
mod verdict;

pub use analyzer::{compare_runs, RegressionAnalyzer};
pub use config::{RegressionConfig, DEFAULT_THRESHOLD};
pub use verdict::{
    FindingLevel, Metric, RegressionFinding, RegressionReport, RegressionStatus,
    INSUFFICIENT_MESSAGE, OK_MESSAGE,
};
