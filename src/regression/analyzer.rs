// Cross-run regression analysis
//
// Loads the persisted history of a target and compares the two most recent
// runs on three metrics, in fixed order:
// 1. execution time
// 2. peak memory
// 3. cumulative time of the top hotspot (only when both runs have one)
//
// A metric regresses when `latest > previous * (1 + threshold)`; a zero
// baseline is skipped since no relative change can be computed from it.

use crate::regression::verdict::{Metric, RegressionFinding, RegressionReport};
use crate::report::{ReportStore, RunResult};
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::Path;

/// Regression analyzer over a [`ReportStore`]
#[derive(Debug, Clone)]
pub struct RegressionAnalyzer {
    store: ReportStore,
}

impl RegressionAnalyzer {
    pub fn new(store: ReportStore) -> Self {
        Self { store }
    }

    /// Every run of `target` on record, oldest first
    ///
    /// Path-like targets match on their final path component, so `./job.py`
    /// and `/srv/app/job.py` share a history. Identifiers containing
    /// whitespace are free-form labels or command lines and only match
    /// exactly. Unreadable records are skipped.
    pub fn load_history(&self, target: &str) -> Result<Vec<RunResult>> {
        let files = self
            .store
            .list()
            .with_context(|| format!("Failed to list {}", self.store.dir().display()))?;

        let mut history: Vec<RunResult> = files
            .iter()
            .filter_map(|path| match self.store.load(path) {
                Ok(result) => Some(result),
                Err(e) => {
                    tracing::warn!("Skipping unreadable run record: {}", e);
                    None
                }
            })
            .filter(|result| same_target(&result.target, target))
            .collect();

        // files are listed by name; stable sort keeps that order for equal timestamps
        history.sort_by_key(|result| result.timestamp);

        tracing::debug!(target_name = target, runs = history.len(), "Loaded run history");
        Ok(history)
    }

    /// Compare the two most recent runs of `target`
    pub fn compare_latest(&self, target: &str, threshold: f64) -> Result<RegressionReport> {
        let history = self.load_history(target)?;

        match history.as_slice() {
            [.., previous, latest] => Ok(compare_runs(previous, latest, threshold)),
            _ => Ok(RegressionReport::insufficient()),
        }
    }
}

fn same_target(recorded: &str, requested: &str) -> bool {
    if recorded.contains(char::is_whitespace) || requested.contains(char::is_whitespace) {
        return recorded == requested;
    }
    let base = |s: &str| -> String {
        Path::new(s)
            .file_name()
            .unwrap_or_else(|| OsStr::new(s))
            .to_string_lossy()
            .into_owned()
    };
    base(recorded) == base(requested)
}

/// Compare two runs; every metric is evaluated independently
pub fn compare_runs(previous: &RunResult, latest: &RunResult, threshold: f64) -> RegressionReport {
    let mut warnings = Vec::new();

    if let Some((delta, pct)) = increase(previous.execution_time, latest.execution_time, threshold) {
        warnings.push(RegressionFinding::warning(
            Metric::ExecutionTime,
            format!(
                "Execution time increased from {:.4}s → {:.4}s (+{:.4}%)",
                previous.execution_time, latest.execution_time, pct
            ),
            delta,
            pct,
        ));
    }

    if let Some((delta, pct)) = increase(previous.peak_memory_mb, latest.peak_memory_mb, threshold) {
        warnings.push(RegressionFinding::warning(
            Metric::PeakMemory,
            format!(
                "Peak memory increased from {:.4}MB → {:.4}MB (+{:.4}%)",
                previous.peak_memory_mb, latest.peak_memory_mb, pct
            ),
            delta,
            pct,
        ));
    }

    if let (Some(prev_top), Some(latest_top)) = (previous.top_hotspot(), latest.top_hotspot()) {
        if let Some((delta, pct)) = increase(prev_top.total_time, latest_top.total_time, threshold) {
            warnings.push(RegressionFinding::warning(
                Metric::TopHotspot,
                format!(
                    "Top hotspot '{}' increased from {:.4}s → {:.4}s (+{:.4}%)",
                    latest_top.identity, prev_top.total_time, latest_top.total_time, pct
                ),
                delta,
                pct,
            ));
        }
    }

    RegressionReport::from_warnings(warnings)
}

/// `(delta, percent)` when `latest` exceeds `previous` beyond the threshold
fn increase(previous: f64, latest: f64, threshold: f64) -> Option<(f64, f64)> {
    if previous == 0.0 {
        return None;
    }
    if latest > previous * (1.0 + threshold) {
        let delta = latest - previous;
        Some((delta, delta / previous * 100.0))
    } else {
        None
    }
}
