//! Run records and their on-disk history
//!
//! Each profiled run becomes one [`RunResult`], persisted as a pretty JSON
//! file whose name is derived from the run's start timestamp so that a
//! directory listing sorts chronologically.

use crate::call_tracer::HotspotEntry;
use crate::regression::{RegressionReport, RegressionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Filename prefix of persisted run records
pub const REPORT_PREFIX: &str = "hotscope_report_";

/// Errors that can occur while persisting or loading run records
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid run record {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for report operations
pub type Result<T> = std::result::Result<T, ReportError>;

/// Complete measurement of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Identifier of the profiled target
    pub target: String,
    /// UTC start of the run window
    pub timestamp: DateTime<Utc>,
    /// Wall-clock duration in seconds
    pub execution_time: f64,
    pub avg_cpu_percent: f64,
    pub peak_memory_mb: f64,
    /// Top hotspots, hottest first
    #[serde(default)]
    pub hotspots: Vec<HotspotEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regression: Option<RegressionReport>,
}

impl RunResult {
    /// Copy of this record carrying optimisation suggestions
    pub fn with_suggestions(self, suggestions: Vec<String>) -> Self {
        Self {
            suggestions: Some(suggestions),
            ..self
        }
    }

    /// Copy of this record carrying a regression comparison
    pub fn with_regression(self, regression: RegressionReport) -> Self {
        Self {
            regression: Some(regression),
            ..self
        }
    }

    /// Hottest function, if any was recorded
    pub fn top_hotspot(&self) -> Option<&HotspotEntry> {
        self.hotspots.first()
    }

    /// Generate the human-readable CLI report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        report.push_str("\nHotscope Performance Report\n");
        report.push_str(&format!("{}\n", "─".repeat(40)));
        report.push_str(&format!("Target         : {}\n", self.target));
        report.push_str(&format!("Execution Time : {:.4} seconds\n", self.execution_time));
        report.push_str(&format!("Average CPU    : {:.2} %\n", self.avg_cpu_percent));
        report.push_str(&format!("Peak Memory    : {:.2} MB\n", self.peak_memory_mb));

        report.push_str("\nTop Hotspots\n");
        report.push_str(&format!("{}\n", "─".repeat(40)));
        if self.hotspots.is_empty() {
            report.push_str("No function profiling data collected.\n");
        }
        for hotspot in &self.hotspots {
            report.push_str(&format!("{}\n", hotspot.identity));
            report.push_str(&format!("  Calls      : {}\n", hotspot.calls));
            report.push_str(&format!("  Total Time : {:.4} seconds\n\n", hotspot.total_time));
        }

        if let Some(suggestions) = &self.suggestions {
            report.push_str("\nOptimization Suggestions\n");
            report.push_str(&format!("{}\n", "─".repeat(40)));
            for suggestion in suggestions {
                report.push_str(&format!("- {}\n", suggestion.replace('\n', "\n  ")));
            }
        }

        if let Some(regression) = &self.regression {
            report.push_str("\nRegression Check\n");
            report.push_str(&format!("{}\n", "─".repeat(40)));
            report.push_str(&regression.to_report_string());
        }

        report
    }

    /// Whether the attached comparison flagged a regression
    pub fn has_regression(&self) -> bool {
        self.regression
            .as_ref()
            .is_some_and(|r| r.status == RegressionStatus::Regression)
    }
}

/// Timestamp-derived filename; lexicographic order is chronological
pub fn report_filename(timestamp: &DateTime<Utc>) -> String {
    format!(
        "{}{}.json",
        REPORT_PREFIX,
        timestamp.format("%Y-%m-%dT%H-%M-%S%.6fZ")
    )
}

/// Directory of persisted run records
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a new record, returning its path
    pub fn save(&self, result: &RunResult) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|source| ReportError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.dir.join(report_filename(&result.timestamp));
        self.write_at(&path, result)?;
        tracing::info!(path = %path.display(), "Saved run record");
        Ok(path)
    }

    /// Write (or overwrite) a record at an explicit path
    pub fn write_at(&self, path: &Path, result: &RunResult) -> Result<()> {
        let json = serde_json::to_string_pretty(result).map_err(|source| ReportError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a single record
    pub fn load(&self, path: &Path) -> Result<RunResult> {
        let content = fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ReportError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Record files sorted by name; a missing directory is an empty history
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ReportError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_tracer::FunctionIdentity;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_result() -> RunResult {
        let mut hotspot = HotspotEntry::new(FunctionIdentity::new("job.py", "crunch"));
        hotspot.calls = 3;
        hotspot.total_time = 0.75;

        RunResult {
            target: "job.py".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
            execution_time: 1.25,
            avg_cpu_percent: 42.5,
            peak_memory_mb: 96.0,
            hotspots: vec![hotspot],
            suggestions: None,
            regression: None,
        }
    }

    #[test]
    fn test_report_filename_sorts_chronologically() {
        let early = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 6).unwrap();
        let a = report_filename(&early);
        let b = report_filename(&late);

        assert_eq!(a, "hotscope_report_2026-01-02T03-04-05.000000Z.json");
        assert!(a < b);
        assert!(!a.contains(':'));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = ReportStore::new(dir.path().join("nested"));
        let result = sample_result();

        let path = store.save(&result).unwrap();
        assert!(path.exists());
        assert_eq!(store.load(&path).unwrap(), result);
        assert_eq!(store.list().unwrap(), vec![path]);
    }

    #[test]
    fn test_optional_fields_omitted_when_absent() {
        let json = serde_json::to_value(sample_result()).unwrap();
        assert!(json.get("suggestions").is_none());
        assert!(json.get("regression").is_none());
        assert_eq!(json["hotspots"][0]["name"], "crunch");
    }

    #[test]
    fn test_with_suggestions_and_regression() {
        let result = sample_result()
            .with_suggestions(vec!["Cache it".to_string()])
            .with_regression(RegressionReport::insufficient());

        assert_eq!(result.suggestions.as_deref(), Some(&["Cache it".to_string()][..]));
        assert!(!result.has_regression());
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ReportStore::new(dir.path().join("absent"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_ignores_non_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();

        let names: Vec<_> = ReportStore::new(dir.path())
            .list()
            .unwrap()
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ReportStore::new(dir.path()).load(&path).unwrap_err();
        assert!(matches!(err, ReportError::Json { .. }));
    }

    #[test]
    fn test_report_string_contents() {
        let text = sample_result()
            .with_suggestions(vec!["First line\nSecond line".to_string()])
            .to_report_string();

        assert!(text.contains("Execution Time : 1.2500 seconds"));
        assert!(text.contains("Average CPU    : 42.50 %"));
        assert!(text.contains("Peak Memory    : 96.00 MB"));
        assert!(text.contains("job.py:crunch"));
        assert!(text.contains("  Calls      : 3"));
        assert!(text.contains("- First line\n  Second line"));
    }

    #[test]
    fn test_report_string_without_hotspots() {
        let mut result = sample_result();
        result.hotspots.clear();
        assert!(result
            .to_report_string()
            .contains("No function profiling data collected."));
    }
}
