// Regression report: overall status plus per-metric findings
//
// Presentation layers must handle all three statuses, and for `Regression`
// iterate every finding.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const INSUFFICIENT_MESSAGE: &str = "Not enough runs to compare.";
pub const OK_MESSAGE: &str = "No significant performance regressions detected.";

/// Overall outcome of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegressionStatus {
    /// Fewer than two runs on record
    Insufficient,
    /// No metric crossed its threshold
    Ok,
    /// At least one metric regressed
    Regression,
}

impl fmt::Display for RegressionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Insufficient => "insufficient",
            Self::Ok => "ok",
            Self::Regression => "regression",
        };
        f.write_str(label)
    }
}

/// Severity of a single finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingLevel {
    Ok,
    InsufficientHistory,
    Warning,
}

/// Metric a finding refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    ExecutionTime,
    PeakMemory,
    TopHotspot,
}

/// One message of a regression report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionFinding {
    pub level: FindingLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
    pub message: String,
    /// Absolute increase (latest - previous)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
    /// Relative increase in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
}

impl RegressionFinding {
    /// Informational finding without numbers
    pub fn info(level: FindingLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            metric: None,
            message: message.into(),
            delta: None,
            percent: None,
        }
    }

    /// Warning for a metric that crossed its threshold
    pub fn warning(metric: Metric, message: String, delta: f64, percent: f64) -> Self {
        Self {
            level: FindingLevel::Warning,
            metric: Some(metric),
            message,
            delta: Some(delta),
            percent: Some(percent),
        }
    }
}

/// Result of comparing the two most recent runs of a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    pub status: RegressionStatus,
    pub findings: Vec<RegressionFinding>,
}

impl RegressionReport {
    /// Not enough history to compare
    pub fn insufficient() -> Self {
        Self {
            status: RegressionStatus::Insufficient,
            findings: vec![RegressionFinding::info(
                FindingLevel::InsufficientHistory,
                INSUFFICIENT_MESSAGE,
            )],
        }
    }

    /// Comparison ran and nothing regressed
    pub fn ok() -> Self {
        Self {
            status: RegressionStatus::Ok,
            findings: vec![RegressionFinding::info(FindingLevel::Ok, OK_MESSAGE)],
        }
    }

    /// Build from the warnings produced by a comparison
    pub fn from_warnings(warnings: Vec<RegressionFinding>) -> Self {
        if warnings.is_empty() {
            Self::ok()
        } else {
            Self {
                status: RegressionStatus::Regression,
                findings: warnings,
            }
        }
    }

    pub fn is_regression(&self) -> bool {
        self.status == RegressionStatus::Regression
    }

    /// Findings about one metric
    pub fn finding_for(&self, metric: Metric) -> Option<&RegressionFinding> {
        self.findings.iter().find(|f| f.metric == Some(metric))
    }

    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        match self.status {
            RegressionStatus::Insufficient => report.push_str("⚠️  INSUFFICIENT HISTORY\n"),
            RegressionStatus::Ok => report.push_str("✅ NO REGRESSION DETECTED\n"),
            RegressionStatus::Regression => report.push_str(&format!(
                "❌ REGRESSION DETECTED ({} metrics)\n",
                self.findings.len()
            )),
        }

        for finding in &self.findings {
            report.push_str(&format!("  - {}\n", finding.message));
        }

        report
    }
}
