// Configuration for cross-run regression detection

use serde::{Deserialize, Serialize};

/// Default relative increase tolerated before a metric is flagged (0.1%)
pub const DEFAULT_THRESHOLD: f64 = 0.001;

/// Configuration for regression comparison
///
/// # Example
/// ```
/// use hotscope::regression::RegressionConfig;
///
/// let config = RegressionConfig::default();
/// assert_eq!(config.threshold, 0.001);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    /// Relative increase a metric may show before it is reported
    ///
    /// A metric regresses when `latest > previous * (1 + threshold)`.
    /// Sitting exactly on the boundary is not a regression.
    pub threshold: f64,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl RegressionConfig {
    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(format!(
                "regression threshold must be a non-negative number, got {}",
                self.threshold
            ));
        }
        Ok(())
    }
}
