//! Profiler configuration file
//!
//! Settings are read from `hotscope.toml`. Every key is optional; anything
//! left out falls back to the built-in default, and command-line flags
//! override whatever the file says.
//!
//! # Example hotscope.toml
//!
//! ```toml
//! reports_dir = "perf/reports"
//! top_n = 15
//! sample_interval_ms = 50
//! html = false
//!
//! [regression]
//! threshold = 0.05
//!
//! [filter]
//! stdlib_paths = ["/usr/lib/python3"]
//! internal_prefixes = ["/opt/vendor/"]
//! source_extensions = ["rs", "py"]
//! exclude_patterns = [":test_"]
//! ```

use crate::call_tracer::SourceFilter;
use crate::orchestrator::DEFAULT_TOP_N;
use crate::regression::RegressionConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "hotscope.toml";

/// Invalid configuration values
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("top_n must be at least 1")]
    ZeroTopN,

    #[error("sample_interval_ms must be at least 1")]
    ZeroSampleInterval,

    #[error("{0}")]
    Regression(String),
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotscopeConfig {
    /// Directory run records are written to and read back from
    pub reports_dir: PathBuf,
    /// Hotspots kept per run
    pub top_n: usize,
    /// Resource sampling period in milliseconds
    pub sample_interval_ms: u64,
    /// Write an HTML report next to every JSON record
    pub html: bool,
    pub regression: RegressionConfig,
    pub filter: FilterConfig,
}

impl Default for HotscopeConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("reports"),
            top_n: DEFAULT_TOP_N,
            sample_interval_ms: 100,
            html: true,
            regression: RegressionConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl HotscopeConfig {
    /// Load from `path`, or from `hotscope.toml` in the working directory
    /// when it exists, or fall back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let implicit = Path::new(DEFAULT_CONFIG_FILE);
                if implicit.is_file() {
                    Self::from_file(implicit)
                } else {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate TOML content
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.top_n == 0 {
            return Err(ConfigError::ZeroTopN);
        }
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::ZeroSampleInterval);
        }
        self.regression.validate().map_err(ConfigError::Regression)
    }
}

/// Source filter settings, applied on top of the built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub stdlib_paths: Vec<String>,
    pub internal_prefixes: Vec<String>,
    /// Only units with these extensions are reported; empty allows any
    pub source_extensions: Vec<String>,
    /// Regexes over `unit:name` to leave out of reports
    pub exclude_patterns: Vec<String>,
}

impl FilterConfig {
    pub fn build(&self) -> Result<SourceFilter> {
        let mut filter = SourceFilter::default();
        for path in &self.stdlib_paths {
            filter = filter.with_stdlib_path(path.clone());
        }
        for prefix in &self.internal_prefixes {
            filter = filter.with_internal_prefix(prefix.clone());
        }
        if !self.source_extensions.is_empty() {
            filter = filter.with_source_extensions(self.source_extensions.iter().cloned());
        }
        for pattern in &self.exclude_patterns {
            filter = filter.with_exclude_pattern(pattern)?;
        }
        Ok(filter)
    }
}
