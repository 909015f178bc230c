//! CLI argument parsing for Hotscope

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for the run report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON run record for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "hotscope")]
#[command(version)]
#[command(about = "Hotspot profiler with resource sampling and cross-run regression checks", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./hotscope.toml when present)
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Profile a command and record the run
    Run(RunArgs),
    /// Compare the two most recent runs of a target
    Compare(CompareArgs),
    /// List recorded runs of a target
    History(HistoryArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Identifier stored with the run (defaults to the command line)
    #[arg(long = "target-name", value_name = "NAME")]
    pub target_name: Option<String>,

    /// Number of hotspots to keep
    #[arg(long = "top", value_name = "N")]
    pub top: Option<usize>,

    /// Resource sampling interval in milliseconds
    #[arg(long = "interval-ms", value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Relative increase flagged as a regression (0.05 = 5%)
    #[arg(long = "threshold", value_name = "RATIO")]
    pub threshold: Option<f64>,

    /// Directory for run records
    #[arg(long = "reports-dir", value_name = "DIR")]
    pub reports_dir: Option<PathBuf>,

    /// Skip the HTML report
    #[arg(long = "no-html")]
    pub no_html: bool,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Command to profile (e.g., hotscope run -- ./build.sh --release)
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Target identifier whose history is compared
    pub target: String,

    /// Relative increase flagged as a regression (0.05 = 5%)
    #[arg(long = "threshold", value_name = "RATIO")]
    pub threshold: Option<f64>,

    /// Directory for run records
    #[arg(long = "reports-dir", value_name = "DIR")]
    pub reports_dir: Option<PathBuf>,

    /// Exit with failure when a regression is detected
    #[arg(long = "fail-on-regression")]
    pub fail_on_regression: bool,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Target identifier whose history is listed
    pub target: String,

    /// Directory for run records
    #[arg(long = "reports-dir", value_name = "DIR")]
    pub reports_dir: Option<PathBuf>,
}
