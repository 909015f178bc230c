use anyhow::{Context, Result};
use clap::Parser;
use hotscope::cli::{Cli, Commands, CompareArgs, HistoryArgs, OutputFormat, RunArgs};
use hotscope::config::HotscopeConfig;
use hotscope::html_output::HtmlReport;
use hotscope::orchestrator::RunOrchestrator;
use hotscope::regression::RegressionAnalyzer;
use hotscope::report::ReportStore;
use hotscope::suggestions::SuggestionEngine;
use hotscope::target::CommandTarget;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Profile a command, persist the run and print the report
fn run_command(mut config: HotscopeConfig, args: RunArgs) -> Result<()> {
    if let Some(top) = args.top {
        config.top_n = top;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.sample_interval_ms = interval_ms;
    }
    if let Some(threshold) = args.threshold {
        config.regression.threshold = threshold;
    }
    if let Some(dir) = args.reports_dir {
        config.reports_dir = dir;
    }
    if args.no_html {
        config.html = false;
    }
    config.validate()?;

    let mut target = CommandTarget::new(&args.command)?;
    if let Some(name) = args.target_name {
        target = target.with_identifier(name);
    }

    let orchestrator = RunOrchestrator::new()
        .with_filter(config.filter.build()?)
        .with_top_n(config.top_n)
        .with_sample_interval(config.sample_interval());

    let result = orchestrator
        .run(&mut target)
        .with_context(|| format!("Failed to profile {}", args.command.join(" ")))?;

    let suggestions = SuggestionEngine::default().generate(&result);
    let result = result.with_suggestions(suggestions);

    let store = ReportStore::new(&config.reports_dir);
    let path = store.save(&result)?;

    let regression = RegressionAnalyzer::new(store.clone())
        .compare_latest(&result.target, config.regression.threshold)?;
    let result = result.with_regression(regression);
    store.write_at(&path, &result)?;

    match args.format {
        OutputFormat::Text => {
            print!("{}", result.to_report_string());
            println!("\nReport saved to {}", path.display());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    if config.html {
        HtmlReport::write_to(&result, &path.with_extension("html"))?;
    }

    Ok(())
}

/// Compare the two most recent runs of a target
fn compare_command(config: HotscopeConfig, args: CompareArgs) -> Result<()> {
    let threshold = args.threshold.unwrap_or(config.regression.threshold);
    let dir = args.reports_dir.unwrap_or(config.reports_dir);

    let report = RegressionAnalyzer::new(ReportStore::new(dir)).compare_latest(&args.target, threshold)?;
    print!("{}", report.to_report_string());

    if args.fail_on_regression && report.is_regression() {
        anyhow::bail!(
            "Performance regression detected for {} ({} findings)",
            args.target,
            report.findings.len()
        );
    }
    Ok(())
}

/// List the recorded runs of a target, oldest first
fn history_command(config: HotscopeConfig, args: HistoryArgs) -> Result<()> {
    let dir = args.reports_dir.unwrap_or(config.reports_dir);
    let history = RegressionAnalyzer::new(ReportStore::new(dir)).load_history(&args.target)?;

    if history.is_empty() {
        println!("No runs recorded for {}", args.target);
        return Ok(());
    }

    println!("{:<32} {:>12} {:>10} {:>12}  top hotspot", "timestamp", "time (s)", "cpu %", "memory (MB)");
    for run in &history {
        let top = run
            .top_hotspot()
            .map(|h| h.identity.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<32} {:>12.4} {:>10.2} {:>12.2}  {}",
            run.timestamp.to_rfc3339(),
            run.execution_time,
            run.avg_cpu_percent,
            run.peak_memory_mb,
            top
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = HotscopeConfig::load(args.config.as_deref())?;

    match args.command {
        Commands::Run(run) => run_command(config, run),
        Commands::Compare(compare) => compare_command(config, compare),
        Commands::History(history) => history_command(config, history),
    }
}
