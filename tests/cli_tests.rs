// Integration tests for the hotscope binary
//
// Every test runs inside its own temporary directory so that no
// hotscope.toml or reports/ from the workspace leaks in.

use chrono::{Duration, TimeZone, Utc};
use hotscope::call_tracer::{FunctionIdentity, HotspotEntry};
use hotscope::report::{ReportStore, RunResult};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Shell script emitting one traced `load` call and one passthrough line
const TRACED_SCRIPT: &str = r#"printf '@hotscope\tcall\tjob.py\tload\n' >&2
printf 'child diagnostics\n' >&2
printf '@hotscope\treturn\n' >&2"#;

fn hotscope(dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("hotscope");
    cmd.current_dir(dir);
    cmd
}

fn run_traced(dir: &Path) -> assert_cmd::assert::Assert {
    hotscope(dir)
        .args(["run", "--target-name", "job.py", "--interval-ms", "5", "--"])
        .args(["sh", "-c", TRACED_SCRIPT])
        .assert()
}

fn json_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "json"))
        .collect();
    files.sort();
    files
}

fn recorded(minute: i64, execution_time: f64) -> RunResult {
    let mut top = HotspotEntry::new(FunctionIdentity::new("job.py", "load"));
    top.calls = 1;
    top.total_time = execution_time / 2.0;

    RunResult {
        target: "job.py".to_string(),
        timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minute),
        execution_time,
        avg_cpu_percent: 12.0,
        peak_memory_mb: 40.0,
        hotspots: vec![top],
        suggestions: None,
        regression: None,
    }
}

#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    hotscope(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("compare"));
}

#[test]
fn test_run_requires_command() {
    let dir = TempDir::new().unwrap();
    hotscope(dir.path()).arg("run").assert().failure();
}

#[test]
fn test_first_run_reports_insufficient_history() {
    let dir = TempDir::new().unwrap();

    run_traced(dir.path())
        .success()
        .stdout(predicate::str::contains("Hotscope Performance Report"))
        .stdout(predicate::str::contains("job.py:load"))
        .stdout(predicate::str::contains("Not enough runs to compare."))
        .stderr(predicate::str::contains("child diagnostics"));

    let reports = dir.path().join("reports");
    let files = json_files(&reports);
    assert_eq!(files.len(), 1);
    assert!(files[0].with_extension("html").exists());

    let record: RunResult = serde_json::from_str(&fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(record.target, "job.py");
    assert_eq!(record.hotspots[0].calls, 1);
    assert!(record.suggestions.is_some());
    assert!(record.regression.is_some());
}

#[test]
fn test_second_run_is_compared() {
    let dir = TempDir::new().unwrap();

    run_traced(dir.path()).success();
    run_traced(dir.path())
        .success()
        .stdout(predicate::str::contains("Not enough runs to compare.").not());

    assert_eq!(json_files(&dir.path().join("reports")).len(), 2);

    hotscope(dir.path())
        .args(["compare", "job.py"])
        .assert()
        .success()
        .stdout(predicate::str::contains("INSUFFICIENT").not());

    hotscope(dir.path())
        .args(["history", "job.py"])
        .assert()
        .success()
        .stdout(predicate::str::contains("job.py:load").count(2));
}

#[test]
fn test_run_json_format_and_custom_reports_dir() {
    let dir = TempDir::new().unwrap();
    let reports = dir.path().join("out");

    let output = hotscope(dir.path())
        .args(["run", "--format", "json", "--no-html", "--target-name", "job.py"])
        .arg("--reports-dir")
        .arg(&reports)
        .args(["--", "sh", "-c", TRACED_SCRIPT])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["target"], "job.py");
    assert_eq!(json["hotspots"][0]["source_unit"], "job.py");
    assert_eq!(json["hotspots"][0]["name"], "load");
    assert_eq!(json["regression"]["status"], "insufficient");

    let files = json_files(&reports);
    assert_eq!(files.len(), 1);
    assert!(!files[0].with_extension("html").exists());
}

#[test]
fn test_failing_target_records_nothing() {
    let dir = TempDir::new().unwrap();

    hotscope(dir.path())
        .args(["run", "--", "sh", "-c", "exit 3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to profile"));

    assert!(!dir.path().join("reports").exists());
}

#[test]
fn test_missing_program_fails() {
    let dir = TempDir::new().unwrap();
    hotscope(dir.path())
        .args(["run", "--", "/nonexistent/hotscope-target"])
        .assert()
        .failure();
}

#[test]
fn test_compare_without_history() {
    let dir = TempDir::new().unwrap();
    hotscope(dir.path())
        .args(["compare", "job.py"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not enough runs to compare."));
}

#[test]
fn test_compare_fail_on_regression() {
    let dir = TempDir::new().unwrap();
    let store = ReportStore::new(dir.path().join("reports"));
    store.save(&recorded(0, 1.0)).unwrap();
    store.save(&recorded(1, 2.0)).unwrap();

    hotscope(dir.path())
        .args(["compare", "job.py"])
        .assert()
        .success()
        .stdout(predicate::str::contains("REGRESSION DETECTED"))
        .stdout(predicate::str::contains("+100.0000%"));

    hotscope(dir.path())
        .args(["compare", "job.py", "--fail-on-regression"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Performance regression detected"));

    // a generous threshold tolerates the doubling
    hotscope(dir.path())
        .args(["compare", "job.py", "--threshold", "1.5", "--fail-on-regression"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NO REGRESSION DETECTED"));
}

#[test]
fn test_config_file_in_working_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("hotscope.toml"),
        "reports_dir = \"perf\"\nhtml = false\n",
    )
    .unwrap();

    run_traced(dir.path()).success();

    let files = json_files(&dir.path().join("perf"));
    assert_eq!(files.len(), 1);
    assert!(!files[0].with_extension("html").exists());
}

#[test]
fn test_invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "top_n = 0\n").unwrap();

    hotscope(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["history", "job.py"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("top_n must be at least 1"));
}

#[test]
fn test_history_empty() {
    let dir = TempDir::new().unwrap();
    hotscope(dir.path())
        .args(["history", "job.py"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No runs recorded for job.py"));
}
