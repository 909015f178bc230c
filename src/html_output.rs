//! HTML output format for run reports
//!
//! Self-contained page with embedded CSS: run summary, hotspot table,
//! optimization suggestions and the regression check.

use crate::call_tracer::HotspotEntry;
use crate::regression::{FindingLevel, RegressionReport, RegressionStatus};
use crate::report::RunResult;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// HTML report renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlReport;

impl HtmlReport {
    /// Escape HTML special characters to prevent XSS
    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }

    /// Generate embedded CSS styles
    fn generate_styles() -> &'static str {
        r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 40px;
            background-color: #f8f9fa;
        }
        h1, h2 {
            color: #333;
        }
        .card {
            background: white;
            padding: 20px;
            margin-bottom: 20px;
            border-radius: 8px;
            box-shadow: 0 2px 6px rgba(0,0,0,0.1);
        }
        table {
            border-collapse: collapse;
            width: 100%;
        }
        th, td {
            border-bottom: 1px solid #ddd;
            padding: 10px;
            text-align: left;
        }
        th {
            background-color: #f1f1f1;
        }
        tr:hover {
            background-color: #f5f5f5;
        }
        .function {
            font-family: monospace;
            color: #0066cc;
        }
        .numeric {
            font-family: monospace;
            text-align: right;
        }
        .suggestion {
            white-space: pre-line;
            margin-bottom: 8px;
        }
        .status-ok {
            color: #2e7d32;
        }
        .status-insufficient {
            color: #8a6d3b;
        }
        .status-regression {
            color: #cc0000;
        }
        .finding-warning {
            color: #cc0000;
        }
        .footer {
            margin-top: 20px;
            font-size: 0.8em;
            color: #888;
            text-align: center;
        }
        "#
    }

    fn render_summary(result: &RunResult) -> String {
        let mut html = String::new();

        html.push_str("    <div class=\"card\">\n");
        html.push_str("        <h2>Summary</h2>\n");
        html.push_str(&format!(
            "        <p><strong>Target:</strong> {}</p>\n",
            Self::escape_html(&result.target)
        ));
        html.push_str(&format!(
            "        <p><strong>Started:</strong> {}</p>\n",
            result.timestamp.to_rfc3339()
        ));
        html.push_str(&format!(
            "        <p><strong>Execution Time:</strong> {:.4} seconds</p>\n",
            result.execution_time
        ));
        html.push_str(&format!(
            "        <p><strong>Average CPU:</strong> {:.2} %</p>\n",
            result.avg_cpu_percent
        ));
        html.push_str(&format!(
            "        <p><strong>Peak Memory:</strong> {:.2} MB</p>\n",
            result.peak_memory_mb
        ));
        html.push_str("    </div>\n");

        html
    }

    fn format_hotspot_row(hotspot: &HotspotEntry) -> String {
        format!(
            r#"<tr><td class="function">{}</td><td class="numeric">{}</td><td class="numeric">{:.4}</td><td class="numeric">{:.6}</td></tr>"#,
            Self::escape_html(&hotspot.identity.to_string()),
            hotspot.calls,
            hotspot.total_time,
            hotspot.average_time()
        )
    }

    fn render_hotspots(hotspots: &[HotspotEntry]) -> String {
        let mut html = String::new();

        html.push_str("    <div class=\"card\">\n");
        html.push_str("        <h2>Hotspots</h2>\n");

        if hotspots.is_empty() {
            html.push_str("        <p>No function profiling data collected.</p>\n");
        } else {
            html.push_str("        <table>\n");
            html.push_str("            <tr><th>Function</th><th>Calls</th><th>Total Time (s)</th><th>Per Call (s)</th></tr>\n");
            for hotspot in hotspots {
                html.push_str("            ");
                html.push_str(&Self::format_hotspot_row(hotspot));
                html.push('\n');
            }
            html.push_str("        </table>\n");
        }

        html.push_str("    </div>\n");
        html
    }

    fn render_suggestions(suggestions: &[String]) -> String {
        let mut html = String::new();

        html.push_str("    <div class=\"card\">\n");
        html.push_str("        <h2>Optimization Suggestions</h2>\n");
        for suggestion in suggestions {
            html.push_str(&format!(
                "        <p class=\"suggestion\">{}</p>\n",
                Self::escape_html(suggestion)
            ));
        }
        html.push_str("    </div>\n");

        html
    }

    fn render_regression(report: &RegressionReport) -> String {
        let mut html = String::new();

        let (class, heading) = match report.status {
            RegressionStatus::Insufficient => ("status-insufficient", "Insufficient history"),
            RegressionStatus::Ok => ("status-ok", "No regression detected"),
            RegressionStatus::Regression => ("status-regression", "Regression detected"),
        };

        html.push_str("    <div class=\"card\">\n");
        html.push_str("        <h2>Regression Check</h2>\n");
        html.push_str(&format!("        <p class=\"{}\"><strong>{}</strong></p>\n", class, heading));
        html.push_str("        <ul>\n");
        for finding in &report.findings {
            let item_class = match finding.level {
                FindingLevel::Warning => " class=\"finding-warning\"",
                FindingLevel::Ok | FindingLevel::InsufficientHistory => "",
            };
            html.push_str(&format!(
                "            <li{}>{}</li>\n",
                item_class,
                Self::escape_html(&finding.message)
            ));
        }
        html.push_str("        </ul>\n");
        html.push_str("    </div>\n");

        html
    }

    /// Generate complete HTML document
    pub fn render(result: &RunResult) -> String {
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n");
        html.push_str("<html lang=\"en\">\n");

        html.push_str("<head>\n");
        html.push_str("    <meta charset=\"UTF-8\">\n");
        html.push_str(
            "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        );
        html.push_str("    <title>Hotscope Report</title>\n");
        html.push_str("    <style>");
        html.push_str(Self::generate_styles());
        html.push_str("</style>\n");
        html.push_str("</head>\n");

        html.push_str("<body>\n");
        html.push_str("    <h1>Hotscope Performance Report</h1>\n");

        html.push_str(&Self::render_summary(result));
        html.push_str(&Self::render_hotspots(&result.hotspots));

        if let Some(suggestions) = &result.suggestions {
            html.push_str(&Self::render_suggestions(suggestions));
        }
        if let Some(regression) = &result.regression {
            html.push_str(&Self::render_regression(regression));
        }

        html.push_str("    <div class=\"footer\">\n");
        html.push_str("        Generated by Hotscope\n");
        html.push_str("    </div>\n");

        html.push_str("</body>\n");
        html.push_str("</html>\n");

        html
    }

    /// Render `result` and write it to `path`
    pub fn write_to(result: &RunResult, path: &Path) -> Result<()> {
        fs::write(path, Self::render(result))
            .with_context(|| format!("Failed to write HTML report: {}", path.display()))?;
        tracing::info!(path = %path.display(), "Wrote HTML report");
        Ok(())
    }
}
