//! Report and chart output.

pub mod generator;
pub mod plot;

pub use generator::{generate_json_report, generate_markdown_report};
pub use plot::{write_scatter_html, ScatterPlot};

use std::path::{Path, PathBuf};

/// File name of the chart covering every valid record.
pub const ALL_CHART_FILE: &str = "ace_vs_height_all.html";

/// Markdown report file name.
pub const MARKDOWN_REPORT_FILE: &str = "ace_height_report.md";

/// JSON report file name.
pub const JSON_REPORT_FILE: &str = "ace_height_report.json";

/// File name of the sample-size chart.
pub fn filtered_chart_file(min_matches: i64) -> String {
    format!("ace_vs_height_min_{}_matches.html", min_matches)
}

/// Paths of everything an analysis run writes.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub all_chart: PathBuf,
    pub filtered_chart: PathBuf,
    pub markdown: PathBuf,
    pub json: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path, min_matches: i64) -> Self {
        Self {
            all_chart: dir.join(ALL_CHART_FILE),
            filtered_chart: dir.join(filtered_chart_file(min_matches)),
            markdown: dir.join(MARKDOWN_REPORT_FILE),
            json: dir.join(JSON_REPORT_FILE),
        }
    }
}
