//! Markdown and JSON report generation.
//!
//! The Markdown report summarises an analysis run: parameters, class counts
//! for both views, per-group statistics and every flagged player.

use crate::models::{AnalysisReport, ClassifiedRecord, GroupStats, OutlierClass, OutlierSummary, ReportMetadata};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AnalysisReport) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Hard-Court Ace Percentage vs Height\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));

    output.push_str(&generate_summary_section(
        &report.summary_all,
        &report.summary_filtered,
        report.metadata.min_matches,
    ));

    output.push_str(&generate_groups_section(&report.groups));

    output.push_str(&generate_outliers_section(&report.records, report.metadata.min_matches));

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Query File:** `{}`\n", metadata.query_file));
    section.push_str(&format!("- **Rows Fetched:** {}\n", metadata.rows_fetched));
    if metadata.rows_excluded > 0 {
        section.push_str(&format!(
            "- **Rows Excluded (height < {}):** {}\n",
            metadata.min_height, metadata.rows_excluded
        ));
    }
    section.push_str(&format!(
        "- **Thresholds:** z > {} high, z < {} low\n",
        metadata.upper_threshold, metadata.lower_threshold
    ));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the class count table for both views.
fn generate_summary_section(
    all: &OutlierSummary,
    filtered: &OutlierSummary,
    min_matches: i64,
) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| View | ");
    for class in OutlierClass::ALL {
        section.push_str(&format!("{} {} | ", class.emoji(), class));
    }
    section.push_str("**Total** |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|\n");

    let views = [
        ("All players".to_string(), all),
        (format!("{}+ matches", min_matches), filtered),
    ];
    for (label, summary) in views {
        section.push_str(&format!("| {} | ", label));
        for class in OutlierClass::ALL {
            section.push_str(&format!("{} | ", summary.count(class)));
        }
        section.push_str(&format!("**{}** |\n", summary.total));
    }
    section.push('\n');

    section
}

/// Generate the per-group statistics table.
fn generate_groups_section(groups: &[GroupStats]) -> String {
    let mut section = String::new();

    section.push_str("## Height Groups\n\n");

    if groups.is_empty() {
        section.push_str("No valid records.\n\n");
        return section;
    }

    section.push_str("| Group (cm) | Players | Mean | Std |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    for group in groups {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            group.height_group,
            group.count,
            format_stat(group.mean),
            format_stat(group.std)
        ));
    }
    section.push('\n');

    section
}

/// Generate the flagged player list.
fn generate_outliers_section(records: &[ClassifiedRecord], min_matches: i64) -> String {
    let mut section = String::new();

    section.push_str("## Outliers\n\n");

    let mut outliers: Vec<&ClassifiedRecord> = records.iter().filter(|r| r.is_outlier()).collect();
    if outliers.is_empty() {
        section.push_str("No players outside the thresholds.\n\n");
        return section;
    }

    // Most extreme first
    outliers.sort_by(|a, b| {
        b.z_score
            .abs()
            .partial_cmp(&a.z_score.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    section.push_str("| Player | Height | Group | Ace % | Z | Matches | Class |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---|\n");
    for record in outliers {
        let volume = if record.total_matches >= min_matches { "" } else { " *" };
        section.push_str(&format!(
            "| {} | {} | {} | {} | {:.2} | {}{} | {} {} |\n",
            escape_cell(&record.name),
            record.height_cm,
            record.height_group,
            format_stat(record.ace_percentage),
            record.z_score,
            record.total_matches,
            volume,
            record.outlier_class.emoji(),
            record.outlier_class
        ));
    }
    section.push_str(&format!(
        "\n\\* fewer than {} matches; not shown in the filtered chart.\n\n",
        min_matches
    ));

    section
}

/// Keep a value from splitting a Markdown table cell.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn format_stat(value: f64) -> String {
    if value.is_finite() {
        format!("{:.4}", value)
    } else {
        "n/a".to_string()
    }
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by hardcourt-aces*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
