//! Data models for the hard-court ace analysis.
//!
//! This module contains the core data structures shared by the loader,
//! the analyzer, and the report generator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One aggregated row returned by the hard-court query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAceRecord {
    /// Player name.
    pub name: String,
    /// Height in centimetres, `None` when the source has no height.
    pub ht: Option<i32>,
    /// Share of serve points won by an ace. `NaN` when missing.
    pub ace_percentage: f64,
    /// Number of hard-court matches behind the aggregate.
    pub total_matches: i64,
}

impl PlayerAceRecord {
    /// Creates a record from decoded query columns.
    pub fn new(
        name: impl Into<String>,
        ht: Option<i32>,
        ace_percentage: f64,
        total_matches: i64,
    ) -> Self {
        Self {
            name: name.into(),
            ht,
            ace_percentage,
            total_matches,
        }
    }
}

/// Outlier label assigned from a record's z-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OutlierClass {
    /// Within the thresholds, or z-score undefined.
    #[serde(rename = "Normal")]
    Normal,
    /// Z-score above the upper threshold.
    #[serde(rename = "High Outlier")]
    HighOutlier,
    /// Z-score below the lower threshold.
    #[serde(rename = "Low Outlier")]
    LowOutlier,
}

impl OutlierClass {
    /// All classes in legend order.
    pub const ALL: [OutlierClass; 3] = [
        OutlierClass::Normal,
        OutlierClass::HighOutlier,
        OutlierClass::LowOutlier,
    ];

    /// Returns the label used in plots and reports.
    pub fn label(&self) -> &'static str {
        match self {
            OutlierClass::Normal => "Normal",
            OutlierClass::HighOutlier => "High Outlier",
            OutlierClass::LowOutlier => "Low Outlier",
        }
    }

    /// Returns the fixed plot color for this class.
    ///
    /// These are the first three entries of Plotly's qualitative palette.
    pub fn color(&self) -> &'static str {
        match self {
            OutlierClass::Normal => "#636EFA",
            OutlierClass::HighOutlier => "#EF553B",
            OutlierClass::LowOutlier => "#00CC96",
        }
    }

    /// Returns an emoji representation of the class.
    pub fn emoji(&self) -> &'static str {
        match self {
            OutlierClass::Normal => "🔵",
            OutlierClass::HighOutlier => "🔴",
            OutlierClass::LowOutlier => "🟢",
        }
    }
}

impl fmt::Display for OutlierClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A valid record together with its derived statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    /// Player name.
    pub name: String,
    /// Raw height in centimetres.
    pub height_cm: i32,
    /// Ace percentage from the query.
    pub ace_percentage: f64,
    /// Hard-court match count.
    pub total_matches: i64,
    /// Bucket representative the height maps to.
    pub height_group: i32,
    /// Mean ace percentage of the height group.
    pub group_mean: f64,
    /// Sample standard deviation of the height group (`NaN` for n < 2).
    pub group_std: f64,
    /// Standardized deviation from the group mean, non-finite when undefined.
    pub z_score: f64,
    /// Outlier label.
    pub outlier_class: OutlierClass,
}

impl ClassifiedRecord {
    /// Whether the record was flagged as either kind of outlier.
    pub fn is_outlier(&self) -> bool {
        self.outlier_class != OutlierClass::Normal
    }
}

/// Aggregates for a single height group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    /// Group representative height.
    pub height_group: i32,
    /// Number of records in the group.
    pub count: usize,
    /// Mean ace percentage over finite values.
    pub mean: f64,
    /// Sample standard deviation over finite values.
    pub std: f64,
}

/// Per-class counts for one view of the data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlierSummary {
    /// Total number of records.
    pub total: usize,
    /// Records labelled normal.
    pub normal: usize,
    /// Records above the upper threshold.
    pub high: usize,
    /// Records below the lower threshold.
    pub low: usize,
}

impl OutlierSummary {
    /// Creates a summary from a list of classified records.
    pub fn from_records(records: &[ClassifiedRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };

        for record in records {
            match record.outlier_class {
                OutlierClass::Normal => summary.normal += 1,
                OutlierClass::HighOutlier => summary.high += 1,
                OutlierClass::LowOutlier => summary.low += 1,
            }
        }

        summary
    }

    /// Count for a single class.
    pub fn count(&self, class: OutlierClass) -> usize {
        match class {
            OutlierClass::Normal => self.normal,
            OutlierClass::HighOutlier => self.high,
            OutlierClass::LowOutlier => self.low,
        }
    }
}

/// Metadata about an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Date and time of the analysis.
    pub analysis_date: DateTime<Utc>,
    /// Path of the SQL file that produced the input.
    pub query_file: String,
    /// Rows returned by the query.
    pub rows_fetched: usize,
    /// Rows dropped by the height filter.
    pub rows_excluded: usize,
    /// Minimum valid height.
    pub min_height: i32,
    /// Minimum matches for the filtered view.
    pub min_matches: i64,
    /// Upper z-score threshold.
    pub upper_threshold: f64,
    /// Lower z-score threshold.
    pub lower_threshold: f64,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Metadata about the run.
    pub metadata: ReportMetadata,
    /// Class counts over all valid records.
    pub summary_all: OutlierSummary,
    /// Class counts over the sample-size view.
    pub summary_filtered: OutlierSummary,
    /// Statistics per height group, sorted by group.
    pub groups: Vec<GroupStats>,
    /// Every valid record with derived fields.
    pub records: Vec<ClassifiedRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_record_keeps_missing_height() {
        let record = PlayerAceRecord::new("No Height", None, 0.07, 12);
        assert_eq!(record.name, "No Height");
        assert_eq!(record.ht, None);
        assert_eq!(record.total_matches, 12);
    }

    fn classified(class: OutlierClass) -> ClassifiedRecord {
        ClassifiedRecord {
            name: "Test Player".to_string(),
            height_cm: 185,
            ace_percentage: 0.1,
            total_matches: 120,
            height_group: 185,
            group_mean: 0.1,
            group_std: 0.02,
            z_score: 0.0,
            outlier_class: class,
        }
    }

    #[test]
    fn test_outlier_class_labels() {
        assert_eq!(OutlierClass::Normal.to_string(), "Normal");
        assert_eq!(OutlierClass::HighOutlier.to_string(), "High Outlier");
        assert_eq!(OutlierClass::LowOutlier.to_string(), "Low Outlier");
    }

    #[test]
    fn test_outlier_class_colors_are_distinct() {
        let colors: std::collections::HashSet<_> =
            OutlierClass::ALL.iter().map(|c| c.color()).collect();
        assert_eq!(colors.len(), 3);
        assert_eq!(OutlierClass::Normal.color(), "#636EFA");
    }

    #[test]
    fn test_outlier_class_serializes_as_label() {
        let json = serde_json::to_string(&OutlierClass::HighOutlier).unwrap();
        assert_eq!(json, "\"High Outlier\"");
    }

    #[test]
    fn test_outlier_summary() {
        let records = vec![
            classified(OutlierClass::Normal),
            classified(OutlierClass::Normal),
            classified(OutlierClass::HighOutlier),
            classified(OutlierClass::LowOutlier),
        ];

        let summary = OutlierSummary::from_records(&records);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.normal, 2);
        assert_eq!(summary.count(OutlierClass::HighOutlier), 1);
        assert_eq!(summary.count(OutlierClass::LowOutlier), 1);
    }

    #[test]
    fn test_is_outlier() {
        assert!(!classified(OutlierClass::Normal).is_outlier());
        assert!(classified(OutlierClass::LowOutlier).is_outlier());
    }
}
