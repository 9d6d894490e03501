//! The analysis pass: filter, bucket, score, classify.

use super::buckets::HeightBucketTable;
use super::classify::OutlierThresholds;
use super::stats::{aggregate_groups, group_stats_table};
use crate::models::{ClassifiedRecord, GroupStats, OutlierSummary, PlayerAceRecord};
use tracing::{debug, warn};

/// Parameters for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisParams {
    /// Records with a height below this are discarded.
    pub min_height: i32,
    /// Minimum match count for the sample-size view.
    pub min_matches: i64,
    /// Height bucket table.
    pub buckets: HeightBucketTable,
    /// Outlier cut-offs.
    pub thresholds: OutlierThresholds,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            min_height: 100,
            min_matches: 100,
            buckets: HeightBucketTable::default(),
            thresholds: OutlierThresholds::default(),
        }
    }
}

impl From<&crate::config::AnalysisConfig> for AnalysisParams {
    fn from(config: &crate::config::AnalysisConfig) -> Self {
        Self {
            min_height: config.min_height,
            min_matches: config.min_matches,
            buckets: config.height_groups.clone(),
            thresholds: OutlierThresholds::new(config.upper_threshold, config.lower_threshold),
        }
    }
}

/// Output of [`analyze`].
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Every valid record, in input order.
    pub all: Vec<ClassifiedRecord>,
    /// Records meeting the match-count floor, classes reused from `all`.
    pub filtered: Vec<ClassifiedRecord>,
    /// Records dropped by the height filter.
    pub excluded: usize,
    /// Statistics per height group.
    pub groups: Vec<GroupStats>,
}

impl AnalysisResult {
    pub fn summary_all(&self) -> OutlierSummary {
        OutlierSummary::from_records(&self.all)
    }

    pub fn summary_filtered(&self) -> OutlierSummary {
        OutlierSummary::from_records(&self.filtered)
    }
}

/// Whether a record has a usable height.
pub fn has_valid_height(record: &PlayerAceRecord, min_height: i32) -> bool {
    matches!(record.ht, Some(ht) if ht >= min_height)
}

/// Run the full pass over the query result.
pub fn analyze(records: &[PlayerAceRecord], params: &AnalysisParams) -> AnalysisResult {
    for (earlier, later) in params.buckets.overlaps() {
        warn!(
            "Height bucket rules {} and {} overlap; rule {} wins",
            earlier, later, earlier
        );
    }

    let valid: Vec<(&PlayerAceRecord, i32, i32)> = records
        .iter()
        .filter(|r| has_valid_height(r, params.min_height))
        .filter_map(|r| r.ht.map(|ht| (r, ht, params.buckets.group_for(ht))))
        .collect();
    let excluded = records.len() - valid.len();
    debug!(
        "Height filter kept {} of {} records (min {})",
        valid.len(),
        records.len(),
        params.min_height
    );

    let aggregates = aggregate_groups(valid.iter().map(|(r, _, g)| (*g, r.ace_percentage)));

    let all: Vec<ClassifiedRecord> = valid
        .into_iter()
        .map(|(record, ht, group)| {
            let agg = aggregates[&group];
            let z_score = agg.z_score(record.ace_percentage);
            ClassifiedRecord {
                name: record.name.clone(),
                height_cm: ht,
                ace_percentage: record.ace_percentage,
                total_matches: record.total_matches,
                height_group: group,
                group_mean: agg.mean,
                group_std: agg.std,
                z_score,
                outlier_class: params.thresholds.classify(z_score),
            }
        })
        .collect();

    let filtered = sample_size_view(&all, params.min_matches);

    AnalysisResult {
        all,
        filtered,
        excluded,
        groups: group_stats_table(&aggregates),
    }
}

/// Records with at least `min_matches` matches.
///
/// Statistics are not recomputed: every surviving record keeps the group,
/// z-score and class it got in the unfiltered pass.
pub fn sample_size_view(records: &[ClassifiedRecord], min_matches: i64) -> Vec<ClassifiedRecord> {
    records
        .iter()
        .filter(|r| r.total_matches >= min_matches)
        .cloned()
        .collect()
}
