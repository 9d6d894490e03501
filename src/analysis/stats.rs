//! Per-group statistics and z-scores.

use crate::models::GroupStats;
use std::collections::BTreeMap;

/// Mean and sample standard deviation of the finite values in `values`.
///
/// Non-finite inputs are skipped. The mean of zero values and the standard
/// deviation of fewer than two values are `NaN`.
pub fn mean_and_sample_std(values: &[f64]) -> (f64, f64) {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let n = finite.len();

    if n == 0 {
        return (f64::NAN, f64::NAN);
    }

    let mean = finite.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, f64::NAN);
    }

    let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, variance.sqrt())
}

/// Statistics for one height group, keyed for lookup by record.
#[derive(Debug, Clone, Copy)]
pub struct GroupAggregate {
    /// Number of records assigned to the group.
    pub count: usize,
    /// Mean ace percentage.
    pub mean: f64,
    /// Sample standard deviation.
    pub std: f64,
    /// All finite values in the group are identical and there are at least two.
    pub uniform: bool,
}

impl GroupAggregate {
    /// Aggregate one group's ace percentages.
    pub fn from_values(values: &[f64]) -> Self {
        let (mean, std) = mean_and_sample_std(values);
        let mut finite = values.iter().copied().filter(|v| v.is_finite());
        let uniform = match finite.next() {
            Some(first) => {
                let rest: Vec<f64> = finite.collect();
                !rest.is_empty() && rest.iter().all(|v| *v == first)
            }
            None => false,
        };

        Self {
            count: values.len(),
            mean,
            std,
            uniform,
        }
    }

    /// Z-score of `value` within this group.
    ///
    /// Non-finite when the group has fewer than two finite values or `value`
    /// itself is not finite. Zero for every finite member of a uniform group.
    pub fn z_score(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return f64::NAN;
        }
        if self.uniform {
            return 0.0;
        }
        (value - self.mean) / self.std
    }
}

/// Group ace percentages by height group and aggregate each group.
///
/// `pairs` yields `(height_group, ace_percentage)`. Groups are returned in
/// ascending height order.
pub fn aggregate_groups<I>(pairs: I) -> BTreeMap<i32, GroupAggregate>
where
    I: IntoIterator<Item = (i32, f64)>,
{
    let mut grouped: BTreeMap<i32, Vec<f64>> = BTreeMap::new();

    for (group, value) in pairs {
        grouped.entry(group).or_default().push(value);
    }

    grouped
        .into_iter()
        .map(|(group, values)| (group, GroupAggregate::from_values(&values)))
        .collect()
}

/// Flatten aggregates into report rows.
pub fn group_stats_table(groups: &BTreeMap<i32, GroupAggregate>) -> Vec<GroupStats> {
    groups
        .iter()
        .map(|(group, agg)| GroupStats {
            height_group: *group,
            count: agg.count,
            mean: agg.mean,
            std: agg.std,
        })
        .collect()
}
