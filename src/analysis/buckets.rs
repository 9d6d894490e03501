//! Height bucketing.
//!
//! Measured heights cluster around near-duplicate values (173/174, 196-198, ...).
//! The bucket table collapses each cluster onto one representative so group
//! statistics are not fragmented. The table is calibration data: it is loaded
//! from configuration and evaluated in order, first match wins.

use serde::{Deserialize, Serialize};

/// Predicate half of a bucket rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightMatch {
    /// Height is one of the listed values.
    OneOf(Vec<i32>),
    /// Height lies in `[lo, hi]`, both ends inclusive.
    Between([i32; 2]),
}

impl HeightMatch {
    /// Whether `height` satisfies this predicate.
    pub fn matches(&self, height: i32) -> bool {
        match self {
            HeightMatch::OneOf(values) => values.contains(&height),
            HeightMatch::Between([lo, hi]) => (*lo..=*hi).contains(&height),
        }
    }

    fn intersects(&self, other: &HeightMatch) -> bool {
        match (self, other) {
            (HeightMatch::OneOf(values), m) | (m, HeightMatch::OneOf(values)) => {
                values.iter().any(|h| m.matches(*h))
            }
            (HeightMatch::Between([a_lo, a_hi]), HeightMatch::Between([b_lo, b_hi])) => {
                a_lo <= b_hi && b_lo <= a_hi
            }
        }
    }
}

/// A single `(predicate, replacement)` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightBucketRule {
    /// Which heights the rule captures.
    #[serde(flatten)]
    pub matcher: HeightMatch,
    /// Representative height assigned to captured records.
    pub group: i32,
}

impl HeightBucketRule {
    /// Rule capturing an explicit set of heights.
    pub fn one_of(heights: &[i32], group: i32) -> Self {
        Self {
            matcher: HeightMatch::OneOf(heights.to_vec()),
            group,
        }
    }

    /// Rule capturing an inclusive range.
    pub fn between(lo: i32, hi: i32, group: i32) -> Self {
        Self {
            matcher: HeightMatch::Between([lo, hi]),
            group,
        }
    }

    /// Describe why this rule is unusable, if it is.
    pub fn validate(&self) -> Result<(), String> {
        match &self.matcher {
            HeightMatch::OneOf(values) if values.is_empty() => {
                Err(format!("bucket for group {} has an empty one_of list", self.group))
            }
            HeightMatch::Between([lo, hi]) if lo > hi => Err(format!(
                "bucket for group {} has between = [{}, {}] with lo > hi",
                self.group, lo, hi
            )),
            _ => Ok(()),
        }
    }
}

/// Ordered list of bucket rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeightBucketTable {
    rules: Vec<HeightBucketRule>,
}

impl Default for HeightBucketTable {
    fn default() -> Self {
        Self::new(vec![
            HeightBucketRule::one_of(&[173, 174], 173),
            HeightBucketRule::one_of(&[175, 176], 175),
            HeightBucketRule::one_of(&[180, 181], 180),
            HeightBucketRule::between(182, 183, 182),
            HeightBucketRule::one_of(&[185, 186], 185),
            HeightBucketRule::one_of(&[188, 189], 188),
            HeightBucketRule::one_of(&[190, 191], 190),
            HeightBucketRule::one_of(&[193, 194], 193),
            HeightBucketRule::between(196, 198, 196),
            HeightBucketRule::between(201, 203, 201),
            HeightBucketRule::between(208, 211, 208),
        ])
    }
}

impl HeightBucketTable {
    /// Build a table from rules in evaluation order.
    pub fn new(rules: Vec<HeightBucketRule>) -> Self {
        Self { rules }
    }

    /// The rules in evaluation order.
    pub fn rules(&self) -> &[HeightBucketRule] {
        &self.rules
    }

    /// Map a height to its group. Falls back to the height itself.
    pub fn group_for(&self, height: i32) -> i32 {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(height))
            .map(|rule| rule.group)
            .unwrap_or(height)
    }

    /// Index pairs `(earlier, later)` of rules that capture a common height.
    ///
    /// The earlier rule always wins for heights in the overlap.
    pub fn overlaps(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, a) in self.rules.iter().enumerate() {
            for (j, b) in self.rules.iter().enumerate().skip(i + 1) {
                if a.matcher.intersects(&b.matcher) {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    /// Check every rule.
    pub fn validate(&self) -> Result<(), String> {
        self.rules.iter().try_for_each(HeightBucketRule::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_groups() {
        let table = HeightBucketTable::default();
        assert_eq!(table.group_for(173), 173);
        assert_eq!(table.group_for(174), 173);
        assert_eq!(table.group_for(176), 175);
        assert_eq!(table.group_for(183), 182);
        assert_eq!(table.group_for(197), 196);
        assert_eq!(table.group_for(198), 196);
        assert_eq!(table.group_for(203), 201);
        assert_eq!(table.group_for(211), 208);
    }

    #[test]
    fn test_identity_fallback() {
        let table = HeightBucketTable::default();
        assert_eq!(table.group_for(150), 150);
        assert_eq!(table.group_for(177), 177);
        assert_eq!(table.group_for(200), 200);
        assert_eq!(table.group_for(212), 212);
        assert_eq!(HeightBucketTable::new(Vec::new()).group_for(174), 174);
    }

    #[test]
    fn test_default_table_has_no_overlaps() {
        let table = HeightBucketTable::default();
        assert!(table.overlaps().is_empty());
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_first_match_wins() {
        let table = HeightBucketTable::new(vec![
            HeightBucketRule::between(180, 185, 180),
            HeightBucketRule::one_of(&[184, 185, 186], 186),
        ]);

        assert_eq!(table.group_for(184), 180);
        assert_eq!(table.group_for(186), 186);
        assert_eq!(table.overlaps(), vec![(0, 1)]);
    }

    #[test]
    fn test_validate_rejects_bad_rules() {
        assert!(HeightBucketRule::one_of(&[], 170).validate().is_err());
        assert!(HeightBucketRule::between(190, 180, 180).validate().is_err());
        assert!(HeightBucketRule::between(180, 180, 180).validate().is_ok());
    }

    #[test]
    fn test_parse_rules_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            height_groups: HeightBucketTable,
        }

        let toml_content = r#"
[[height_groups]]
one_of = [170, 171]
group = 170

[[height_groups]]
between = [199, 200]
group = 199
"#;

        let parsed: Wrapper = toml::from_str(toml_content).unwrap();
        let table = parsed.height_groups;
        assert_eq!(table.rules().len(), 2);
        assert_eq!(table.group_for(171), 170);
        assert_eq!(table.group_for(200), 199);
        assert_eq!(table.group_for(174), 174);
    }
}
