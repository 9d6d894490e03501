//! Outlier classification against fixed z-score thresholds.

use crate::models::OutlierClass;
use serde::{Deserialize, Serialize};

/// Default upper z-score threshold.
pub const DEFAULT_UPPER_THRESHOLD: f64 = 1.75;

/// Default lower z-score threshold.
pub const DEFAULT_LOWER_THRESHOLD: f64 = -1.75;

/// Z-score cut-offs for flagging outliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierThresholds {
    pub upper: f64,
    pub lower: f64,
}

impl Default for OutlierThresholds {
    fn default() -> Self {
        Self {
            upper: DEFAULT_UPPER_THRESHOLD,
            lower: DEFAULT_LOWER_THRESHOLD,
        }
    }
}

impl OutlierThresholds {
    pub fn new(upper: f64, lower: f64) -> Self {
        Self { upper, lower }
    }

    /// Label a z-score. Non-finite scores are `Normal`.
    pub fn classify(&self, z_score: f64) -> OutlierClass {
        if !z_score.is_finite() {
            OutlierClass::Normal
        } else if z_score > self.upper {
            OutlierClass::HighOutlier
        } else if z_score < self.lower {
            OutlierClass::LowOutlier
        } else {
            OutlierClass::Normal
        }
    }
}
