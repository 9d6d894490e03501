//! Height/ace-percentage analysis.
//!
//! Buckets heights, computes per-group z-scores and labels outliers.

pub mod buckets;
pub mod classify;
pub mod pipeline;
pub mod stats;

pub use buckets::HeightBucketTable;
pub use pipeline::{analyze, AnalysisParams};
