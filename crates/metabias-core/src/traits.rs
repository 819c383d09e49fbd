//! Core traits for bias-correction estimators
//!
//! Method-specific result types live in their own crates. This trait is the
//! seam the evaluation harness uses to run any of them uniformly.

use crate::{PointEstimate, Result, StudyDataset};

/// An estimator that corrects one study's effect sizes for selection bias
///
/// Implementations hold only immutable configuration, so a single instance can
/// be shared across worker threads and called once per study.
pub trait BiasCorrectionEstimator: Send + Sync {
    /// Short method name used as the key in records and summaries
    fn name(&self) -> &str;

    /// Minimum number of observations the method needs
    fn minimum_sample_size(&self) -> usize;

    /// Estimate the bias-corrected effect for one study
    fn estimate(&self, dataset: &StudyDataset) -> Result<PointEstimate>;
}
