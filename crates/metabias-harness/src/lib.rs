//! Benchmark publication-bias estimators against replication effects
//!
//! The harness runs a set of [`BiasCorrectionEstimator`]s over a batch of
//! studies, scores each estimate against the study's replication effect, and
//! aggregates per method:
//!
//! - **Mean bias**: average of `estimate − replication`
//! - **Mean absolute deviation**: average of `|estimate − replication|`
//! - **RMSE**: root of the mean squared bias
//!
//! Studies are independent and evaluated in parallel. A failed estimate only
//! excludes that (study, method) pair; a study with no ground truth fails the
//! batch.
//!
//! # Example
//!
//! ```rust
//! use metabias_core::{GroundTruthRecord, GroundTruthTable, StudyDataset};
//! use metabias_harness::{BiasEvaluationHarness, EstimatorConfig, HarnessOptions};
//!
//! let studies = vec![StudyDataset::from_pairs(
//!     "example",
//!     &[(0.10, 0.05), (0.20, 0.10), (0.15, 0.08), (0.30, 0.15), (0.25, 0.12)],
//! ).unwrap()];
//! let truth = GroundTruthTable::from_records([
//!     GroundTruthRecord::new("example", 0.45, 0.18, 0.05),
//! ]).unwrap();
//!
//! let harness = BiasEvaluationHarness::from_config(
//!     &EstimatorConfig::default(),
//!     HarnessOptions::default(),
//! ).unwrap();
//! let report = harness.evaluate(&studies, &truth).unwrap();
//! for summary in &report.summaries {
//!     println!("{summary}");
//! }
//! ```
//!
//! [`BiasCorrectionEstimator`]: metabias_core::BiasCorrectionEstimator

mod config;
mod harness;
mod registry;
mod types;

pub use config::{EstimatorConfig, SelectionBounds};
pub use harness::{join_batch, summarize, BiasEvaluationHarness, HarnessOptions, StudyCase};
pub use registry::{EstimatorSet, STANDARD_METHODS};
pub use types::{
    BatchReport, ErrorMetrics, EstimateFailure, EstimateRecord, Exclusion, PerformanceSummary,
};
