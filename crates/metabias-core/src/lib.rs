//! Core data model and numerics for publication-bias estimation
//!
//! This crate provides the pieces every estimator crate builds on:
//!
//! - **Data model**: [`Observation`], [`StudyDataset`] with derived
//!   inverse-variance weights, and the [`GroundTruthRecord`] used for scoring
//! - **Outputs**: [`PointEstimate`] and the [`FittedLine`] regression
//!   estimators expose for curve plotting
//! - **Errors**: a single [`Error`] enum shared across the workspace
//! - **Numerics**: standard normal helpers ([`normal`]) and derivative-free
//!   minimizers ([`optimize`])
//!
//! # Example
//!
//! ```rust
//! use metabias_core::StudyDataset;
//!
//! let study = StudyDataset::from_pairs(
//!     "ego-depletion",
//!     &[(0.10, 0.05), (0.20, 0.10), (0.15, 0.08)],
//! ).unwrap();
//!
//! let total: f64 = study.weights().iter().sum();
//! assert!((total - 1.0).abs() < 1e-12);
//! ```

pub mod dataset;
pub mod error;
pub mod estimate;
pub mod normal;
pub mod optimize;
pub mod traits;

pub use dataset::{GroundTruthRecord, GroundTruthTable, Observation, StudyDataset};
pub use error::{Error, ErrorKind, Result};
pub use estimate::{FittedLine, PointEstimate, Predictor};
pub use normal::{Sidedness, ZTest};
pub use optimize::{Bounds, BoxOptions, Budget, MinimizeStatus, ScalarOptions};
pub use traits::BiasCorrectionEstimator;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        BiasCorrectionEstimator, Error, GroundTruthRecord, Observation, PointEstimate, Result,
        StudyDataset,
    };
}
