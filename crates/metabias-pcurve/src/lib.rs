//! p-curve publication-bias correction
//!
//! Only significant findings are published under strong selection, so the
//! p-curve estimator works on those alone. For each candidate true effect it
//! computes the conditional p-value ("pp-value") of every significant finding
//! and measures how far their distribution is from uniform. The candidate with
//! the smallest Kolmogorov–Smirnov distance is the estimate.
//!
//! # Example
//!
//! ```rust
//! use metabias_core::StudyDataset;
//! use metabias_pcurve::{PCurveEstimator, PCurveParameters};
//!
//! let study = StudyDataset::from_pairs(
//!     "example",
//!     &[(0.5, 0.1), (0.6, 0.12), (0.55, 0.11)],
//! ).unwrap();
//!
//! let params = PCurveParameters {
//!     interval: (0.0, 1.0),
//!     ..Default::default()
//! };
//! let fit = PCurveEstimator::new(params).fit(&study).unwrap();
//! assert!((0.0..=1.0).contains(&fit.theta));
//! ```

mod estimator;
mod uniformity;

pub use estimator::{PCurveEstimate, PCurveEstimator, PCurveParameters};
pub use uniformity::{ks_distance_uniform, pp_value};

// Convenience constructor
pub fn pcurve() -> PCurveEstimator {
    PCurveEstimator::new(PCurveParameters::default())
}
