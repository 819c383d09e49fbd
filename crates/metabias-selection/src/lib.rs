//! Selection-model publication-bias correction
//!
//! Models publication as a step function of the z-statistic: significant
//! effects are always published, insignificant ones with relative probability
//! `p1`. The true effect `θ`, `p1` and an optional heterogeneity `τ` are fitted
//! jointly by maximum likelihood under box constraints.
//!
//! # Example
//!
//! ```rust
//! use metabias_core::StudyDataset;
//! use metabias_selection::{SelectionModelEstimator, SelectionModelParameters};
//!
//! let study = StudyDataset::from_pairs(
//!     "example",
//!     &[(0.10, 0.05), (0.20, 0.10), (0.15, 0.08), (0.30, 0.15), (0.25, 0.12)],
//! ).unwrap();
//!
//! let fit = SelectionModelEstimator::new(SelectionModelParameters::default()).fit(&study);
//! if let Ok(fit) = fit {
//!     println!("theta = {:.3}, p1 = {:.3}", fit.theta, fit.p1);
//! }
//! ```

mod estimator;
mod likelihood;

pub use estimator::{SelectionModelEstimate, SelectionModelEstimator, SelectionModelParameters};
pub use likelihood::{SelectionLikelihood, P1, TAU, THETA};

// Convenience constructor
pub fn selection_model() -> SelectionModelEstimator {
    SelectionModelEstimator::new(SelectionModelParameters::default())
}
