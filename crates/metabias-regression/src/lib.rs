//! Regression-based publication-bias correction
//!
//! This crate provides weighted least squares meta-regression and the
//! estimators built on it:
//!
//! - **WLS**: inverse-variance weighted mean (no correction)
//! - **PET**: intercept of effect regressed on standard error
//! - **PEESE**: intercept of effect regressed on sampling variance
//! - **PEESE (positive only)**: PEESE when its slope is non-negative, WLS otherwise
//! - **FAT-PET-PEESE**: the conditional procedure choosing between the above
//!
//! # Example
//!
//! ```rust
//! use metabias_core::StudyDataset;
//! use metabias_regression::{FatPetPeese, FatPetPeeseParameters};
//!
//! let study = StudyDataset::from_pairs(
//!     "example",
//!     &[(0.10, 0.05), (0.20, 0.10), (0.15, 0.08), (0.30, 0.15), (0.25, 0.12)],
//! ).unwrap();
//!
//! let decision = FatPetPeese::new(FatPetPeeseParameters::default())
//!     .decide(&study)
//!     .unwrap();
//! println!("{} via {}", decision.estimate, decision.source);
//! ```

mod estimators;
mod fat_pet_peese;
mod wls;

pub use estimators::{
    PeeseEstimator, PeesePositiveDecision, PeesePositiveOnly, PetEstimator, WlsEstimator,
};
pub use fat_pet_peese::{
    apply_slope_override, DecisionState, EstimateSource, FatPetPeese, FatPetPeeseDecision,
    FatPetPeeseParameters, TestOutcomes,
};
pub use wls::{Coefficient, RegressionFit, RegressionModel, WeightedRegressionEstimator};

// Convenience constructors
pub fn fat_pet_peese() -> FatPetPeese {
    FatPetPeese::new(FatPetPeeseParameters::default())
}

pub fn weighted_regression() -> WeightedRegressionEstimator {
    WeightedRegressionEstimator::new()
}
