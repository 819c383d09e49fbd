//! # metabias
//!
//! Publication-bias correction for meta-analyses, benchmarked against
//! replication results.
//!
//! This umbrella crate re-exports the workspace:
//!
//! - [`core`]: study data model, errors, normal helpers and optimizers
//! - [`regression`]: WLS, PET, PEESE and the FAT-PET-PEESE procedure
//! - [`pcurve`]: p-curve estimation from significant findings
//! - [`selection`]: step-function selection model by maximum likelihood
//! - [`harness`]: batch evaluation against replication ground truth
//!
//! # Example
//!
//! ```rust
//! use metabias::prelude::*;
//!
//! let study = StudyDataset::from_pairs(
//!     "example",
//!     &[(0.10, 0.05), (0.20, 0.10), (0.15, 0.08), (0.30, 0.15), (0.25, 0.12)],
//! ).unwrap();
//!
//! let wls = WlsEstimator::new().estimate(&study).unwrap();
//! let corrected = FatPetPeese::default().decide(&study).unwrap();
//! println!("WLS {wls}, corrected {} via {}", corrected.estimate, corrected.source);
//! ```

pub use metabias_core as core;
pub use metabias_harness as harness;
pub use metabias_pcurve as pcurve;
pub use metabias_regression as regression;
pub use metabias_selection as selection;

/// Commonly used types from every crate
pub mod prelude {
    pub use metabias_core::prelude::*;
    pub use metabias_harness::{
        BatchReport, BiasEvaluationHarness, EstimatorConfig, EstimatorSet, HarnessOptions,
        PerformanceSummary,
    };
    pub use metabias_pcurve::{PCurveEstimator, PCurveParameters};
    pub use metabias_regression::{
        FatPetPeese, FatPetPeeseParameters, PeeseEstimator, PeesePositiveOnly, PetEstimator,
        WlsEstimator,
    };
    pub use metabias_selection::{SelectionModelEstimator, SelectionModelParameters};
}
