//! FAT-PET-PEESE conditional estimator
//!
//! A three-stage testing procedure over weighted meta-regressions:
//!
//! 1. **FAT**: regress effect on standard error and test the slope. No
//!    funnel asymmetry means the plain WLS mean is kept.
//! 2. **PET**: test the intercept of the same regression. No genuine effect
//!    means the corrected estimate is zero.
//! 3. **PEESE**: otherwise take the intercept of the regression on variance.
//!
//! The stages are an explicit [`DecisionState`] machine. Transitions depend
//! only on the two test outcomes, so the path through the procedure can be
//! checked without any numeric fitting. A negative FAT slope can optionally
//! override the outcome and fall back to WLS.

use crate::wls::{RegressionFit, WeightedRegressionEstimator};
use metabias_core::{
    BiasCorrectionEstimator, Error, PointEstimate, Result, Sidedness, StudyDataset, ZTest,
};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Parameters for the FAT-PET-PEESE procedure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FatPetPeeseParameters {
    /// Test of the effect-on-standard-error slope
    pub fat: ZTest,
    /// Test of the effect-on-standard-error intercept
    pub pet: ZTest,
    /// Return the WLS estimate whenever the FAT slope is negative
    pub fallback_on_negative_slope: bool,
}

impl Default for FatPetPeeseParameters {
    fn default() -> Self {
        Self {
            fat: ZTest::new(0.10, Sidedness::OneSided),
            pet: ZTest::new(0.05, Sidedness::TwoSided),
            fallback_on_negative_slope: true,
        }
    }
}

/// Which fit supplied the final estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EstimateSource {
    /// FAT not rejected: intercept-only WLS
    Wls,
    /// PET not rejected: effect set to zero
    PetNull,
    /// Both tests rejected: PEESE intercept
    Peese,
    /// Negative FAT slope overrode the procedure: intercept-only WLS
    NegativeSlopeFallback,
}

impl fmt::Display for EstimateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Wls => "WLS",
            Self::PetNull => "PET (null)",
            Self::Peese => "PEESE",
            Self::NegativeSlopeFallback => "WLS (negative slope)",
        };
        write!(f, "{}", s)
    }
}

/// State of the decision procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DecisionState {
    Start,
    FatRejected,
    PetRejected,
    Done(EstimateSource),
}

/// Outcomes of the two hypothesis tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestOutcomes {
    pub fat_rejected: bool,
    pub pet_rejected: bool,
}

impl DecisionState {
    /// Advance one stage
    pub fn next(self, outcomes: TestOutcomes) -> Self {
        match self {
            Self::Start if outcomes.fat_rejected => Self::FatRejected,
            Self::Start => Self::Done(EstimateSource::Wls),
            Self::FatRejected if outcomes.pet_rejected => Self::PetRejected,
            Self::FatRejected => Self::Done(EstimateSource::PetNull),
            Self::PetRejected => Self::Done(EstimateSource::Peese),
            done @ Self::Done(_) => done,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Run the machine from `Start` to `Done`, returning every visited state
    pub fn run(outcomes: TestOutcomes) -> Vec<Self> {
        let mut trace = vec![Self::Start];
        let mut state = Self::Start;
        while !state.is_done() {
            state = state.next(outcomes);
            trace.push(state);
        }
        trace
    }
}

/// Apply the negative-slope override to a finished decision
pub fn apply_slope_override(
    source: EstimateSource,
    fat_slope: f64,
    enabled: bool,
) -> EstimateSource {
    if enabled && fat_slope < 0.0 {
        EstimateSource::NegativeSlopeFallback
    } else {
        source
    }
}

/// Outcome of the procedure for one study, with every component fit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FatPetPeeseDecision {
    pub estimate: PointEstimate,
    pub source: EstimateSource,
    /// States visited before the override was applied
    pub trace: Vec<DecisionState>,
    pub wls: RegressionFit,
    /// Regression of effect on standard error
    pub fat_pet: RegressionFit,
    /// Regression of effect on variance
    pub peese: RegressionFit,
}

/// FAT-PET-PEESE estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct FatPetPeese {
    params: FatPetPeeseParameters,
    regression: WeightedRegressionEstimator,
}

impl FatPetPeese {
    pub fn new(params: FatPetPeeseParameters) -> Self {
        Self {
            params,
            regression: WeightedRegressionEstimator::new(),
        }
    }

    pub fn params(&self) -> &FatPetPeeseParameters {
        &self.params
    }

    /// Run the full procedure on one study
    pub fn decide(&self, dataset: &StudyDataset) -> Result<FatPetPeeseDecision> {
        let wls = self.regression.wls(dataset)?;
        let fat_pet = self.regression.pet(dataset)?;
        let peese = self.regression.peese(dataset)?;

        let slope = fat_pet.slope.ok_or_else(|| {
            Error::Computation("FAT regression returned no slope".to_string())
        })?;
        let outcomes = TestOutcomes {
            fat_rejected: self.params.fat.rejects(slope.estimate, slope.std_error),
            pet_rejected: self
                .params
                .pet
                .rejects(fat_pet.intercept.estimate, fat_pet.intercept.std_error),
        };

        let trace = DecisionState::run(outcomes);
        let reached = match trace.last() {
            Some(DecisionState::Done(source)) => *source,
            _ => EstimateSource::Wls,
        };
        let source = apply_slope_override(
            reached,
            slope.estimate,
            self.params.fallback_on_negative_slope,
        );

        let estimate = match source {
            EstimateSource::Wls | EstimateSource::NegativeSlopeFallback => {
                PointEstimate::new(wls.intercept.estimate, Some(wls.intercept.std_error))
                    .with_fitted_line(wls.fitted_line())
            }
            EstimateSource::PetNull => PointEstimate::new(0.0, Some(fat_pet.intercept.std_error))
                .with_fitted_line(fat_pet.fitted_line()),
            EstimateSource::Peese => {
                PointEstimate::new(peese.intercept.estimate, Some(peese.intercept.std_error))
                    .with_fitted_line(peese.fitted_line())
            }
        };

        debug!(
            study = dataset.name(),
            fat_z = slope.z(),
            pet_z = fat_pet.intercept.z(),
            ?reached,
            %source,
            estimate = estimate.value,
            "FAT-PET-PEESE decision"
        );

        Ok(FatPetPeeseDecision {
            estimate,
            source,
            trace,
            wls,
            fat_pet,
            peese,
        })
    }
}

impl BiasCorrectionEstimator for FatPetPeese {
    fn name(&self) -> &str {
        "fat_pet_peese"
    }

    fn minimum_sample_size(&self) -> usize {
        3
    }

    fn estimate(&self, dataset: &StudyDataset) -> Result<PointEstimate> {
        self.decide(dataset).map(|decision| decision.estimate)
    }
}
