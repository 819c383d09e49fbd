//! Single-regression bias-correction estimators
//!
//! Each estimator wraps one [`WeightedRegressionEstimator`] fit and reports its
//! intercept, together with the fitted line for curve plotting.

use crate::wls::{RegressionFit, WeightedRegressionEstimator};
use metabias_core::{BiasCorrectionEstimator, PointEstimate, Result, StudyDataset};
use serde::Serialize;
use tracing::debug;

fn intercept_estimate(fit: &RegressionFit) -> PointEstimate {
    PointEstimate::new(fit.intercept.estimate, Some(fit.intercept.std_error))
        .with_fitted_line(fit.fitted_line())
}

/// Uncorrected fixed-effect meta-analytic mean
#[derive(Debug, Clone, Copy, Default)]
pub struct WlsEstimator {
    regression: WeightedRegressionEstimator,
}

impl WlsEstimator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BiasCorrectionEstimator for WlsEstimator {
    fn name(&self) -> &str {
        "wls"
    }

    fn minimum_sample_size(&self) -> usize {
        2
    }

    fn estimate(&self, dataset: &StudyDataset) -> Result<PointEstimate> {
        self.regression.wls(dataset).map(|fit| intercept_estimate(&fit))
    }
}

/// Precision-effect test estimate: intercept of effect regressed on standard error
#[derive(Debug, Clone, Copy, Default)]
pub struct PetEstimator {
    regression: WeightedRegressionEstimator,
}

impl PetEstimator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BiasCorrectionEstimator for PetEstimator {
    fn name(&self) -> &str {
        "pet"
    }

    fn minimum_sample_size(&self) -> usize {
        3
    }

    fn estimate(&self, dataset: &StudyDataset) -> Result<PointEstimate> {
        self.regression.pet(dataset).map(|fit| intercept_estimate(&fit))
    }
}

/// PEESE estimate: intercept of effect regressed on sampling variance
#[derive(Debug, Clone, Copy, Default)]
pub struct PeeseEstimator {
    regression: WeightedRegressionEstimator,
}

impl PeeseEstimator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BiasCorrectionEstimator for PeeseEstimator {
    fn name(&self) -> &str {
        "peese"
    }

    fn minimum_sample_size(&self) -> usize {
        3
    }

    fn estimate(&self, dataset: &StudyDataset) -> Result<PointEstimate> {
        self.regression.peese(dataset).map(|fit| intercept_estimate(&fit))
    }
}

/// Result of [`PeesePositiveOnly`] with both candidate fits
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeesePositiveDecision {
    pub estimate: PointEstimate,
    /// Whether the PEESE intercept was used
    pub used_peese: bool,
    pub wls: RegressionFit,
    pub peese: RegressionFit,
}

/// PEESE that only trusts a non-negative variance slope
///
/// A negative slope would mean smaller studies report *smaller* effects, which
/// is not the selection pattern PEESE corrects for; the WLS mean is used then.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeesePositiveOnly {
    regression: WeightedRegressionEstimator,
}

impl PeesePositiveOnly {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decide(&self, dataset: &StudyDataset) -> Result<PeesePositiveDecision> {
        let wls = self.regression.wls(dataset)?;
        let peese = self.regression.peese(dataset)?;
        let used_peese = peese.slope_estimate() >= 0.0;
        let estimate = if used_peese {
            intercept_estimate(&peese)
        } else {
            intercept_estimate(&wls)
        };
        debug!(
            study = dataset.name(),
            slope = peese.slope_estimate(),
            used_peese,
            "PEESE positive-slope policy"
        );
        Ok(PeesePositiveDecision {
            estimate,
            used_peese,
            wls,
            peese,
        })
    }
}

impl BiasCorrectionEstimator for PeesePositiveOnly {
    fn name(&self) -> &str {
        "peese_positive"
    }

    fn minimum_sample_size(&self) -> usize {
        3
    }

    fn estimate(&self, dataset: &StudyDataset) -> Result<PointEstimate> {
        self.decide(dataset).map(|decision| decision.estimate)
    }
}
