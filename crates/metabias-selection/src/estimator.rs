//! Maximum-likelihood fit of the selection model

use crate::likelihood::{SelectionLikelihood, P1, TAU, THETA};
use metabias_core::optimize::minimize_box;
use metabias_core::{
    BiasCorrectionEstimator, Bounds, BoxOptions, Error, PointEstimate, Result, StudyDataset,
};
use serde::Serialize;
use tracing::{debug, instrument};

const NAMES: [&str; 3] = ["p1", "theta", "tau"];

/// Parameters for [`SelectionModelEstimator`]
///
/// Coordinates are ordered `[p1, θ, τ]`. A coordinate whose bounds coincide is
/// held at that value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionModelParameters {
    pub bounds: [Bounds; 3],
    pub start: [f64; 3],
    pub options: BoxOptions,
}

impl Default for SelectionModelParameters {
    fn default() -> Self {
        Self {
            bounds: [Bounds::new(0.0, 1.0), Bounds::unbounded(), Bounds::fixed(0.0)],
            start: [0.5, 1.0, 0.0],
            options: BoxOptions::default(),
        }
    }
}

impl SelectionModelParameters {
    /// Let `τ` range over `[0, ∞)`
    pub fn with_heterogeneity(mut self) -> Self {
        self.bounds[TAU] = Bounds::new(0.0, f64::INFINITY);
        self
    }

    pub fn validate(&self) -> Result<()> {
        for ((bounds, &start), name) in self.bounds.iter().zip(&self.start).zip(NAMES) {
            bounds.validate(name)?;
            if !bounds.contains(start) {
                return Err(Error::InvalidParameter(format!(
                    "start value {start} for {name} lies outside [{}, {}]",
                    bounds.lower, bounds.upper
                )));
            }
        }
        let p1 = self.bounds[P1];
        if p1.lower < 0.0 || p1.upper > 1.0 {
            return Err(Error::InvalidParameter(format!(
                "p1 is a probability, bounds [{}, {}] leave [0, 1]",
                p1.lower, p1.upper
            )));
        }
        if self.bounds[TAU].lower < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "tau is a standard deviation, lower bound {} is negative",
                self.bounds[TAU].lower
            )));
        }
        Ok(())
    }
}

/// Maximum-likelihood estimates of the selection model
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelectionModelEstimate {
    /// Relative publication probability of insignificant effects
    pub p1: f64,
    /// Bias-corrected effect
    pub theta: f64,
    /// Between-observation heterogeneity
    pub tau: f64,
    pub neg_log_likelihood: f64,
    pub iterations: usize,
}

/// Andrews–Kasy style selection-model estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionModelEstimator {
    params: SelectionModelParameters,
}

impl SelectionModelEstimator {
    pub fn new(params: SelectionModelParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SelectionModelParameters {
        &self.params
    }

    /// Fit the model to one study
    ///
    /// # Errors
    /// - [`Error::InsufficientData`] below 3 observations
    /// - [`Error::Convergence`] when the optimizer runs out of budget
    #[instrument(skip_all, fields(study = dataset.name()))]
    pub fn fit(&self, dataset: &StudyDataset) -> Result<SelectionModelEstimate> {
        self.params.validate()?;
        dataset.require(3)?;

        let likelihood = SelectionLikelihood::new(dataset);
        let minimum = minimize_box(
            |x| likelihood.objective(x),
            &self.params.start,
            &self.params.bounds,
            &self.params.options,
        )?;
        if !minimum.converged() {
            return Err(Error::not_converged(
                "selection_model",
                minimum.iterations,
                format!(
                    "likelihood search stopped at NLL {:.6} without meeting tolerance",
                    minimum.value
                ),
            ));
        }
        if !minimum.value.is_finite() {
            return Err(Error::Computation(format!(
                "selection-model likelihood is zero everywhere searched for {}",
                dataset.name()
            )));
        }

        let estimate = SelectionModelEstimate {
            p1: minimum.x[P1],
            theta: minimum.x[THETA],
            tau: minimum.x[TAU],
            neg_log_likelihood: minimum.value,
            iterations: minimum.iterations,
        };
        debug!(
            p1 = estimate.p1,
            theta = estimate.theta,
            tau = estimate.tau,
            nll = estimate.neg_log_likelihood,
            iterations = estimate.iterations,
            "selection model fitted"
        );
        Ok(estimate)
    }
}

impl BiasCorrectionEstimator for SelectionModelEstimator {
    fn name(&self) -> &str {
        "selection_model"
    }

    fn minimum_sample_size(&self) -> usize {
        3
    }

    fn estimate(&self, dataset: &StudyDataset) -> Result<PointEstimate> {
        self.fit(dataset).map(|fit| PointEstimate::new(fit.theta, None))
    }
}
