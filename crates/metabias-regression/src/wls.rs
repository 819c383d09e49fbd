//! Weighted least squares meta-regression
//!
//! Fits `effect = a + b · predictor(se)` with the dataset's normalized
//! inverse-variance weights, solving the weighted normal equations
//! `XᵀWX β = XᵀWy` by Cholesky decomposition.
//!
//! Standard errors use the estimated residual scale,
//! `Cov(β) = σ̂² (XᵀWX)⁻¹` with `σ̂² = Σ wᵢ rᵢ² / (n − p)`, which makes them
//! independent of how the weights are normalized.

use metabias_core::{Error, FittedLine, Predictor, Result, StudyDataset};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use tracing::debug;

/// Which regression to fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegressionModel {
    /// `effect ~ a`: the plain WLS meta-analytic mean
    InterceptOnly,
    /// `effect ~ a + b · predictor(se)`
    OnPredictor(Predictor),
}

impl RegressionModel {
    /// Number of fitted coefficients
    pub fn parameters(&self) -> usize {
        match self {
            Self::InterceptOnly => 1,
            Self::OnPredictor(_) => 2,
        }
    }

    pub fn predictor(&self) -> Option<Predictor> {
        match self {
            Self::InterceptOnly => None,
            Self::OnPredictor(p) => Some(*p),
        }
    }

    /// Observations needed for at least one residual degree of freedom
    pub fn minimum_observations(&self) -> usize {
        self.parameters() + 1
    }
}

/// A fitted coefficient with its standard error
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coefficient {
    pub estimate: f64,
    pub std_error: f64,
}

impl Coefficient {
    /// Wald statistic `estimate / std_error`
    pub fn z(&self) -> f64 {
        self.estimate / self.std_error
    }
}

/// Result of a weighted regression fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionFit {
    pub model: RegressionModel,
    pub intercept: Coefficient,
    /// Absent for [`RegressionModel::InterceptOnly`]
    pub slope: Option<Coefficient>,
    /// Weighted residual variance `σ̂²`
    pub residual_variance: f64,
    pub degrees_of_freedom: usize,
}

impl RegressionFit {
    /// `(intercept, intercept_se, slope, slope_se)`; the slope entries are
    /// `None` for an intercept-only fit
    pub fn coefficients(&self) -> (f64, f64, Option<f64>, Option<f64>) {
        (
            self.intercept.estimate,
            self.intercept.std_error,
            self.slope.map(|s| s.estimate),
            self.slope.map(|s| s.std_error),
        )
    }

    /// Slope estimate, or 0 for an intercept-only fit
    pub fn slope_estimate(&self) -> f64 {
        self.slope.map_or(0.0, |s| s.estimate)
    }

    /// Line usable for curve plotting; flat for an intercept-only fit
    pub fn fitted_line(&self) -> FittedLine {
        FittedLine {
            intercept: self.intercept.estimate,
            slope: self.slope_estimate(),
            predictor: self.model.predictor().unwrap_or(Predictor::StandardError),
        }
    }
}

/// Weighted least squares estimator over a [`StudyDataset`]
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedRegressionEstimator;

impl WeightedRegressionEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Fit `model` to the dataset
    ///
    /// # Errors
    /// - [`Error::InsufficientData`] below 2 observations, or below 3 for a
    ///   predictor fit (one residual degree of freedom is needed for the SEs)
    /// - [`Error::SingularDesign`] when the predictor does not vary
    pub fn fit(&self, dataset: &StudyDataset, model: RegressionModel) -> Result<RegressionFit> {
        dataset.require(2)?;
        dataset.require(model.minimum_observations())?;

        let n = dataset.len();
        let p = model.parameters();
        let predictor_values: Vec<f64> = match model.predictor() {
            Some(predictor) => dataset.std_errors().map(|se| predictor.apply(se)).collect(),
            None => Vec::new(),
        };
        if let Some(predictor) = model.predictor() {
            check_predictor_varies(&predictor_values, predictor)?;
        }

        let design = DMatrix::from_fn(n, p, |i, j| if j == 0 { 1.0 } else { predictor_values[i] });
        let y = DVector::from_iterator(n, dataset.effect_sizes());
        let w = DVector::from_column_slice(dataset.weights());

        // XᵀW = (WX)ᵀ
        let weighted = DMatrix::from_fn(n, p, |i, j| w[i] * design[(i, j)]);
        let xtwx = weighted.transpose() * &design;
        let xtwy = weighted.transpose() * &y;

        let chol = xtwx.cholesky().ok_or_else(|| {
            Error::SingularDesign(format!(
                "weighted normal equations for {} are not positive definite",
                dataset.name()
            ))
        })?;
        let beta = chol.solve(&xtwy);
        let inverse = chol.inverse();

        let residuals = &y - &design * &beta;
        let degrees_of_freedom = n - p;
        let weighted_rss: f64 = residuals
            .iter()
            .zip(w.iter())
            .map(|(r, wi)| wi * r * r)
            .sum();
        let residual_variance = weighted_rss / degrees_of_freedom as f64;

        if !beta.iter().all(|b| b.is_finite()) {
            return Err(Error::non_finite("regression coefficients"));
        }

        let coefficient = |k: usize| Coefficient {
            estimate: beta[k],
            std_error: (residual_variance * inverse[(k, k)]).sqrt(),
        };
        let fit = RegressionFit {
            model,
            intercept: coefficient(0),
            slope: (p == 2).then(|| coefficient(1)),
            residual_variance,
            degrees_of_freedom,
        };

        debug!(
            study = dataset.name(),
            ?model,
            intercept = fit.intercept.estimate,
            slope = fit.slope_estimate(),
            "weighted regression fitted"
        );
        Ok(fit)
    }

    /// Intercept-only WLS fit
    pub fn wls(&self, dataset: &StudyDataset) -> Result<RegressionFit> {
        self.fit(dataset, RegressionModel::InterceptOnly)
    }

    /// Regression of effect on standard error (FAT slope, PET intercept)
    pub fn pet(&self, dataset: &StudyDataset) -> Result<RegressionFit> {
        self.fit(dataset, RegressionModel::OnPredictor(Predictor::StandardError))
    }

    /// Regression of effect on sampling variance
    pub fn peese(&self, dataset: &StudyDataset) -> Result<RegressionFit> {
        self.fit(dataset, RegressionModel::OnPredictor(Predictor::Variance))
    }
}

fn check_predictor_varies(values: &[f64], predictor: Predictor) -> Result<()> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let scale = min.abs().max(max.abs()).max(f64::MIN_POSITIVE);
    if (max - min) <= 1e-12 * scale {
        return Err(Error::SingularDesign(format!(
            "{} is identical across all {} observations",
            predictor.name(),
            values.len()
        )));
    }
    Ok(())
}
