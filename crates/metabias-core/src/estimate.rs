//! Estimator output types

use crate::normal;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Function of the standard error used as a regression predictor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predictor {
    /// `se` itself (PET / FAT)
    StandardError,
    /// `se²` (PEESE)
    Variance,
}

impl Predictor {
    /// Apply the predictor to a standard error
    pub fn apply(&self, std_error: f64) -> f64 {
        match self {
            Self::StandardError => std_error,
            Self::Variance => std_error * std_error,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::StandardError => "standard error",
            Self::Variance => "variance",
        }
    }
}

/// Fitted line `effect = intercept + slope · predictor(se)`
///
/// Exposed so that a corrected funnel curve can be drawn outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FittedLine {
    pub intercept: f64,
    pub slope: f64,
    pub predictor: Predictor,
}

impl FittedLine {
    /// Predicted effect at one standard error
    pub fn predict(&self, std_error: f64) -> f64 {
        self.intercept + self.slope * self.predictor.apply(std_error)
    }

    /// Predicted effects over a grid of standard errors
    pub fn curve(&self, std_errors: &[f64]) -> Vec<f64> {
        std_errors.iter().map(|&se| self.predict(se)).collect()
    }
}

/// A bias-corrected point estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointEstimate {
    pub value: f64,
    /// Absent for estimators that do not produce one (p-curve, selection model)
    pub std_error: Option<f64>,
    pub fitted_line: Option<FittedLine>,
}

impl PointEstimate {
    pub fn new(value: f64, std_error: Option<f64>) -> Self {
        Self {
            value,
            std_error,
            fitted_line: None,
        }
    }

    pub fn with_fitted_line(mut self, line: FittedLine) -> Self {
        self.fitted_line = Some(line);
        self
    }

    /// Normal-theory confidence interval `value ± z · se`
    ///
    /// Fails when the estimate has no standard error.
    pub fn confidence_interval(&self, level: f64) -> Result<(f64, f64)> {
        let se = self.std_error.ok_or_else(|| {
            Error::InvalidInput("estimate has no standard error".to_string())
        })?;
        if !(level > 0.0 && level < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "confidence level {level} must be in (0, 1)"
            )));
        }
        let z = normal::two_sided_critical(1.0 - level);
        Ok((self.value - z * se, self.value + z * se))
    }
}

impl fmt::Display for PointEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.std_error {
            Some(se) => write!(f, "{:.4} (se {:.4})", self.value, se),
            None => write!(f, "{:.4}", self.value),
        }
    }
}
