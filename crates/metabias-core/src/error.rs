//! Error types for publication-bias estimation
//!
//! Provides a unified error type for all metabias crates. Estimator failures
//! are local to a single (study, method) pair; only [`Error::MissingGroundTruth`]
//! is meant to abort a whole batch.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Core error type for bias-correction estimators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Too few observations for the requested fit
    #[error("Insufficient data: expected at least {expected} observations, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// The predictor column has no variation, so the design matrix is singular
    #[error("Singular design: {0}")]
    SingularDesign(String),

    /// The p-curve significance filter removed every observation
    #[error("No significant positive observations (alpha = {alpha}, {total} observations)")]
    InsufficientSignificantData { alpha: f64, total: usize },

    /// An iterative optimizer ran out of budget before meeting its tolerance
    #[error("{method} did not converge after {iterations} iterations: {reason}")]
    Convergence {
        method: String,
        iterations: usize,
        reason: String,
        /// Best value reached before giving up. Never a converged result.
        fallback: Option<f64>,
    },

    /// A standard error of zero, or a negative one
    #[error("Zero variance: observation {index} has standard error {std_error}")]
    ZeroVariance { index: usize, std_error: f64 },

    /// A study in the batch has no ground-truth record to score against
    #[error("No ground-truth record for study '{0}'")]
    MissingGroundTruth(String),

    /// Invalid parameter provided to a function
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Numerical computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Data-free tag for an [`Error`], used when recording failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InsufficientData,
    SingularDesign,
    InsufficientSignificantData,
    Convergence,
    ZeroVariance,
    MissingGroundTruth,
    InvalidParameter,
    InvalidInput,
    Computation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InsufficientData => "insufficient data",
            Self::SingularDesign => "singular design",
            Self::InsufficientSignificantData => "insufficient significant data",
            Self::Convergence => "convergence",
            Self::ZeroVariance => "zero variance",
            Self::MissingGroundTruth => "missing ground truth",
            Self::InvalidParameter => "invalid parameter",
            Self::InvalidInput => "invalid input",
            Self::Computation => "computation",
        };
        write!(f, "{}", s)
    }
}

impl Error {
    /// Tag of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientData { .. } => ErrorKind::InsufficientData,
            Self::SingularDesign(_) => ErrorKind::SingularDesign,
            Self::InsufficientSignificantData { .. } => ErrorKind::InsufficientSignificantData,
            Self::Convergence { .. } => ErrorKind::Convergence,
            Self::ZeroVariance { .. } => ErrorKind::ZeroVariance,
            Self::MissingGroundTruth(_) => ErrorKind::MissingGroundTruth,
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Computation(_) => ErrorKind::Computation,
        }
    }

    /// Degraded fallback value carried by a convergence failure, if any
    pub fn degraded_fallback(&self) -> Option<f64> {
        match self {
            Self::Convergence { fallback, .. } => *fallback,
            _ => None,
        }
    }

    /// Create an error for a sample below the minimum size
    pub fn insufficient(expected: usize, actual: usize) -> Self {
        Self::InsufficientData { expected, actual }
    }

    /// Create a convergence error for an optimizer that exhausted its budget
    pub fn not_converged(method: &str, iterations: usize, reason: impl Into<String>) -> Self {
        Self::Convergence {
            method: method.to_string(),
            iterations,
            reason: reason.into(),
            fallback: None,
        }
    }

    /// Attach a degraded fallback value to a convergence error
    ///
    /// Other variants are returned unchanged.
    pub fn with_fallback(self, value: f64) -> Self {
        match self {
            Self::Convergence {
                method,
                iterations,
                reason,
                ..
            } => Self::Convergence {
                method,
                iterations,
                reason,
                fallback: Some(value),
            },
            other => other,
        }
    }

    /// Create an error for NaN/Inf values
    pub fn non_finite(context: &str) -> Self {
        Self::Computation(format!("{context} contains NaN or infinite values"))
    }
}
