//! Records and reports produced by a harness run

use metabias_core::{Error, ErrorKind, PointEstimate};
use serde::Serialize;
use std::fmt;

/// One successful (study, method) estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateRecord {
    pub study: String,
    pub method: String,
    pub estimate: PointEstimate,
    /// `estimate − replication_effect`
    pub bias: f64,
}

/// One failed (study, method) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateFailure {
    pub study: String,
    pub method: String,
    pub kind: ErrorKind,
    pub message: String,
    /// Best value the method reached before failing, when it had one
    pub degraded_fallback: Option<f64>,
}

impl EstimateFailure {
    pub fn from_error(study: &str, method: &str, error: &Error) -> Self {
        Self {
            study: study.to_string(),
            method: method.to_string(),
            kind: error.kind(),
            message: error.to_string(),
            degraded_fallback: error.degraded_fallback(),
        }
    }
}

/// Study left out of a method's summary, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    pub study: String,
    pub kind: ErrorKind,
}

/// Aggregate error of one method against the replication effects
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorMetrics {
    pub mean_bias: f64,
    pub mean_absolute_deviation: f64,
    pub root_mean_square_error: f64,
}

impl ErrorMetrics {
    /// Metrics over a set of biases; `None` when there are none
    pub fn from_biases(biases: &[f64]) -> Option<Self> {
        if biases.is_empty() {
            return None;
        }
        let n = biases.len() as f64;
        let mean_bias = biases.iter().sum::<f64>() / n;
        let mean_absolute_deviation = biases.iter().map(|b| b.abs()).sum::<f64>() / n;
        let root_mean_square_error = (biases.iter().map(|b| b * b).sum::<f64>() / n).sqrt();
        Some(Self {
            mean_bias,
            mean_absolute_deviation,
            root_mean_square_error,
        })
    }
}

/// Per-method summary over the whole batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub method: String,
    /// Studies that contributed to the metrics
    pub evaluated: usize,
    pub excluded: Vec<Exclusion>,
    /// Absent when every study failed
    pub metrics: Option<ErrorMetrics>,
}

impl fmt::Display for PerformanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.metrics {
            Some(m) => write!(
                f,
                "{}: bias {:+.4}, MAD {:.4}, RMSE {:.4} over {} studies ({} excluded)",
                self.method,
                m.mean_bias,
                m.mean_absolute_deviation,
                m.root_mean_square_error,
                self.evaluated,
                self.excluded.len()
            ),
            None => write!(
                f,
                "{}: no successful estimates ({} excluded)",
                self.method,
                self.excluded.len()
            ),
        }
    }
}

/// Everything a harness run produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// Ordered by study, then by method registration order
    pub records: Vec<EstimateRecord>,
    pub failures: Vec<EstimateFailure>,
    /// One per method, in registration order
    pub summaries: Vec<PerformanceSummary>,
}

impl BatchReport {
    pub fn summary(&self, method: &str) -> Option<&PerformanceSummary> {
        self.summaries.iter().find(|s| s.method == method)
    }

    pub fn record(&self, study: &str, method: &str) -> Option<&EstimateRecord> {
        self.records
            .iter()
            .find(|r| r.study == study && r.method == method)
    }

    pub fn records_for<'a>(
        &'a self,
        method: &'a str,
    ) -> impl Iterator<Item = &'a EstimateRecord> + 'a {
        self.records.iter().filter(move |r| r.method == method)
    }

    pub fn failure(&self, study: &str, method: &str) -> Option<&EstimateFailure> {
        self.failures
            .iter()
            .find(|f| f.study == study && f.method == method)
    }
}
