//! p-curve estimator
//!
//! 1. Keep the positive effects with `|d/se| ≥ z_{1−α/2}`.
//! 2. Evaluate the KS distance of their pp-values to U(0, 1) on an evenly
//!    spaced grid of candidate effects.
//! 3. Refine the grid minimizer with Brent's method inside a window around it.

use crate::uniformity::pp_ks_distance;
use metabias_core::optimize::{minimize_bounded, ScalarOptions};
use metabias_core::{normal, BiasCorrectionEstimator, Error, PointEstimate, Result, StudyDataset};
use serde::Serialize;
use tracing::{debug, instrument};

/// Parameters for [`PCurveEstimator`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PCurveParameters {
    /// Significance level selecting the effects
    pub alpha: f64,
    /// Search interval `(θ_lo, θ_hi)`
    pub interval: (f64, f64),
    /// Number of grid candidates, endpoints included
    pub grid_points: usize,
    /// Half-width of the refinement window around the grid minimizer
    pub search_window: f64,
    pub refinement: ScalarOptions,
}

impl Default for PCurveParameters {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            interval: (0.0, 2.0),
            grid_points: 100,
            search_window: 0.1,
            refinement: ScalarOptions::default(),
        }
    }
}

impl PCurveParameters {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "p-curve alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        let (lo, hi) = self.interval;
        if !(lo.is_finite() && hi.is_finite()) || lo > hi {
            return Err(Error::InvalidParameter(format!(
                "p-curve interval must be finite and ordered, got [{lo}, {hi}]"
            )));
        }
        if self.grid_points < 2 {
            return Err(Error::InvalidParameter(format!(
                "p-curve grid needs at least 2 points, got {}",
                self.grid_points
            )));
        }
        if !(self.search_window > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "p-curve search window must be positive, got {}",
                self.search_window
            )));
        }
        Ok(())
    }

    /// Significance threshold `z_{1−α/2}`
    pub fn z_critical(&self) -> f64 {
        normal::two_sided_critical(self.alpha)
    }

    /// Evenly spaced candidates over the interval
    ///
    /// Empty for `grid_points == 0`; a single point is the upper end.
    pub fn grid(&self) -> Vec<f64> {
        let (lo, hi) = self.interval;
        let step = (hi - lo) / self.grid_points.saturating_sub(1) as f64;
        (0..self.grid_points)
            .map(|i| if i + 1 == self.grid_points { hi } else { lo + step * i as f64 })
            .collect()
    }
}

/// Result of a converged p-curve fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PCurveEstimate {
    /// Refined estimate of the true effect
    pub theta: f64,
    pub ks_distance: f64,
    /// Grid minimizer the refinement started from
    pub grid_theta: f64,
    pub grid_ks_distance: f64,
    /// Number of significant observations used
    pub significant: usize,
    /// Objective evaluations used by the refinement
    pub iterations: usize,
}

/// p-curve estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct PCurveEstimator {
    params: PCurveParameters,
}

impl PCurveEstimator {
    pub fn new(params: PCurveParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PCurveParameters {
        &self.params
    }

    /// The positive, significant `(d, se)` pairs the curve is built from
    pub fn significant_pairs(&self, dataset: &StudyDataset) -> Vec<(f64, f64)> {
        let z = self.params.z_critical();
        dataset
            .observations()
            .iter()
            .filter(|o| o.effect_size() > 0.0 && o.z_score().abs() >= z)
            .map(|o| (o.effect_size(), o.std_error()))
            .collect()
    }

    /// Fit the p-curve to one study
    ///
    /// # Errors
    /// - [`Error::InsufficientSignificantData`] when no effect passes the filter
    /// - [`Error::Convergence`] when the refinement runs out of budget; the
    ///   grid minimizer is attached as the degraded fallback
    #[instrument(skip_all, fields(study = dataset.name()))]
    pub fn fit(&self, dataset: &StudyDataset) -> Result<PCurveEstimate> {
        self.params.validate()?;
        let significant = self.significant_pairs(dataset);
        if significant.is_empty() {
            return Err(Error::InsufficientSignificantData {
                alpha: self.params.alpha,
                total: dataset.len(),
            });
        }

        let z = self.params.z_critical();
        let distance = |theta: f64| pp_ks_distance(theta, &significant, z);

        // Strict comparison keeps the lowest θ among ties
        let (grid_theta, grid_ks_distance) = self
            .params
            .grid()
            .into_iter()
            .map(|theta| (theta, distance(theta)))
            .fold((f64::NAN, f64::INFINITY), |best, candidate| {
                if candidate.1 < best.1 {
                    candidate
                } else {
                    best
                }
            });
        if grid_theta.is_nan() {
            return Err(Error::non_finite("p-curve KS distances"));
        }
        debug!(
            grid_theta,
            grid_ks_distance,
            significant = significant.len(),
            "p-curve grid minimum"
        );

        let (lo, hi) = self.params.interval;
        let window_lo = (grid_theta - self.params.search_window).max(lo);
        let window_hi = (grid_theta + self.params.search_window).min(hi);
        let refined = minimize_bounded(distance, window_lo, window_hi, &self.params.refinement)?;
        if !refined.converged() {
            return Err(Error::not_converged(
                "pcurve",
                refined.iterations,
                format!("refinement around {grid_theta} exhausted its budget"),
            )
            .with_fallback(grid_theta));
        }

        // The KS distance is piecewise smooth; never trade the grid point for a worse one
        let (theta, ks_distance) = if refined.value <= grid_ks_distance {
            (refined.x, refined.value)
        } else {
            (grid_theta, grid_ks_distance)
        };
        debug!(theta, ks_distance, iterations = refined.iterations, "p-curve refined");

        Ok(PCurveEstimate {
            theta,
            ks_distance,
            grid_theta,
            grid_ks_distance,
            significant: significant.len(),
            iterations: refined.iterations,
        })
    }
}

impl BiasCorrectionEstimator for PCurveEstimator {
    fn name(&self) -> &str {
        "pcurve"
    }

    fn minimum_sample_size(&self) -> usize {
        1
    }

    fn estimate(&self, dataset: &StudyDataset) -> Result<PointEstimate> {
        self.fit(dataset).map(|fit| PointEstimate::new(fit.theta, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_grid_endpoints() {
        let params = PCurveParameters {
            interval: (0.0, 1.0),
            grid_points: 101,
            ..Default::default()
        };
        let grid = params.grid();
        assert_eq!(grid.len(), 101);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[100], 1.0);
        assert_relative_eq!(grid[40], 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_grid_sizes() {
        let params = |grid_points| PCurveParameters {
            interval: (0.0, 1.0),
            grid_points,
            ..Default::default()
        };
        assert!(params(0).grid().is_empty());
        assert_eq!(params(1).grid(), vec![1.0]);
        assert_eq!(params(2).grid(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_grid_ties_resolve_to_lowest_theta() {
        // pp-values vanish across the whole interval, so KS = 1 at every candidate
        let data = StudyDataset::from_pairs("flat", &[(5.0, 0.1)]).unwrap();
        let params = PCurveParameters {
            interval: (0.5, 2.0),
            ..Default::default()
        };
        let fit = PCurveEstimator::new(params).fit(&data).unwrap();
        assert_eq!(fit.grid_ks_distance, 1.0);
        assert_eq!(fit.grid_theta, 0.5);
        assert!(fit.theta >= 0.5 && fit.theta <= 0.5 + params.search_window);
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let bad = [
            PCurveParameters { alpha: 0.0, ..Default::default() },
            PCurveParameters { interval: (1.0, 0.0), ..Default::default() },
            PCurveParameters { grid_points: 1, ..Default::default() },
            PCurveParameters { search_window: 0.0, ..Default::default() },
        ];
        for params in bad {
            assert!(matches!(params.validate(), Err(Error::InvalidParameter(_))));
        }
        assert!(PCurveParameters::default().validate().is_ok());
    }

    #[test]
    fn test_filter_drops_negative_and_insignificant() {
        let data = StudyDataset::from_pairs(
            "mixed",
            &[(0.5, 0.1), (-0.5, 0.1), (0.1, 0.1), (0.3, 0.15)],
        )
        .unwrap();
        let pairs = PCurveEstimator::default().significant_pairs(&data);
        assert_eq!(pairs, vec![(0.5, 0.1), (0.3, 0.15)]);
    }

    #[test]
    fn test_no_significant_effects() {
        let data = StudyDataset::from_pairs("null", &[(0.05, 0.1), (-0.3, 0.1)]).unwrap();
        let err = PCurveEstimator::default().fit(&data).unwrap_err();
        assert_eq!(
            err,
            Error::InsufficientSignificantData {
                alpha: 0.05,
                total: 2
            }
        );
    }
}
