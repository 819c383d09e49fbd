//! Structured estimator configuration
//!
//! [`EstimatorConfig`] is the single immutable value from which every
//! estimator's parameters are derived. It deserializes from JSON; any field
//! left out takes its default, and an unbounded side of an interval is
//! written `null`:
//!
//! ```json
//! {
//!   "fat_alpha": 0.10, "fat_one_sided": true,
//!   "pet_alpha": 0.05, "pet_one_sided": false,
//!   "fallback_on_negative_slope": true,
//!   "pcurve_alpha": 0.05, "pcurve_grid_points": 100, "pcurve_search_window": 0.1,
//!   "selmodel_bounds": {"p1": [0, 1], "theta": [null, null], "tau": [0, 0]},
//!   "selmodel_start": [0.5, 1, 0]
//! }
//! ```

use metabias_core::{Bounds, BoxOptions, Budget, Error, Result, ScalarOptions, Sidedness, ZTest};
use metabias_pcurve::PCurveParameters;
use metabias_regression::FatPetPeeseParameters;
use metabias_selection::SelectionModelParameters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Box bounds for the selection-model parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionBounds {
    pub p1: Bounds,
    pub theta: Bounds,
    pub tau: Bounds,
}

impl Default for SelectionBounds {
    fn default() -> Self {
        Self {
            p1: Bounds::new(0.0, 1.0),
            theta: Bounds::unbounded(),
            tau: Bounds::fixed(0.0),
        }
    }
}

/// Options for every estimator in a harness run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimatorConfig {
    pub fat_alpha: f64,
    pub fat_one_sided: bool,
    pub pet_alpha: f64,
    pub pet_one_sided: bool,
    pub fallback_on_negative_slope: bool,

    pub pcurve_alpha: f64,
    pub pcurve_grid_points: usize,
    pub pcurve_search_window: f64,
    pub pcurve_interval: [f64; 2],
    pub pcurve_max_iterations: usize,
    pub pcurve_tolerance: f64,

    pub selmodel_bounds: SelectionBounds,
    pub selmodel_start: [f64; 3],
    pub selmodel_tolerance: f64,
    pub selmodel_max_iterations: usize,

    /// Wall-clock limit for each optimizer run, in milliseconds
    pub time_budget_ms: Option<u64>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            fat_alpha: 0.10,
            fat_one_sided: true,
            pet_alpha: 0.05,
            pet_one_sided: false,
            fallback_on_negative_slope: true,
            pcurve_alpha: 0.05,
            pcurve_grid_points: 100,
            pcurve_search_window: 0.1,
            pcurve_interval: [0.0, 2.0],
            pcurve_max_iterations: 500,
            pcurve_tolerance: 1e-5,
            selmodel_bounds: SelectionBounds::default(),
            selmodel_start: [0.5, 1.0, 0.0],
            selmodel_tolerance: 1e-8,
            selmodel_max_iterations: 2000,
            time_budget_ms: None,
        }
    }
}

impl EstimatorConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::InvalidInput(format!("invalid estimator configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Computation(format!("cannot serialize configuration: {e}")))
    }

    /// Check every option; the per-estimator parameters are checked as built
    pub fn validate(&self) -> Result<()> {
        for (name, alpha) in [
            ("fat_alpha", self.fat_alpha),
            ("pet_alpha", self.pet_alpha),
            ("pcurve_alpha", self.pcurve_alpha),
        ] {
            check_unit_interval(name, alpha)?;
        }
        for (name, tolerance) in [
            ("pcurve_tolerance", self.pcurve_tolerance),
            ("selmodel_tolerance", self.selmodel_tolerance),
        ] {
            if !(tolerance > 0.0) {
                return Err(Error::InvalidParameter(format!(
                    "{name} must be positive, got {tolerance}"
                )));
            }
        }
        for (name, iterations) in [
            ("pcurve_max_iterations", self.pcurve_max_iterations),
            ("selmodel_max_iterations", self.selmodel_max_iterations),
        ] {
            if iterations == 0 {
                return Err(Error::InvalidParameter(format!("{name} must be at least 1")));
            }
        }
        self.pcurve_parameters().validate()?;
        self.selection_parameters().validate()
    }

    /// Per-run optimizer time limit
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_ms.map(Duration::from_millis)
    }

    fn budget(&self, max_iterations: usize) -> Budget {
        let budget = Budget::iterations(max_iterations);
        match self.time_budget() {
            Some(limit) => budget.with_duration(limit),
            None => budget,
        }
    }

    pub fn fat_pet_peese_parameters(&self) -> FatPetPeeseParameters {
        FatPetPeeseParameters {
            fat: ZTest::new(self.fat_alpha, Sidedness::from_one_sided(self.fat_one_sided)),
            pet: ZTest::new(self.pet_alpha, Sidedness::from_one_sided(self.pet_one_sided)),
            fallback_on_negative_slope: self.fallback_on_negative_slope,
        }
    }

    pub fn pcurve_parameters(&self) -> PCurveParameters {
        let [lo, hi] = self.pcurve_interval;
        PCurveParameters {
            alpha: self.pcurve_alpha,
            interval: (lo, hi),
            grid_points: self.pcurve_grid_points,
            search_window: self.pcurve_search_window,
            refinement: ScalarOptions {
                x_tolerance: self.pcurve_tolerance,
                budget: self.budget(self.pcurve_max_iterations),
            },
        }
    }

    pub fn selection_parameters(&self) -> SelectionModelParameters {
        let bounds = self.selmodel_bounds;
        SelectionModelParameters {
            bounds: [bounds.p1, bounds.theta, bounds.tau],
            start: self.selmodel_start,
            options: BoxOptions {
                x_tolerance: self.selmodel_tolerance,
                f_tolerance: self.selmodel_tolerance,
                budget: self.budget(self.selmodel_max_iterations),
            },
        }
    }
}

fn check_unit_interval(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "{name} must be in (0, 1), got {value}"
        )))
    }
}
