//! Likelihood of a step-function publication model
//!
//! Effects are generated as `d ~ N(θ, se² + τ²)` and published with
//! probability 1 when significant (`|d/se| ≥ c`) and `p1` otherwise. The
//! density of a *published* effect is
//!
//! ```text
//! f(d) = w(d) · φ((d − θ)/σ) / σ / E[w],   σ = √(se² + τ²)
//! E[w] = 1 − (1 − p1) · [Φ((c·se − θ)/σ) − Φ((−c·se − θ)/σ)]
//! ```

use metabias_core::normal::{self, Z_975};
use metabias_core::{Observation, StudyDataset};
use std::f64::consts::PI;

/// Index of each parameter in the packed vector
pub const P1: usize = 0;
pub const THETA: usize = 1;
pub const TAU: usize = 2;

/// Negative log-likelihood of one study under the selection model
#[derive(Debug, Clone, Copy)]
pub struct SelectionLikelihood<'a> {
    observations: &'a [Observation],
    threshold: f64,
}

impl<'a> SelectionLikelihood<'a> {
    /// Likelihood with the conventional `z_{0.975}` publication threshold
    pub fn new(dataset: &'a StudyDataset) -> Self {
        Self {
            observations: dataset.observations(),
            threshold: Z_975,
        }
    }

    /// Publication weight of one observation
    fn weight(&self, observation: &Observation, p1: f64) -> f64 {
        if observation.z_score().abs() < self.threshold {
            p1
        } else {
            1.0
        }
    }

    /// Probability that an effect with this standard error gets published
    fn publication_probability(&self, std_error: f64, p1: f64, theta: f64, sigma: f64) -> f64 {
        let upper = (self.threshold * std_error - theta) / sigma;
        let lower = (-self.threshold * std_error - theta) / sigma;
        1.0 - (1.0 - p1) * (normal::cdf(upper) - normal::cdf(lower))
    }

    /// `−ln L(p1, θ, τ)`
    ///
    /// Returns +∞ where the likelihood is zero (for example `p1 = 0` with an
    /// insignificant observation).
    pub fn negative_log_likelihood(&self, p1: f64, theta: f64, tau: f64) -> f64 {
        let ln_sqrt_2pi = 0.5 * (2.0 * PI).ln();
        let mut total = 0.0;
        for observation in self.observations {
            let se = observation.std_error();
            let sigma = (observation.variance() + tau * tau).sqrt();
            let x = (observation.effect_size() - theta) / sigma;
            let ln_density = -0.5 * x * x - ln_sqrt_2pi - sigma.ln();
            let ln_weight = self.weight(observation, p1).ln();
            let ln_published = self.publication_probability(se, p1, theta, sigma).ln();
            total += ln_weight + ln_density - ln_published;
        }
        -total
    }

    /// Objective over the packed `[p1, θ, τ]` vector used by the optimizer
    pub fn objective(&self, params: &[f64]) -> f64 {
        self.negative_log_likelihood(params[P1], params[THETA], params[TAU])
    }
}
