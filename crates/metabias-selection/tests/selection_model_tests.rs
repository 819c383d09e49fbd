//! Selection-model fits on simulated publication processes

use metabias_core::optimize::Budget;
use metabias_core::{BiasCorrectionEstimator, Bounds, BoxOptions, ErrorKind, StudyDataset};
use metabias_selection::{
    SelectionLikelihood, SelectionModelEstimator, SelectionModelParameters, P1, TAU,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal, Uniform};

const TRUE_THETA: f64 = 0.2;
const TRUE_P1: f64 = 0.3;

/// Effects drawn around `theta` with spread `tau`; insignificant ones are kept
/// with probability `p1`
fn simulate(seed: u64, published: usize, theta: f64, tau: f64, p1: f64) -> StudyDataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let se_dist = Uniform::new(0.05, 0.3);
    let mut pairs = Vec::with_capacity(published);
    while pairs.len() < published {
        let se: f64 = se_dist.sample(&mut rng);
        let sigma = (se * se + tau * tau).sqrt();
        let d = Normal::new(theta, sigma).unwrap().sample(&mut rng);
        let significant = (d / se).abs() >= 1.96;
        if significant || rng.gen::<f64>() < p1 {
            pairs.push((d, se));
        }
    }
    StudyDataset::from_pairs(format!("simulated-{seed}"), &pairs).unwrap()
}

#[test]
fn test_recovers_effect_under_selection() {
    let data = simulate(11, 150, TRUE_THETA, 0.0, TRUE_P1);
    let fit = SelectionModelEstimator::default().fit(&data).unwrap();

    assert!((fit.theta - TRUE_THETA).abs() < 0.1, "theta = {}", fit.theta);
    assert!(fit.p1 > 0.0 && fit.p1 < 1.0, "p1 = {}", fit.p1);
    assert_eq!(fit.tau, 0.0);

    let likelihood = SelectionLikelihood::new(&data);
    let at_start = likelihood.negative_log_likelihood(0.5, 1.0, 0.0);
    assert!(fit.neg_log_likelihood <= at_start);
}

#[test]
fn test_raising_p1_floor_never_lowers_minimum() {
    let data = simulate(5, 120, TRUE_THETA, 0.0, TRUE_P1);
    let free = SelectionModelEstimator::default().fit(&data).unwrap();

    let floor = (free.p1 + 0.3).min(1.0);
    let mut params = SelectionModelParameters::default();
    params.bounds[P1] = Bounds::new(floor, 1.0);
    params.start = [floor, free.theta, 0.0];
    let constrained = SelectionModelEstimator::new(params).fit(&data).unwrap();

    assert!(constrained.p1 >= floor);
    assert!(constrained.neg_log_likelihood >= free.neg_log_likelihood - 1e-6);
}

#[test]
fn test_relaxing_tau_is_configuration_only() {
    let data = simulate(23, 120, TRUE_THETA, 0.25, 0.5);
    let fixed = SelectionModelEstimator::default().fit(&data).unwrap();

    // Starting from the fixed-τ optimum the relaxed fit can only improve
    let params = SelectionModelParameters {
        start: [fixed.p1, fixed.theta, 0.0],
        ..SelectionModelParameters::default().with_heterogeneity()
    };
    let relaxed = SelectionModelEstimator::new(params).fit(&data).unwrap();

    assert!(relaxed.tau > 0.0);
    assert!(relaxed.neg_log_likelihood <= fixed.neg_log_likelihood);
}

#[test]
fn test_fixed_theta_is_held() {
    let data = simulate(3, 40, TRUE_THETA, 0.0, TRUE_P1);
    let mut params = SelectionModelParameters::default();
    params.bounds[1] = Bounds::fixed(0.25);
    params.start[1] = 0.25;
    let fit = SelectionModelEstimator::new(params).fit(&data).unwrap();
    assert_eq!(fit.theta, 0.25);
    assert_eq!(fit.tau, 0.0);
    assert!(params.bounds[TAU].is_fixed());
}

#[test]
fn test_budget_exhaustion_is_a_convergence_failure() {
    let data = simulate(8, 50, TRUE_THETA, 0.0, TRUE_P1);
    let params = SelectionModelParameters {
        options: BoxOptions {
            budget: Budget::iterations(3),
            ..Default::default()
        },
        ..Default::default()
    };
    let estimator = SelectionModelEstimator::new(params);
    let err = estimator.fit(&data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Convergence);
    assert!(estimator.estimate(&data).is_err());
}

#[test]
fn test_point_estimate_is_theta_without_standard_error() {
    let data = simulate(17, 60, TRUE_THETA, 0.0, TRUE_P1);
    let estimator = metabias_selection::selection_model();
    let fit = estimator.fit(&data).unwrap();
    let estimate = estimator.estimate(&data).unwrap();
    assert_eq!(estimate.value, fit.theta);
    assert!(estimate.std_error.is_none());
    assert_eq!(estimator.name(), "selection_model");
}
