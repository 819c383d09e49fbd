//! Decision-procedure tests for FAT-PET-PEESE and the PEESE policies

use metabias_core::{BiasCorrectionEstimator, Sidedness, StudyDataset, ZTest};
use metabias_regression::{
    DecisionState, EstimateSource, FatPetPeese, FatPetPeeseParameters, PeeseEstimator,
    PeesePositiveOnly, WeightedRegressionEstimator,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal, Uniform};

const NOISE: [f64; 8] = [0.010, -0.010, 0.005, -0.005, 0.0, 0.008, -0.008, 0.003];
const STD_ERRORS: [f64; 8] = [0.05, 0.08, 0.10, 0.15, 0.20, 0.25, 0.30, 0.40];

/// Effects on a known line in the standard error plus a small fixed wobble
fn line_study(name: &str, intercept: f64, slope: f64) -> StudyDataset {
    let pairs: Vec<(f64, f64)> = STD_ERRORS
        .iter()
        .zip(NOISE)
        .map(|(&se, noise)| (intercept + slope * se + noise, se))
        .collect();
    StudyDataset::from_pairs(name, &pairs).unwrap()
}

fn params(fat: ZTest, pet: ZTest, fallback: bool) -> FatPetPeeseParameters {
    FatPetPeeseParameters {
        fat,
        pet,
        fallback_on_negative_slope: fallback,
    }
}

#[test]
fn test_fat_not_rejected_returns_wls_exactly() {
    let pairs = [(0.30, 0.10), (0.22, 0.15), (0.36, 0.20), (0.24, 0.25), (0.31, 0.30)];
    let data = StudyDataset::from_pairs("no-asymmetry", &pairs).unwrap();
    // Critical value near 7: no realistic slope clears it
    let estimator = FatPetPeese::new(params(
        ZTest::new(1e-12, Sidedness::TwoSided),
        ZTest::new(0.05, Sidedness::TwoSided),
        false,
    ));

    let decision = estimator.decide(&data).unwrap();
    let wls = WeightedRegressionEstimator::new().wls(&data).unwrap();

    assert_eq!(decision.source, EstimateSource::Wls);
    assert_eq!(
        decision.trace,
        vec![DecisionState::Start, DecisionState::Done(EstimateSource::Wls)]
    );
    assert_eq!(decision.estimate.value, wls.intercept.estimate);
    assert_eq!(decision.estimate.std_error, Some(wls.intercept.std_error));
}

#[test]
fn test_pet_not_rejected_returns_zero() {
    let data = line_study("pure-bias", 0.0, 2.0);
    let estimator = FatPetPeese::new(params(
        ZTest::new(0.10, Sidedness::OneSided),
        ZTest::new(1e-12, Sidedness::TwoSided),
        true,
    ));

    let decision = estimator.decide(&data).unwrap();
    assert_eq!(decision.source, EstimateSource::PetNull);
    assert_eq!(decision.estimate.value, 0.0);
    assert_eq!(
        decision.estimate.std_error,
        Some(decision.fat_pet.intercept.std_error)
    );
    assert_eq!(decision.trace.len(), 3);
}

#[test]
fn test_both_rejected_returns_peese() {
    let data = line_study("real-effect-with-bias", 0.5, 2.0);
    let decision = FatPetPeese::default().decide(&data).unwrap();

    assert_eq!(decision.source, EstimateSource::Peese);
    assert_eq!(
        decision.trace.last(),
        Some(&DecisionState::Done(EstimateSource::Peese))
    );
    assert_eq!(decision.estimate.value, decision.peese.intercept.estimate);
    assert_eq!(
        decision.estimate.std_error,
        Some(decision.peese.intercept.std_error)
    );
    let plain = PeeseEstimator::new().estimate(&data).unwrap();
    assert_eq!(decision.estimate.value, plain.value);
}

#[test]
fn test_negative_slope_falls_back_to_wls() {
    let data = line_study("reverse-funnel", 0.5, -1.0);
    // Two-sided FAT so the negative slope is rejected and PET is reached
    let with_fallback = FatPetPeese::new(params(
        ZTest::new(0.10, Sidedness::TwoSided),
        ZTest::new(0.05, Sidedness::TwoSided),
        true,
    ));
    let decision = with_fallback.decide(&data).unwrap();
    assert!(decision.fat_pet.slope_estimate() < 0.0);
    assert_eq!(decision.source, EstimateSource::NegativeSlopeFallback);
    assert_eq!(decision.estimate.value, decision.wls.intercept.estimate);
    assert_eq!(decision.estimate.std_error, Some(decision.wls.intercept.std_error));
    // The trace still shows where the tests led
    assert_eq!(
        decision.trace.last(),
        Some(&DecisionState::Done(EstimateSource::Peese))
    );

    let without_fallback = FatPetPeese::new(params(
        ZTest::new(0.10, Sidedness::TwoSided),
        ZTest::new(0.05, Sidedness::TwoSided),
        false,
    ));
    let decision = without_fallback.decide(&data).unwrap();
    assert_eq!(decision.source, EstimateSource::Peese);
}

#[test]
fn test_one_sided_fat_ignores_negative_slope() {
    let data = line_study("reverse-funnel", 0.5, -1.0);
    let estimator = FatPetPeese::new(params(
        ZTest::new(0.10, Sidedness::OneSided),
        ZTest::new(0.05, Sidedness::TwoSided),
        false,
    ));
    let decision = estimator.decide(&data).unwrap();
    assert_eq!(decision.source, EstimateSource::Wls);
}

#[test]
fn test_peese_positive_only_policy() {
    let positive = line_study("positive", 0.3, 2.0);
    let decision = PeesePositiveOnly::new().decide(&positive).unwrap();
    assert!(decision.peese.slope_estimate() > 0.0);
    assert!(decision.used_peese);
    assert_eq!(decision.estimate.value, decision.peese.intercept.estimate);

    let negative = line_study("negative", 0.3, -2.0);
    let decision = PeesePositiveOnly::new().decide(&negative).unwrap();
    assert!(decision.peese.slope_estimate() < 0.0);
    assert!(!decision.used_peese);
    assert_eq!(decision.estimate.value, decision.wls.intercept.estimate);
    assert_eq!(decision.estimate.std_error, Some(decision.wls.intercept.std_error));
}

#[test]
fn test_decision_invariants_on_random_studies() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let se_dist = Uniform::new(0.03, 0.4);
    let estimator = FatPetPeese::default();

    for study in 0..50 {
        let theta = 0.2;
        let pairs: Vec<(f64, f64)> = (0..12)
            .map(|_| {
                let se: f64 = se_dist.sample(&mut rng);
                let d = Normal::new(theta, se).unwrap().sample(&mut rng);
                (d, se)
            })
            .collect();
        let data = StudyDataset::from_pairs(format!("random-{study}"), &pairs).unwrap();
        let decision = estimator.decide(&data).unwrap();

        let wls_value = decision.wls.intercept.estimate;
        match decision.source {
            EstimateSource::Wls | EstimateSource::NegativeSlopeFallback => {
                assert_eq!(decision.estimate.value, wls_value)
            }
            EstimateSource::PetNull => assert_eq!(decision.estimate.value, 0.0),
            EstimateSource::Peese => {
                assert_eq!(decision.estimate.value, decision.peese.intercept.estimate)
            }
        }
        if decision.fat_pet.slope_estimate() < 0.0 {
            assert_eq!(decision.estimate.value, wls_value);
        }
        assert_eq!(decision.trace[0], DecisionState::Start);
        assert!(decision.trace.last().unwrap().is_done());
    }
}

#[test]
fn test_too_few_observations() {
    let data = StudyDataset::from_pairs("tiny", &[(0.2, 0.1), (0.3, 0.2)]).unwrap();
    let err = FatPetPeese::default().decide(&data).unwrap_err();
    assert_eq!(err, metabias_core::Error::InsufficientData { expected: 3, actual: 2 });
}
