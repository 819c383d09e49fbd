//! Compare every standard estimator on simulated literatures
//!
//! Run with `RUST_LOG=metabias_harness=info` to see batch progress, or
//! `RUST_LOG=debug` for per-estimator decisions. An optional first argument
//! is a JSON estimator configuration.

use anyhow::Context;
use metabias_core::{GroundTruthRecord, GroundTruthTable, StudyDataset};
use metabias_harness::{BiasEvaluationHarness, EstimatorConfig, HarnessOptions};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Normal, Uniform};
use tracing_subscriber::EnvFilter;

/// One literature: `observations` published effects around `theta`, with
/// insignificant results surviving with probability `publish_insignificant`
fn simulate_study(
    rng: &mut ChaCha8Rng,
    name: String,
    theta: f64,
    observations: usize,
    publish_insignificant: f64,
) -> anyhow::Result<StudyDataset> {
    let se_dist = Uniform::new(0.04, 0.4);
    let mut pairs = Vec::with_capacity(observations);
    while pairs.len() < observations {
        let se: f64 = se_dist.sample(rng);
        let d = Normal::new(theta, se)?.sample(rng);
        if d / se >= 1.96 || rng.gen::<f64>() < publish_insignificant {
            pairs.push((d, se));
        }
    }
    Ok(StudyDataset::from_pairs(name, &pairs)?)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading configuration {path}"))?;
            EstimatorConfig::from_json(&json)?
        }
        None => EstimatorConfig::default(),
    };

    println!("=== Publication-Bias Estimator Benchmark ===\n");

    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut datasets = Vec::new();
    let mut records = Vec::new();
    for (i, &theta) in [0.0, 0.1, 0.2, 0.3, 0.5].iter().cycle().take(40).enumerate() {
        let name = format!("literature-{i:02}");
        let study = simulate_study(&mut rng, name.clone(), theta, 30, 0.2)?;
        let naive = study.effect_sizes().sum::<f64>() / study.len() as f64;
        records.push(GroundTruthRecord::new(name, naive * 1.5, naive, theta));
        datasets.push(study);
    }
    let table = GroundTruthTable::from_records(records)?;

    let harness = BiasEvaluationHarness::from_config(&config, HarnessOptions::default())?;
    let report = harness.evaluate(&datasets, &table)?;

    println!("{} studies, {} methods\n", datasets.len(), harness.estimators().len());
    for summary in &report.summaries {
        println!("  {summary}");
    }

    if !report.failures.is_empty() {
        println!("\nFailures:");
        for failure in report.failures.iter().take(10) {
            println!(
                "  {} / {}: {} (fallback: {:?})",
                failure.study, failure.method, failure.kind, failure.degraded_fallback
            );
        }
    }

    Ok(())
}
