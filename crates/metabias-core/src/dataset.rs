//! Study data model
//!
//! A [`StudyDataset`] is the set of (effect size, standard error) pairs that
//! make up one meta-analysis. Inverse-variance weights are derived on
//! construction and the observation set never changes afterwards; the
//! builder-style methods return a new dataset with freshly computed weights.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single effect-size measurement with its standard error
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    effect_size: f64,
    std_error: f64,
}

impl Observation {
    /// Create a new observation
    ///
    /// Fails with [`Error::ZeroVariance`] if `std_error <= 0`. The index in the
    /// error is 0; use [`StudyDataset::from_pairs`] to get positional errors.
    pub fn new(effect_size: f64, std_error: f64) -> Result<Self> {
        Self::validated(0, effect_size, std_error)
    }

    fn validated(index: usize, effect_size: f64, std_error: f64) -> Result<Self> {
        if !effect_size.is_finite() || !std_error.is_finite() {
            return Err(Error::InvalidInput(format!(
                "observation {index} is not finite (d = {effect_size}, se = {std_error})"
            )));
        }
        if std_error <= 0.0 {
            return Err(Error::ZeroVariance { index, std_error });
        }
        Ok(Self {
            effect_size,
            std_error,
        })
    }

    pub fn effect_size(&self) -> f64 {
        self.effect_size
    }

    pub fn std_error(&self) -> f64 {
        self.std_error
    }

    /// Sampling variance, `se²`
    pub fn variance(&self) -> f64 {
        self.std_error * self.std_error
    }

    /// Precision, `1 / se`
    pub fn precision(&self) -> f64 {
        1.0 / self.std_error
    }

    /// Wald statistic `d / se`
    pub fn z_score(&self) -> f64 {
        self.effect_size / self.std_error
    }
}

/// Effect sizes and standard errors for one study
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyDataset {
    name: String,
    observations: Vec<Observation>,
    weights: Vec<f64>,
}

impl StudyDataset {
    /// Create a dataset from validated observations
    ///
    /// At least one observation is required. Fails with
    /// [`Error::InvalidInput`] when the standard errors span so many orders of
    /// magnitude that some normalized weight is not representable.
    pub fn new(name: impl Into<String>, observations: Vec<Observation>) -> Result<Self> {
        if observations.is_empty() {
            return Err(Error::insufficient(1, 0));
        }
        let weights = inverse_variance_weights(&observations)?;
        Ok(Self {
            name: name.into(),
            observations,
            weights,
        })
    }

    /// Create a dataset from raw `(effect_size, std_error)` pairs
    pub fn from_pairs(name: impl Into<String>, pairs: &[(f64, f64)]) -> Result<Self> {
        let observations = pairs
            .iter()
            .enumerate()
            .map(|(i, &(d, se))| Observation::validated(i, d, se))
            .collect::<Result<Vec<_>>>()?;
        Self::new(name, observations)
    }

    /// Return a new dataset with one more observation
    pub fn with_observation(&self, observation: Observation) -> Result<Self> {
        let mut observations = self.observations.clone();
        observations.push(observation);
        Self::new(self.name.clone(), observations)
    }

    /// Return the subset of observations matching `keep`
    ///
    /// Fails with [`Error::InsufficientData`] when nothing survives.
    pub fn filtered<F>(&self, keep: F) -> Result<Self>
    where
        F: Fn(&Observation) -> bool,
    {
        let observations: Vec<Observation> =
            self.observations.iter().copied().filter(|o| keep(o)).collect();
        Self::new(self.name.clone(), observations)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Normalized inverse-variance weights, one per observation
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn effect_sizes(&self) -> impl Iterator<Item = f64> + '_ {
        self.observations.iter().map(Observation::effect_size)
    }

    pub fn std_errors(&self) -> impl Iterator<Item = f64> + '_ {
        self.observations.iter().map(Observation::std_error)
    }

    /// Whether the dataset has enough observations for a regression fit
    pub fn is_regression_eligible(&self) -> bool {
        self.observations.len() >= 2
    }

    /// Fail with [`Error::InsufficientData`] unless at least `minimum` observations exist
    pub fn require(&self, minimum: usize) -> Result<()> {
        if self.observations.len() < minimum {
            return Err(Error::insufficient(minimum, self.observations.len()));
        }
        Ok(())
    }
}

impl fmt::Display for StudyDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} observations)", self.name, self.observations.len())
    }
}

/// Inverse-variance weights scaled by the smallest standard error
///
/// `(se_min / se_i)²` keeps the largest raw weight at exactly 1, so neither
/// `se²` underflow nor overflow can reach the normalization.
fn inverse_variance_weights(observations: &[Observation]) -> Result<Vec<f64>> {
    let se_min = observations
        .iter()
        .map(Observation::std_error)
        .fold(f64::INFINITY, f64::min);
    let raw: Vec<f64> = observations
        .iter()
        .map(|o| {
            let ratio = se_min / o.std_error();
            ratio * ratio
        })
        .collect();
    let total: f64 = raw.iter().sum();
    let weights: Vec<f64> = raw.into_iter().map(|w| w / total).collect();
    if let Some(index) = weights.iter().position(|w| !w.is_finite() || *w <= 0.0) {
        return Err(Error::InvalidInput(format!(
            "weight of observation {index} is not representable (se = {}, smallest se = {se_min})",
            observations[index].std_error()
        )));
    }
    Ok(weights)
}

/// Known effects for one study, used as the scoring benchmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthRecord {
    pub study_name: String,
    pub original_effect: f64,
    pub meta_analytic_effect: f64,
    /// Effect from the pre-registered replication; the value estimates are scored against
    pub replication_effect: f64,
}

impl GroundTruthRecord {
    pub fn new(
        study_name: impl Into<String>,
        original_effect: f64,
        meta_analytic_effect: f64,
        replication_effect: f64,
    ) -> Self {
        Self {
            study_name: study_name.into(),
            original_effect,
            meta_analytic_effect,
            replication_effect,
        }
    }
}

/// Ground-truth records keyed by study name
#[derive(Debug, Clone, Default)]
pub struct GroundTruthTable {
    records: HashMap<String, GroundTruthRecord>,
}

impl GroundTruthTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table, rejecting duplicate study names
    pub fn from_records(records: impl IntoIterator<Item = GroundTruthRecord>) -> Result<Self> {
        let mut table = Self::new();
        for record in records {
            table.insert(record)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, record: GroundTruthRecord) -> Result<()> {
        if self.records.contains_key(&record.study_name) {
            return Err(Error::InvalidInput(format!(
                "duplicate ground-truth record for study '{}'",
                record.study_name
            )));
        }
        self.records.insert(record.study_name.clone(), record);
        Ok(())
    }

    pub fn get(&self, study_name: &str) -> Option<&GroundTruthRecord> {
        self.records.get(study_name)
    }

    /// Look up a study, escalating a missing record as [`Error::MissingGroundTruth`]
    pub fn lookup(&self, study_name: &str) -> Result<&GroundTruthRecord> {
        self.get(study_name)
            .ok_or_else(|| Error::MissingGroundTruth(study_name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
