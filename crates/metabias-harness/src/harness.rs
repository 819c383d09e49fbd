//! Batch evaluation of estimators against replication effects

use crate::config::EstimatorConfig;
use crate::registry::EstimatorSet;
use crate::types::{
    BatchReport, ErrorMetrics, EstimateFailure, EstimateRecord, Exclusion, PerformanceSummary,
};
use metabias_core::{GroundTruthRecord, GroundTruthTable, Result, StudyDataset};
use rayon::prelude::*;
use tracing::{info, instrument, warn};

/// A study paired with the ground truth it is scored against
#[derive(Debug, Clone, Copy)]
pub struct StudyCase<'a> {
    pub dataset: &'a StudyDataset,
    pub truth: &'a GroundTruthRecord,
}

/// Pair every dataset with its ground-truth record by study name
///
/// A dataset without a record fails the whole batch with
/// [`Error::MissingGroundTruth`].
pub fn join_batch<'a>(
    datasets: &'a [StudyDataset],
    table: &'a GroundTruthTable,
) -> Result<Vec<StudyCase<'a>>> {
    datasets
        .iter()
        .map(|dataset| {
            table
                .lookup(dataset.name())
                .map(|truth| StudyCase { dataset, truth })
        })
        .collect()
}

/// Execution options for a harness run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessOptions {
    /// Evaluate studies on the rayon thread pool
    pub parallel: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

enum Outcome {
    Estimated(EstimateRecord),
    Failed(EstimateFailure),
}

/// Runs every registered estimator on every study and scores the results
#[derive(Debug)]
pub struct BiasEvaluationHarness {
    estimators: EstimatorSet,
    options: HarnessOptions,
}

impl BiasEvaluationHarness {
    pub fn new(estimators: EstimatorSet, options: HarnessOptions) -> Self {
        Self {
            estimators,
            options,
        }
    }

    /// Harness over the standard methods
    pub fn from_config(config: &EstimatorConfig, options: HarnessOptions) -> Result<Self> {
        Ok(Self::new(EstimatorSet::from_config(config)?, options))
    }

    pub fn estimators(&self) -> &EstimatorSet {
        &self.estimators
    }

    pub fn options(&self) -> &HarnessOptions {
        &self.options
    }

    /// Join `datasets` with `table` and evaluate the batch
    pub fn evaluate(
        &self,
        datasets: &[StudyDataset],
        table: &GroundTruthTable,
    ) -> Result<BatchReport> {
        let cases = join_batch(datasets, table)?;
        Ok(self.run(&cases))
    }

    /// Evaluate already-joined studies
    ///
    /// Estimator failures never abort the batch; they are reported and the
    /// study is excluded from that method's summary.
    #[instrument(skip_all, fields(studies = cases.len(), methods = self.estimators.len()))]
    pub fn run(&self, cases: &[StudyCase<'_>]) -> BatchReport {
        info!(parallel = self.options.parallel, "starting bias evaluation");

        let per_study: Vec<Vec<Outcome>> = if self.options.parallel {
            cases.par_iter().map(|case| self.evaluate_study(case)).collect()
        } else {
            cases.iter().map(|case| self.evaluate_study(case)).collect()
        };

        let mut records = Vec::new();
        let mut failures = Vec::new();
        for outcome in per_study.into_iter().flatten() {
            match outcome {
                Outcome::Estimated(record) => records.push(record),
                Outcome::Failed(failure) => failures.push(failure),
            }
        }

        let summaries: Vec<PerformanceSummary> = self
            .estimators
            .iter()
            .map(|estimator| summarize(estimator.name(), &records, &failures))
            .collect();

        info!(
            records = records.len(),
            failures = failures.len(),
            "bias evaluation finished"
        );
        BatchReport {
            records,
            failures,
            summaries,
        }
    }

    #[instrument(skip_all, fields(study = case.dataset.name()))]
    fn evaluate_study(&self, case: &StudyCase<'_>) -> Vec<Outcome> {
        let study = case.dataset.name();
        self.estimators
            .iter()
            .map(|estimator| {
                let method = estimator.name();
                match estimator.estimate(case.dataset) {
                    Ok(estimate) => Outcome::Estimated(EstimateRecord {
                        study: study.to_string(),
                        method: method.to_string(),
                        bias: estimate.value - case.truth.replication_effect,
                        estimate,
                    }),
                    Err(error) => {
                        warn!(
                            method,
                            kind = %error.kind(),
                            %error,
                            "estimate failed, study excluded"
                        );
                        Outcome::Failed(EstimateFailure::from_error(study, method, &error))
                    }
                }
            })
            .collect()
    }
}

/// Summarize one method over the batch
pub fn summarize(
    method: &str,
    records: &[EstimateRecord],
    failures: &[EstimateFailure],
) -> PerformanceSummary {
    let biases: Vec<f64> = records
        .iter()
        .filter(|r| r.method == method)
        .map(|r| r.bias)
        .collect();
    let excluded: Vec<Exclusion> = failures
        .iter()
        .filter(|f| f.method == method)
        .map(|f| Exclusion {
            study: f.study.clone(),
            kind: f.kind,
        })
        .collect();
    PerformanceSummary {
        method: method.to_string(),
        evaluated: biases.len(),
        excluded,
        metrics: ErrorMetrics::from_biases(&biases),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metabias_regression::WlsEstimator;

    fn truth(name: &str, replication: f64) -> GroundTruthRecord {
        GroundTruthRecord::new(name, 0.5, 0.3, replication)
    }

    #[test]
    fn test_join_preserves_dataset_order() {
        let datasets = vec![
            StudyDataset::from_pairs("b", &[(0.1, 0.1)]).unwrap(),
            StudyDataset::from_pairs("a", &[(0.2, 0.1)]).unwrap(),
        ];
        let table = GroundTruthTable::from_records([truth("a", 0.1), truth("b", 0.2)]).unwrap();
        let cases = join_batch(&datasets, &table).unwrap();
        let names: Vec<&str> = cases.iter().map(|c| c.dataset.name()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(cases[0].truth.replication_effect, 0.2);
    }

    #[test]
    fn test_join_missing_record() {
        let datasets = vec![StudyDataset::from_pairs("orphan", &[(0.1, 0.1)]).unwrap()];
        let err = join_batch(&datasets, &GroundTruthTable::new()).unwrap_err();
        assert_eq!(err, Error::MissingGroundTruth("orphan".to_string()));
    }

    #[test]
    fn test_bias_is_estimate_minus_replication() {
        let datasets = vec![StudyDataset::from_pairs("s", &[(0.3, 0.1), (0.3, 0.2)]).unwrap()];
        let table = GroundTruthTable::from_records([truth("s", 0.1)]).unwrap();
        let harness = BiasEvaluationHarness::new(
            EstimatorSet::new().with(WlsEstimator::new()).unwrap(),
            HarnessOptions { parallel: false },
        );
        let report = harness.evaluate(&datasets, &table).unwrap();
        let record = report.record("s", "wls").unwrap();
        assert!((record.bias - 0.2).abs() < 1e-12);
    }
}
