//! Ordered, name-unique collection of estimators

use crate::config::EstimatorConfig;
use metabias_core::{BiasCorrectionEstimator, Error, Result};
use metabias_pcurve::PCurveEstimator;
use metabias_regression::{
    FatPetPeese, PeeseEstimator, PeesePositiveOnly, PetEstimator, WlsEstimator,
};
use metabias_selection::SelectionModelEstimator;

/// Method names registered by [`EstimatorSet::from_config`], in order
pub const STANDARD_METHODS: [&str; 7] = [
    "wls",
    "pet",
    "peese",
    "peese_positive",
    "fat_pet_peese",
    "pcurve",
    "selection_model",
];

/// Estimators keyed by [`BiasCorrectionEstimator::name`]
#[derive(Default)]
pub struct EstimatorSet {
    estimators: Vec<Box<dyn BiasCorrectionEstimator>>,
}

impl EstimatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every standard method, configured from `config`
    pub fn from_config(config: &EstimatorConfig) -> Result<Self> {
        config.validate()?;
        let mut set = Self::new();
        set.register(Box::new(WlsEstimator::new()))?;
        set.register(Box::new(PetEstimator::new()))?;
        set.register(Box::new(PeeseEstimator::new()))?;
        set.register(Box::new(PeesePositiveOnly::new()))?;
        set.register(Box::new(FatPetPeese::new(config.fat_pet_peese_parameters())))?;
        set.register(Box::new(PCurveEstimator::new(config.pcurve_parameters())))?;
        set.register(Box::new(SelectionModelEstimator::new(
            config.selection_parameters(),
        )))?;
        Ok(set)
    }

    /// Add an estimator; its name must not be taken
    pub fn register(&mut self, estimator: Box<dyn BiasCorrectionEstimator>) -> Result<()> {
        if self.get(estimator.name()).is_some() {
            return Err(Error::InvalidParameter(format!(
                "an estimator named '{}' is already registered",
                estimator.name()
            )));
        }
        self.estimators.push(estimator);
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with<E>(mut self, estimator: E) -> Result<Self>
    where
        E: BiasCorrectionEstimator + 'static,
    {
        self.register(Box::new(estimator))?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&dyn BiasCorrectionEstimator> {
        self.estimators
            .iter()
            .find(|e| e.name() == name)
            .map(|e| e.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.estimators.iter().map(|e| e.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn BiasCorrectionEstimator> {
        self.estimators.iter().map(|e| e.as_ref())
    }

    pub fn len(&self) -> usize {
        self.estimators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimators.is_empty()
    }
}

impl std::fmt::Debug for EstimatorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_set_order() {
        let set = EstimatorSet::from_config(&EstimatorConfig::default()).unwrap();
        assert_eq!(set.names(), STANDARD_METHODS.to_vec());
        assert_eq!(set.len(), 7);
        assert!(set.get("pcurve").is_some());
        assert!(set.get("trim_and_fill").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = EstimatorSet::new()
            .with(WlsEstimator::new())
            .and_then(|set| set.with(WlsEstimator::new()))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EstimatorConfig {
            pet_alpha: 0.0,
            ..Default::default()
        };
        assert!(EstimatorSet::from_config(&config).is_err());
    }
}
