//! Registry resolving estimator names to search spaces and factories

use crate::error::{PrognosError, Result};
use crate::model::search_space::{SearchSpace, TrialParams};
use crate::model::{AftDistribution, AftModel, CoxPh, KaplanMeierBaseline, RiskEstimator};
use std::collections::HashMap;

/// Factory closure producing a configured, unfitted estimator.
pub type RiskModelFactory =
    Box<dyn Fn(&TrialParams) -> Result<Box<dyn RiskEstimator>> + Send + Sync>;

struct RegistryEntry {
    space: SearchSpace,
    factory: RiskModelFactory,
}

/// Name-indexed catalog of risk estimator plugins.
///
/// The seeker samples hyperparameters from a plugin's declared space and asks
/// the registry to build the estimator. `builtin()` registers the builtin
/// survival estimators; external plugins register under their own names.
#[derive(Default)]
pub struct RiskModelRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl RiskModelRegistry {
    /// Registry with no plugins.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry with the builtin survival estimators.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(
            "cox_ph",
            CoxPh::hyperparameter_space(),
            Box::new(|params| {
                Ok(Box::new(CoxPh::with_params(params)?) as Box<dyn RiskEstimator>)
            }),
        );
        registry.register(
            "weibull_aft",
            AftModel::hyperparameter_space(),
            Box::new(|params| {
                Ok(Box::new(AftModel::with_params(AftDistribution::Weibull, params)?)
                    as Box<dyn RiskEstimator>)
            }),
        );
        registry.register(
            "loglogistic_aft",
            AftModel::hyperparameter_space(),
            Box::new(|params| {
                Ok(
                    Box::new(AftModel::with_params(AftDistribution::LogLogistic, params)?)
                        as Box<dyn RiskEstimator>,
                )
            }),
        );
        registry.register(
            "kaplan_meier",
            KaplanMeierBaseline::hyperparameter_space(),
            Box::new(|_params| Ok(Box::new(KaplanMeierBaseline::new()) as Box<dyn RiskEstimator>)),
        );
        registry
    }

    /// Register a plugin; re-registering a name replaces the entry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        space: SearchSpace,
        factory: RiskModelFactory,
    ) {
        self.entries
            .insert(name.into(), RegistryEntry { space, factory });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered plugin names, sorted for deterministic iteration.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Declared hyperparameter space of a plugin.
    pub fn space(&self, name: &str) -> Result<&SearchSpace> {
        self.entries
            .get(name)
            .map(|e| &e.space)
            .ok_or_else(|| PrognosError::UnknownPlugin(name.to_string()))
    }

    /// Build an unfitted estimator from sampled hyperparameters.
    pub fn build(&self, name: &str, params: &TrialParams) -> Result<Box<dyn RiskEstimator>> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| PrognosError::UnknownPlugin(name.to_string()))?;
        (entry.factory)(params)
    }
}
