//! Configuration for the risk ensemble seeker

use crate::error::{PrognosError, Result};
use crate::model::RiskModelRegistry;
use serde::{Deserialize, Serialize};

/// Study configuration consumed by [`crate::seeker::RiskEnsembleSeeker`].
///
/// Horizons are prediction checkpoints on the observed time scale. They
/// should fall inside the observed event-time range for evaluation to be
/// meaningful; that is a caller responsibility and is not enforced here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSeekerConfig {
    /// Study label carried through logs and reports
    pub study_name: String,
    /// Prediction checkpoints, strictly increasing and non-negative
    pub time_horizons: Vec<f64>,
    /// Candidate configurations sampled per horizon
    pub num_iter: usize,
    /// Weight-refinement rounds after the top-k refit; 0 keeps uniform weights
    pub num_ensemble_iter: usize,
    /// Cross-validation fold count
    pub cv: usize,
    /// Best candidates retained per horizon
    pub top_k: usize,
    /// Wall-clock budget per horizon, in seconds
    pub timeout_secs: f64,
    /// Estimator pool, by registered plugin name
    pub estimators: Vec<String>,
    /// Seed for candidate sampling and fold shuffling
    pub seed: u64,
}

impl Default for RiskSeekerConfig {
    fn default() -> Self {
        Self {
            study_name: "risk_estimation_study".to_string(),
            time_horizons: Vec::new(),
            num_iter: 100,
            num_ensemble_iter: 100,
            cv: 5,
            top_k: 3,
            timeout_secs: 360.0,
            estimators: vec![
                "cox_ph".to_string(),
                "weibull_aft".to_string(),
                "loglogistic_aft".to_string(),
            ],
            seed: 42,
        }
    }
}

impl RiskSeekerConfig {
    pub fn new(study_name: impl Into<String>, time_horizons: Vec<f64>) -> Self {
        Self {
            study_name: study_name.into(),
            time_horizons,
            ..Self::default()
        }
    }

    pub fn with_num_iter(mut self, num_iter: usize) -> Self {
        self.num_iter = num_iter;
        self
    }

    pub fn with_num_ensemble_iter(mut self, num_ensemble_iter: usize) -> Self {
        self.num_ensemble_iter = num_ensemble_iter;
        self
    }

    pub fn with_cv(mut self, cv: usize) -> Self {
        self.cv = cv;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: f64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_estimators(mut self, estimators: Vec<String>) -> Self {
        self.estimators = estimators;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fail fast on an unusable study configuration, before any scoring.
    pub fn validate(&self, registry: &RiskModelRegistry) -> Result<()> {
        if self.time_horizons.is_empty() {
            return Err(PrognosError::ConfigError(
                "at least one time horizon is required".to_string(),
            ));
        }
        for window in self.time_horizons.windows(2) {
            if window[1] <= window[0] {
                return Err(PrognosError::ConfigError(format!(
                    "time horizons must be strictly increasing, got {} then {}",
                    window[0], window[1]
                )));
            }
        }
        if let Some(&h) = self
            .time_horizons
            .iter()
            .find(|h| !h.is_finite() || **h < 0.0)
        {
            return Err(PrognosError::ConfigError(format!(
                "time horizons must be finite and non-negative, got {h}"
            )));
        }
        if self.num_iter == 0 {
            return Err(PrognosError::ConfigError(
                "num_iter must be at least 1".to_string(),
            ));
        }
        if self.cv < 2 {
            return Err(PrognosError::ConfigError(
                "cross-validation needs at least 2 folds".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(PrognosError::ConfigError(
                "top_k must be at least 1".to_string(),
            ));
        }
        if !(self.timeout_secs > 0.0) {
            return Err(PrognosError::ConfigError(format!(
                "timeout must be positive, got {}",
                self.timeout_secs
            )));
        }
        if self.estimators.is_empty() {
            return Err(PrognosError::ConfigError(
                "estimator pool is empty".to_string(),
            ));
        }
        for name in &self.estimators {
            if !registry.contains(name) {
                return Err(PrognosError::UnknownPlugin(name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pool_validates_against_builtins() {
        let registry = RiskModelRegistry::builtin();
        let config = RiskSeekerConfig::new("smoke", vec![1.0, 2.0, 3.0]);
        assert!(config.validate(&registry).is_ok());
    }

    #[test]
    fn test_rejects_unordered_horizons() {
        let registry = RiskModelRegistry::builtin();
        let config = RiskSeekerConfig::new("bad", vec![2.0, 1.0]);
        assert!(matches!(
            config.validate(&registry),
            Err(PrognosError::ConfigError(_))
        ));
    }

    #[test]
    fn test_rejects_empty_horizons() {
        let registry = RiskModelRegistry::builtin();
        let config = RiskSeekerConfig::new("bad", vec![]);
        assert!(config.validate(&registry).is_err());
    }

    #[test]
    fn test_rejects_unknown_estimator() {
        let registry = RiskModelRegistry::builtin();
        let config = RiskSeekerConfig::new("bad", vec![1.0])
            .with_estimators(vec!["mystery_model".to_string()]);
        assert!(matches!(
            config.validate(&registry),
            Err(PrognosError::UnknownPlugin(_))
        ));
    }

    #[test]
    fn test_rejects_degenerate_knobs() {
        let registry = RiskModelRegistry::builtin();
        let base = RiskSeekerConfig::new("bad", vec![1.0]);
        assert!(base.clone().with_num_iter(0).validate(&registry).is_err());
        assert!(base.clone().with_cv(1).validate(&registry).is_err());
        assert!(base.clone().with_top_k(0).validate(&registry).is_err());
        assert!(base.with_timeout_secs(0.0).validate(&registry).is_err());
    }
}
