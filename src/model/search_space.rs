//! Hyperparameter search spaces declared by estimator plugins

use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Domain of a single hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterType {
    /// Continuous value in [low, high]; log-scale domains sample uniformly
    /// in log space
    Float { low: f64, high: f64, log_scale: bool },
    /// Integer value in [low, high]
    Int { low: i64, high: i64 },
    /// One of a fixed set of named choices
    Categorical { choices: Vec<String> },
}

/// A named hyperparameter with its domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: ParameterType,
}

impl Parameter {
    /// Draw a value uniformly from the parameter domain
    pub fn sample(&self, rng: &mut impl Rng) -> ParameterValue {
        match &self.param_type {
            ParameterType::Float { low, high, log_scale } => {
                let value = if *log_scale {
                    let log_low = low.ln();
                    let log_high = high.ln();
                    (rng.gen::<f64>() * (log_high - log_low) + log_low).exp()
                } else {
                    rng.gen::<f64>() * (high - low) + low
                };
                ParameterValue::Float(value)
            }
            ParameterType::Int { low, high } => ParameterValue::Int(rng.gen_range(*low..=*high)),
            ParameterType::Categorical { choices } => {
                ParameterValue::Str(choices[rng.gen_range(0..choices.len())].clone())
            }
        }
    }
}

/// Sampled parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Float(f64),
    Int(i64),
    Str(String),
}

impl ParameterValue {
    /// Numeric value as f64; integers widen
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            ParameterValue::Str(_) => None,
        }
    }

    /// Numeric value as i64; floats truncate
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            ParameterValue::Float(v) => Some(*v as i64),
            ParameterValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

/// Sampled configuration keyed by parameter name
pub type TrialParams = HashMap<String, ParameterValue>;

/// Declared hyperparameter space of an estimator plugin
///
/// An empty space is valid: covariate-free baselines expose one, and
/// sampling it yields an empty configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    parameters: Vec<Parameter>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a uniform float parameter
    pub fn float(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(name, ParameterType::Float { low, high, log_scale: false })
    }

    /// Add a log-uniform float parameter
    pub fn log_float(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(name, ParameterType::Float { low, high, log_scale: true })
    }

    /// Add a uniform integer parameter
    pub fn int(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.add(name, ParameterType::Int { low, high })
    }

    /// Add a categorical parameter
    pub fn categorical(self, name: impl Into<String>, choices: &[&str]) -> Self {
        self.add(
            name,
            ParameterType::Categorical {
                choices: choices.iter().map(|c| c.to_string()).collect(),
            },
        )
    }

    fn add(mut self, name: impl Into<String>, param_type: ParameterType) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            param_type,
        });
        self
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Draw one full configuration
    pub fn sample(&self, rng: &mut impl Rng) -> TrialParams {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), p.sample(rng)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_sampling_stays_in_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let space = SearchSpace::new()
            .float("alpha", 0.1, 1.0)
            .int("max_iter", 50, 200);

        for _ in 0..50 {
            let params = space.sample(&mut rng);
            let alpha = params["alpha"].as_f64().unwrap();
            let max_iter = params["max_iter"].as_i64().unwrap();
            assert!((0.1..=1.0).contains(&alpha));
            assert!((50..=200).contains(&max_iter));
        }
    }

    #[test]
    fn test_log_scale_covers_decades() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let space = SearchSpace::new().log_float("penalty", 1e-4, 1.0);

        let mut below = 0;
        for _ in 0..200 {
            let v = space.sample(&mut rng)["penalty"].as_f64().unwrap();
            assert!((1e-4..=1.0).contains(&v));
            if v < 1e-2 {
                below += 1;
            }
        }
        // log-uniform puts about half the mass below the geometric midpoint
        assert!(below > 50);
    }

    #[test]
    fn test_categorical_sampling() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let space = SearchSpace::new().categorical("link", &["identity", "log"]);
        let params = space.sample(&mut rng);
        let choice = params["link"].as_str().unwrap();
        assert!(choice == "identity" || choice == "log");
        assert!(params["link"].as_f64().is_none());
    }

    #[test]
    fn test_empty_space_samples_empty_config() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let space = SearchSpace::new();
        assert!(space.is_empty());
        assert_eq!(space.len(), 0);
        assert!(space.sample(&mut rng).is_empty());
    }

    #[test]
    fn test_deterministic_under_seed() {
        let space = SearchSpace::new().float("alpha", 0.0, 1.0).int("k", 1, 10);
        let mut a = ChaCha8Rng::seed_from_u64(99);
        let mut b = ChaCha8Rng::seed_from_u64(99);
        assert_eq!(space.sample(&mut a), space.sample(&mut b));
    }
}
