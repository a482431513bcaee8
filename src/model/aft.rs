//! Accelerated failure time estimators
//!
//! Weibull and log-logistic AFT models sharing one fitting core: both place a
//! linear predictor on log time and differ only in the link between the
//! scaled residual and the survival probability. Fitted by ridge-penalized
//! maximum likelihood with analytic gradients.

use crate::error::{PrognosError, Result};
use crate::model::search_space::{SearchSpace, TrialParams};
use crate::model::{
    param_f64, param_usize, standardize_columns, validate_survival_inputs, RiskEstimator,
};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Event-time distribution assumed by an AFT model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AftDistribution {
    Weibull,
    LogLogistic,
}

/// Training knobs shared by the AFT models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AftConfig {
    /// Ridge penalty on the standardized coefficients
    pub alpha: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    pub tol: f64,
}

impl Default for AftConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            max_iter: 300,
            learning_rate: 0.05,
            tol: 1e-6,
        }
    }
}

#[derive(Debug, Clone)]
struct FittedAft {
    coefs: Array1<f64>,
    intercept: f64,
    log_shape: f64,
    means: Array1<f64>,
    stds: Array1<f64>,
}

/// AFT risk estimator parameterized by its event-time distribution
pub struct AftModel {
    distribution: AftDistribution,
    config: AftConfig,
    fitted: Option<FittedAft>,
}

// Scaled log-time residuals are clamped here before exponentiation.
const RESIDUAL_CLAMP: f64 = 15.0;
// Observed times are floored away from zero for the log transform.
const TIME_FLOOR: f64 = 1e-8;

fn sigmoid(w: f64) -> f64 {
    1.0 / (1.0 + (-w).exp())
}

impl AftModel {
    pub fn new(distribution: AftDistribution, config: AftConfig) -> Self {
        Self {
            distribution,
            config,
            fitted: None,
        }
    }

    /// Build from sampled hyperparameters, keeping defaults for any knob
    /// the trial does not set.
    pub fn with_params(distribution: AftDistribution, params: &TrialParams) -> Result<Self> {
        let mut config = AftConfig::default();
        if let Some(v) = param_f64(params, "alpha")? {
            if v < 0.0 {
                return Err(PrognosError::InvalidParameter {
                    name: "alpha".to_string(),
                    value: v.to_string(),
                    reason: "ridge penalty must be non-negative".to_string(),
                });
            }
            config.alpha = v;
        }
        if let Some(v) = param_usize(params, "max_iter")? {
            config.max_iter = v;
        }
        Ok(Self::new(distribution, config))
    }

    /// Search space sampled by the seeker; shared by both distributions.
    pub fn hyperparameter_space() -> SearchSpace {
        SearchSpace::new()
            .log_float("alpha", 1e-3, 1.0)
            .int("max_iter", 100, 300)
    }

    pub fn distribution(&self) -> AftDistribution {
        self.distribution
    }

    /// Fitted coefficients on the standardized log-time scale.
    pub fn coefficients(&self) -> Result<&Array1<f64>> {
        self.fitted
            .as_ref()
            .map(|f| &f.coefs)
            .ok_or(PrognosError::ModelNotFitted)
    }

    /// Per-subject derivative of the log-likelihood with respect to the
    /// location, and with respect to the log shape.
    fn likelihood_grads(&self, w: f64, shape: f64, event: bool) -> (f64, f64) {
        let w = w.clamp(-RESIDUAL_CLAMP, RESIDUAL_CLAMP);
        match self.distribution {
            AftDistribution::Weibull => {
                let ew = w.exp();
                if event {
                    (shape * (ew - 1.0), 1.0 + w - w * ew)
                } else {
                    (shape * ew, -w * ew)
                }
            }
            AftDistribution::LogLogistic => {
                let s = sigmoid(w);
                if event {
                    (shape * (2.0 * s - 1.0), 1.0 + w * (1.0 - 2.0 * s))
                } else {
                    (shape * s, -w * s)
                }
            }
        }
    }

    fn event_probability(&self, w: f64) -> f64 {
        let w = w.clamp(-RESIDUAL_CLAMP, RESIDUAL_CLAMP);
        match self.distribution {
            AftDistribution::Weibull => 1.0 - (-w.exp()).exp(),
            AftDistribution::LogLogistic => sigmoid(w),
        }
    }
}

impl RiskEstimator for AftModel {
    fn name(&self) -> &'static str {
        match self.distribution {
            AftDistribution::Weibull => "weibull_aft",
            AftDistribution::LogLogistic => "loglogistic_aft",
        }
    }

    fn fit(&mut self, x: &Array2<f64>, times: &Array1<f64>, events: &Array1<f64>) -> Result<()> {
        validate_survival_inputs(x, times, events)?;
        let (xs, means, stds) = standardize_columns(x);
        let n = xs.nrows();
        let p = xs.ncols();
        let log_t = times.mapv(|t| t.max(TIME_FLOOR).ln());

        let mut coefs = Array1::<f64>::zeros(p);
        let mut intercept = log_t.mean().unwrap_or(0.0);
        let mut log_shape: f64 = 0.0;

        for _ in 0..self.config.max_iter {
            let shape = log_shape.exp();
            let location = xs.dot(&coefs) + intercept;

            let mut grad_coefs = Array1::<f64>::zeros(p);
            let mut grad_intercept = 0.0;
            let mut grad_log_shape = 0.0;
            for i in 0..n {
                let w = shape * (log_t[i] - location[i]);
                let (du, dk) = self.likelihood_grads(w, shape, events[i] == 1.0);
                grad_coefs.scaled_add(du, &xs.row(i));
                grad_intercept += du;
                grad_log_shape += dk;
            }
            let scale = 1.0 / n as f64;
            grad_coefs.mapv_inplace(|g| (g * scale).clamp(-10.0, 10.0));
            grad_coefs.scaled_add(-self.config.alpha, &coefs);
            grad_intercept = (grad_intercept * scale).clamp(-10.0, 10.0);
            grad_log_shape = (grad_log_shape * scale).clamp(-10.0, 10.0);

            coefs.scaled_add(self.config.learning_rate, &grad_coefs);
            intercept += self.config.learning_rate * grad_intercept;
            log_shape += self.config.learning_rate * grad_log_shape;

            let norm = (grad_coefs.dot(&grad_coefs)
                + grad_intercept * grad_intercept
                + grad_log_shape * grad_log_shape)
                .sqrt();
            if norm < self.config.tol {
                break;
            }
        }

        self.fitted = Some(FittedAft {
            coefs,
            intercept,
            log_shape,
            means,
            stds,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>, horizons: &[f64]) -> Result<Array2<f64>> {
        let fitted = self.fitted.as_ref().ok_or(PrognosError::ModelNotFitted)?;
        if x.ncols() != fitted.coefs.len() {
            return Err(PrognosError::ShapeError {
                expected: format!("{} feature columns", fitted.coefs.len()),
                actual: format!("{}", x.ncols()),
            });
        }
        let shape = fitted.log_shape.exp();
        let mut out = Array2::zeros((x.nrows(), horizons.len()));
        for (r, row) in x.rows().into_iter().enumerate() {
            let mut location = fitted.intercept;
            for j in 0..row.len() {
                location += fitted.coefs[j] * (row[j] - fitted.means[j]) / fitted.stds[j];
            }
            for (c, &horizon) in horizons.iter().enumerate() {
                out[[r, c]] = if horizon <= 0.0 {
                    0.0
                } else {
                    self.event_probability(shape * (horizon.ln() - location))
                };
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    fn planted_cohort(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>, Array1<f64>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut x = Array2::zeros((n, 2));
        let mut t = Array1::zeros(n);
        let mut y = Array1::zeros(n);
        for i in 0..n {
            let x0: f64 = rng.gen_range(-1.0..1.0);
            let x1: f64 = rng.gen_range(-1.0..1.0);
            x[[i, 0]] = x0;
            x[[i, 1]] = x1;
            let noise: f64 = rng.gen_range(-0.2..0.2);
            t[i] = (2.0 - 1.2 * x0 + noise).exp();
            y[i] = if rng.gen::<f64>() < 0.8 { 1.0 } else { 0.0 };
        }
        (x, t, y)
    }

    fn check_risk_ordering(distribution: AftDistribution) {
        let (x, t, y) = planted_cohort(200, 23);
        let mut model = AftModel::new(distribution, AftConfig::default());
        model.fit(&x, &t, &y).unwrap();

        // higher x0 shortens time to event, so its log-time coefficient is negative
        let coefs = model.coefficients().unwrap();
        assert!(coefs[0] < -0.1, "location coefficient {}", coefs[0]);

        let probe = ndarray::array![[0.9, 0.0], [-0.9, 0.0]];
        let risks = model.predict(&probe, &[4.0, 8.0]).unwrap();
        assert!(risks[[0, 0]] > risks[[1, 0]]);
        assert!(risks[[0, 1]] >= risks[[0, 0]]);
        assert!(risks.iter().all(|&r| (0.0..=1.0).contains(&r)));
    }

    #[test]
    fn test_weibull_risk_ordering() {
        check_risk_ordering(AftDistribution::Weibull);
    }

    #[test]
    fn test_loglogistic_risk_ordering() {
        check_risk_ordering(AftDistribution::LogLogistic);
    }

    #[test]
    fn test_plugin_names_follow_distribution() {
        let w = AftModel::new(AftDistribution::Weibull, AftConfig::default());
        let l = AftModel::new(AftDistribution::LogLogistic, AftConfig::default());
        assert_eq!(w.name(), "weibull_aft");
        assert_eq!(l.name(), "loglogistic_aft");
    }

    #[test]
    fn test_zero_horizon_has_zero_risk() {
        let (x, t, y) = planted_cohort(80, 31);
        let mut model = AftModel::new(AftDistribution::Weibull, AftConfig::default());
        model.fit(&x, &t, &y).unwrap();
        let risks = model.predict(&x, &[0.0]).unwrap();
        assert!(risks.iter().all(|&r| r == 0.0));
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = AftModel::new(AftDistribution::LogLogistic, AftConfig::default());
        let x = ndarray::array![[0.0, 0.0]];
        assert!(matches!(
            model.predict(&x, &[1.0]),
            Err(PrognosError::ModelNotFitted)
        ));
    }
}
