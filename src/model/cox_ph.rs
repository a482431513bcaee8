//! Cox proportional hazards estimator
//!
//! Ridge-penalized Breslow partial likelihood fitted by gradient ascent.
//! Absolute risk at a horizon comes from the Breslow baseline cumulative
//! hazard scaled by the subject's hazard ratio.

use crate::error::{PrognosError, Result};
use crate::model::search_space::{SearchSpace, TrialParams};
use crate::model::{
    param_f64, param_usize, standardize_columns, validate_survival_inputs, RiskEstimator,
};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Training knobs for the Cox model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoxPhConfig {
    /// Ridge penalty on the standardized coefficients
    pub alpha: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    pub tol: f64,
}

impl Default for CoxPhConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            max_iter: 200,
            learning_rate: 0.1,
            tol: 1e-6,
        }
    }
}

impl CoxPhConfig {
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }
}

#[derive(Debug, Clone)]
struct FittedCox {
    coefs: Array1<f64>,
    means: Array1<f64>,
    stds: Array1<f64>,
    baseline_times: Vec<f64>,
    baseline_cumhaz: Vec<f64>,
}

impl FittedCox {
    fn cumhaz_at(&self, t: f64) -> f64 {
        match self.baseline_times.partition_point(|&ti| ti <= t) {
            0 => 0.0,
            k => self.baseline_cumhaz[k - 1],
        }
    }
}

/// Cox proportional hazards risk estimator
pub struct CoxPh {
    config: CoxPhConfig,
    fitted: Option<FittedCox>,
}

impl CoxPh {
    pub fn new(config: CoxPhConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Build from sampled hyperparameters, keeping defaults for any knob
    /// the trial does not set.
    pub fn with_params(params: &TrialParams) -> Result<Self> {
        let mut config = CoxPhConfig::default();
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
        Ok(Self::new(config))
    }

    /// Search space sampled by the seeker.
    pub fn hyperparameter_space() -> SearchSpace {
        SearchSpace::new()
            .log_float("alpha", 1e-3, 1.0)
            .int("max_iter", 100, 300)
    }

    pub fn config(&self) -> &CoxPhConfig {
        &self.config
    }

    /// Fitted coefficients on the standardized feature scale.
    pub fn coefficients(&self) -> Result<&Array1<f64>> {
        self.fitted
            .as_ref()
            .map(|f| &f.coefs)
            .ok_or(PrognosError::ModelNotFitted)
    }
}

impl RiskEstimator for CoxPh {
    fn name(&self) -> &'static str {
        "cox_ph"
    }

    fn fit(&mut self, x: &Array2<f64>, times: &Array1<f64>, events: &Array1<f64>) -> Result<()> {
        validate_survival_inputs(x, times, events)?;
        let (xs, means, stds) = standardize_columns(x);
        let n = xs.nrows();
        let p = xs.ncols();

        let n_events: f64 = events.sum();
        if n_events == 0.0 {
            return Err(PrognosError::TrainingError(
                "no observed events in training data".to_string(),
            ));
        }

        // ascending time order; tied times share one risk set (Breslow)
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            times[a]
                .partial_cmp(&times[b])
                .unwrap_or(Ordering::Equal)
        });
        let mut group_start = vec![0usize; n];
        for k in 1..n {
            group_start[k] = if times[order[k]] == times[order[k - 1]] {
                group_start[k - 1]
            } else {
                k
            };
        }

        let mut beta = Array1::<f64>::zeros(p);
        let mut s0 = vec![0.0; n];
        for _ in 0..self.config.max_iter {
            let eta = xs.dot(&beta);
            let exp_eta = eta.mapv(|e| e.clamp(-50.0, 50.0).exp());

            // suffix sums of hazards and hazard-weighted features
            let mut s1 = Array2::<f64>::zeros((n, p));
            let mut acc0 = 0.0;
            let mut acc1 = Array1::<f64>::zeros(p);
            for k in (0..n).rev() {
                let i = order[k];
                acc0 += exp_eta[i];
                acc1.scaled_add(exp_eta[i], &xs.row(i));
                s0[k] = acc0;
                s1.row_mut(k).assign(&acc1);
            }

            let mut grad = Array1::<f64>::zeros(p);
            for k in 0..n {
                let i = order[k];
                if events[i] != 1.0 {
                    continue;
                }
                let g = group_start[k];
                grad += &xs.row(i);
                grad.scaled_add(-1.0 / s0[g], &s1.row(g));
            }
            grad.scaled_add(-self.config.alpha, &beta);

            beta.scaled_add(self.config.learning_rate / n_events, &grad);
            if grad.dot(&grad).sqrt() / n_events < self.config.tol {
                break;
            }
        }

        // Breslow baseline cumulative hazard at distinct event times
        let eta = xs.dot(&beta);
        let exp_eta = eta.mapv(|e| e.clamp(-50.0, 50.0).exp());
        let mut acc0 = 0.0;
        for k in (0..n).rev() {
            acc0 += exp_eta[order[k]];
            s0[k] = acc0;
        }
        let mut baseline_times = Vec::new();
        let mut baseline_cumhaz = Vec::new();
        let mut cumhaz = 0.0;
        let mut k = 0;
        while k < n {
            let t = times[order[k]];
            let start = k;
            let mut d = 0.0;
            while k < n && times[order[k]] == t {
                d += events[order[k]];
                k += 1;
            }
            if d > 0.0 {
                cumhaz += d / s0[start];
                baseline_times.push(t);
                baseline_cumhaz.push(cumhaz);
            }
        }

        self.fitted = Some(FittedCox {
            coefs: beta,
            means,
            stds,
            baseline_times,
            baseline_cumhaz,
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
        let mut out = Array2::zeros((x.nrows(), horizons.len()));
        for (r, row) in x.rows().into_iter().enumerate() {
            let mut eta = 0.0;
            for j in 0..row.len() {
                eta += fitted.coefs[j] * (row[j] - fitted.means[j]) / fitted.stds[j];
            }
            let hazard_ratio = eta.clamp(-50.0, 50.0).exp();
            for (c, &horizon) in horizons.iter().enumerate() {
                let h0 = fitted.cumhaz_at(horizon);
                out[[r, c]] = 1.0 - (-h0 * hazard_ratio).exp();
            }
        }
        Ok(out)
    }
}
