//! Estimator plugin layer
//!
//! Provides the pluggable model surface of the engine:
//! - traits for the three prediction task families
//! - hyperparameter search spaces sampled during search
//! - a registry resolving plugin names to search spaces and factories
//! - builtin survival estimators (Cox proportional hazards, Weibull and
//!   log-logistic AFT, Kaplan-Meier baseline)

mod aft;
mod cox_ph;
mod kaplan_meier;
mod registry;
mod search_space;

pub use aft::{AftConfig, AftDistribution, AftModel};
pub use cox_ph::{CoxPh, CoxPhConfig};
pub use kaplan_meier::KaplanMeierBaseline;
pub use registry::{RiskModelFactory, RiskModelRegistry};
pub use search_space::{Parameter, ParameterType, ParameterValue, SearchSpace, TrialParams};

use crate::error::{PrognosError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Prediction task families served by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Classification,
    Regression,
    RiskEstimation,
}

/// Time-to-event estimator plugin.
///
/// `fit` consumes features, observed times and event indicators
/// (1 = event, 0 = censored). `predict` returns the probability of the
/// event occurring by each requested horizon, shaped (samples, horizons).
pub trait RiskEstimator: Send + Sync {
    /// Plugin name as registered
    fn name(&self) -> &'static str;

    fn fit(&mut self, x: &Array2<f64>, times: &Array1<f64>, events: &Array1<f64>) -> Result<()>;

    fn predict(&self, x: &Array2<f64>, horizons: &[f64]) -> Result<Array2<f64>>;
}

/// Probabilistic classifier consumed by the interpretability plugins.
pub trait ClassifierModel: Send + Sync {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Class probabilities shaped (samples, classes)
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;
}

/// Point regressor consumed by the interpretability plugins.
pub trait RegressorModel: Send + Sync {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Shared validation for survival training inputs.
pub(crate) fn validate_survival_inputs(
    x: &Array2<f64>,
    times: &Array1<f64>,
    events: &Array1<f64>,
) -> Result<()> {
    crate::metrics::validate_time_event(times, events)?;
    if x.nrows() != times.len() {
        return Err(PrognosError::ShapeError {
            expected: format!("{} feature rows", times.len()),
            actual: format!("{}", x.nrows()),
        });
    }
    if x.ncols() == 0 {
        return Err(PrognosError::ValidationError(
            "feature matrix has no columns".to_string(),
        ));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(PrognosError::ValidationError(
            "feature matrix contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

/// Column-wise standardization used by the linear survival models.
/// Near-constant columns keep a unit scale instead of blowing up.
pub(crate) fn standardize_columns(x: &Array2<f64>) -> (Array2<f64>, Array1<f64>, Array1<f64>) {
    let means = x
        .mean_axis(ndarray::Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()));
    let mut stds = x.std_axis(ndarray::Axis(0), 1.0);
    stds.mapv_inplace(|s| if s < 1e-12 { 1.0 } else { s });
    let mut standardized = x.clone();
    for mut row in standardized.rows_mut() {
        row -= &means;
        row /= &stds;
    }
    (standardized, means, stds)
}

/// Read an optional numeric hyperparameter.
pub(crate) fn param_f64(params: &TrialParams, name: &str) -> Result<Option<f64>> {
    match params.get(name) {
        None => Ok(None),
        Some(v) => match v.as_f64() {
            Some(x) => Ok(Some(x)),
            None => Err(PrognosError::InvalidParameter {
                name: name.to_string(),
                value: format!("{v:?}"),
                reason: "expected a numeric value".to_string(),
            }),
        },
    }
}

/// Read an optional positive integer hyperparameter.
pub(crate) fn param_usize(params: &TrialParams, name: &str) -> Result<Option<usize>> {
    match params.get(name) {
        None => Ok(None),
        Some(v) => match v.as_i64() {
            Some(x) if x > 0 => Ok(Some(x as usize)),
            _ => Err(PrognosError::InvalidParameter {
                name: name.to_string(),
                value: format!("{v:?}"),
                reason: "expected a positive integer".to_string(),
            }),
        },
    }
}
