//! Interpretability plugins for fitted models
//!
//! Two independent explainers operate on a model's prediction function:
//! - population-shift effect sizes: bucket samples by predicted risk and
//!   compare feature distributions across risk tiers (Cohen's d)
//! - symbolic pursuit: fit an interpretable surrogate against the model
//!   and read per-sample feature importance off the surrogate
//!
//! Both plugins reshape the wrapped model into a single-output prediction
//! function once, at construction, so the explanation paths never branch on
//! the task type again.

mod risk_effect_size;
mod surrogate;
mod symbolic_pursuit;

pub use risk_effect_size::{
    cohens_d, EffectSizeHeatmap, EffectSizeTable, RiskEffectSize, RiskEffectSizeConfig,
};
pub use surrogate::{FittedPursuit, ProjectionPursuit, SurrogatePursuit, SymbolicModel};
pub use symbolic_pursuit::{SymbolicPursuit, SymbolicPursuitConfig};

use crate::error::Result;
use ndarray::{Array1, Array2};

/// Single-output prediction function captured from a wrapped model.
pub type PredictFn = Box<dyn Fn(&Array2<f64>) -> Result<Array1<f64>> + Send + Sync>;

/// Common surface of interpretability plugins.
pub trait Explainer {
    /// Structured explanation for a batch of samples
    type Explanation;
    /// Renderer-ready projection of the explanation
    type Plot;

    fn explain(&self, x: &Array2<f64>) -> Result<Self::Explanation>;

    fn plot(&self, x: &Array2<f64>) -> Result<Self::Plot>;

    /// Plugin name as registered
    fn name(&self) -> &'static str;

    /// Human-readable plugin name
    fn pretty_name(&self) -> &'static str;
}
