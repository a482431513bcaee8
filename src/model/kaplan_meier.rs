//! Covariate-free Kaplan-Meier baseline estimator
//!
//! Predicts the population event probability at each horizon regardless of
//! features. Useful as a sanity floor during search: any candidate worth
//! keeping should rank subjects better than this baseline.

use crate::error::{PrognosError, Result};
use crate::metrics::KaplanMeier;
use crate::model::search_space::SearchSpace;
use crate::model::{validate_survival_inputs, RiskEstimator};
use ndarray::{Array1, Array2};

/// Kaplan-Meier baseline risk estimator
#[derive(Debug, Clone, Default)]
pub struct KaplanMeierBaseline {
    curve: Option<KaplanMeier>,
}

impl KaplanMeierBaseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// No tunable hyperparameters.
    pub fn hyperparameter_space() -> SearchSpace {
        SearchSpace::new()
    }
}

impl RiskEstimator for KaplanMeierBaseline {
    fn name(&self) -> &'static str {
        "kaplan_meier"
    }

    fn fit(&mut self, x: &Array2<f64>, times: &Array1<f64>, events: &Array1<f64>) -> Result<()> {
        validate_survival_inputs(x, times, events)?;
        self.curve = Some(KaplanMeier::fit(times, events)?);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>, horizons: &[f64]) -> Result<Array2<f64>> {
        let curve = self.curve.as_ref().ok_or(PrognosError::ModelNotFitted)?;
        let mut out = Array2::zeros((x.nrows(), horizons.len()));
        for (c, &horizon) in horizons.iter().enumerate() {
            let risk = 1.0 - curve.survival_at(horizon);
            out.column_mut(c).fill(risk);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_population_risk_ignores_features() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let t = array![1.0, 2.0, 3.0, 4.0];
        let y = array![1.0, 1.0, 1.0, 1.0];
        let mut model = KaplanMeierBaseline::new();
        model.fit(&x, &t, &y).unwrap();

        let risks = model.predict(&x, &[2.5]).unwrap();
        // S(2.5) = 0.5 with four uncensored events
        assert!(risks.iter().all(|&r| (r - 0.5).abs() < 1e-12));
    }

    #[test]
    fn test_risk_grows_with_horizon() {
        let x = array![[0.0], [0.0], [0.0], [0.0]];
        let t = array![1.0, 2.0, 3.0, 4.0];
        let y = array![1.0, 0.0, 1.0, 1.0];
        let mut model = KaplanMeierBaseline::new();
        model.fit(&x, &t, &y).unwrap();

        let risks = model.predict(&x, &[1.5, 3.5]).unwrap();
        assert!(risks[[0, 0]] < risks[[0, 1]]);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = KaplanMeierBaseline::new();
        let x = array![[0.0]];
        assert!(matches!(
            model.predict(&x, &[1.0]),
            Err(PrognosError::ModelNotFitted)
        ));
    }
}
