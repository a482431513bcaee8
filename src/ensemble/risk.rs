//! Weighted risk-estimation ensemble

use crate::error::{PrognosError, Result};
use crate::model::{validate_survival_inputs, RiskEstimator};
use ndarray::{Array1, Array2};

/// Per-horizon weighted ensemble of fitted risk estimators.
///
/// Each configured horizon owns an ordered list of (estimator, weight)
/// pairs with non-negative weights summing to 1. Predictions for an
/// arbitrary horizon are served by the member set of the nearest configured
/// horizon, with each member queried at the requested horizon.
pub struct WeightedRiskEnsemble {
    horizons: Vec<f64>,
    members: Vec<Vec<(Box<dyn RiskEstimator>, f64)>>,
}

impl WeightedRiskEnsemble {
    /// Assemble an ensemble from per-horizon members and raw weights.
    ///
    /// Weights are normalized to sum to 1 per horizon; negative or
    /// non-finite weights and empty member lists are rejected.
    pub fn from_parts(
        horizons: Vec<f64>,
        parts: Vec<(Vec<Box<dyn RiskEstimator>>, Vec<f64>)>,
    ) -> Result<Self> {
        if horizons.is_empty() {
            return Err(PrognosError::ValidationError(
                "ensemble needs at least one horizon".to_string(),
            ));
        }
        if horizons.len() != parts.len() {
            return Err(PrognosError::ShapeError {
                expected: format!("{} member groups", horizons.len()),
                actual: format!("{}", parts.len()),
            });
        }

        let mut members = Vec::with_capacity(parts.len());
        for (models, weights) in parts {
            if models.is_empty() {
                return Err(PrognosError::ValidationError(
                    "a horizon has no ensemble members".to_string(),
                ));
            }
            if models.len() != weights.len() {
                return Err(PrognosError::ShapeError {
                    expected: format!("{} weights", models.len()),
                    actual: format!("{}", weights.len()),
                });
            }
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(PrognosError::ValidationError(
                    "ensemble weights must be finite and non-negative".to_string(),
                ));
            }
            let total: f64 = weights.iter().sum();
            if total <= 0.0 {
                return Err(PrognosError::ValidationError(
                    "ensemble weights must not all be zero".to_string(),
                ));
            }
            members.push(
                models
                    .into_iter()
                    .zip(weights.into_iter().map(|w| w / total))
                    .collect(),
            );
        }
        Ok(Self { horizons, members })
    }

    /// Configured horizons, ascending.
    pub fn horizons(&self) -> &[f64] {
        &self.horizons
    }

    /// Normalized weight vectors, one per configured horizon.
    pub fn weights(&self) -> Vec<Vec<f64>> {
        self.members
            .iter()
            .map(|group| group.iter().map(|(_, w)| *w).collect())
            .collect()
    }

    /// Member count at one configured horizon.
    pub fn n_members(&self, horizon_idx: usize) -> usize {
        self.members.get(horizon_idx).map_or(0, Vec::len)
    }

    /// Member plugin names at one configured horizon, in weight order.
    pub fn member_names(&self, horizon_idx: usize) -> Vec<&'static str> {
        self.members
            .get(horizon_idx)
            .map(|group| group.iter().map(|(m, _)| m.name()).collect())
            .unwrap_or_default()
    }

    /// Prediction of a single member, for per-member diagnostics.
    pub fn member_predict(
        &self,
        horizon_idx: usize,
        member_idx: usize,
        x: &Array2<f64>,
        horizons: &[f64],
    ) -> Result<Array2<f64>> {
        let group = self
            .members
            .get(horizon_idx)
            .ok_or_else(|| PrognosError::ValidationError(format!(
                "horizon index {horizon_idx} out of range"
            )))?;
        let (model, _) = group.get(member_idx).ok_or_else(|| {
            PrognosError::ValidationError(format!("member index {member_idx} out of range"))
        })?;
        model.predict(x, horizons)
    }

    /// Refit every member at every horizon on new data. Weights are left
    /// untouched.
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        times: &Array1<f64>,
        events: &Array1<f64>,
    ) -> Result<()> {
        validate_survival_inputs(x, times, events)?;
        for group in &mut self.members {
            for (model, _) in group.iter_mut() {
                model.fit(x, times, events)?;
            }
        }
        Ok(())
    }

    /// Weighted risk predictions, one row per sample and one column per
    /// requested horizon.
    pub fn predict(&self, x: &Array2<f64>, horizons: &[f64]) -> Result<Array2<f64>> {
        let mut out = Array2::zeros((x.nrows(), horizons.len()));
        for (col, &horizon) in horizons.iter().enumerate() {
            let group = &self.members[self.nearest_horizon_idx(horizon)];
            let mut blended = Array1::<f64>::zeros(x.nrows());
            for (model, weight) in group {
                let pred = model.predict(x, &[horizon])?;
                blended.scaled_add(*weight, &pred.column(0));
            }
            out.column_mut(col).assign(&blended);
        }
        Ok(out)
    }

    /// Index of the configured horizon closest to `horizon`; ties resolve
    /// to the earlier one.
    fn nearest_horizon_idx(&self, horizon: f64) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (idx, &h) in self.horizons.iter().enumerate() {
            let dist = (h - horizon).abs();
            if dist < best_dist {
                best = idx;
                best_dist = dist;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KaplanMeierBaseline;
    use ndarray::array;

    /// Constant-risk stub used to make blending arithmetic checkable.
    struct ConstantRisk {
        risk: f64,
    }

    impl RiskEstimator for ConstantRisk {
        fn name(&self) -> &'static str {
            "constant"
        }

        fn fit(
            &mut self,
            _x: &Array2<f64>,
            _times: &Array1<f64>,
            _events: &Array1<f64>,
        ) -> Result<()> {
            Ok(())
        }

        fn predict(&self, x: &Array2<f64>, horizons: &[f64]) -> Result<Array2<f64>> {
            Ok(Array2::from_elem((x.nrows(), horizons.len()), self.risk))
        }
    }

    fn boxed(risk: f64) -> Box<dyn RiskEstimator> {
        Box::new(ConstantRisk { risk })
    }

    #[test]
    fn test_weights_normalize_per_horizon() {
        let ensemble = WeightedRiskEnsemble::from_parts(
            vec![1.0, 2.0],
            vec![
                (vec![boxed(0.2), boxed(0.6)], vec![3.0, 1.0]),
                (vec![boxed(0.5)], vec![7.0]),
            ],
        )
        .unwrap();

        let weights = ensemble.weights();
        assert_eq!(weights.len(), 2);
        assert!((weights[0][0] - 0.75).abs() < 1e-12);
        assert!((weights[0][1] - 0.25).abs() < 1e-12);
        assert!((weights[1][0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_predict_blends_members() {
        let ensemble = WeightedRiskEnsemble::from_parts(
            vec![1.0],
            vec![(vec![boxed(0.2), boxed(0.6)], vec![3.0, 1.0])],
        )
        .unwrap();

        let x = array![[0.0], [1.0], [2.0]];
        let out = ensemble.predict(&x, &[1.0]).unwrap();
        assert_eq!(out.dim(), (3, 1));
        // 0.75 * 0.2 + 0.25 * 0.6
        assert!(out.iter().all(|&r| (r - 0.3).abs() < 1e-12));
    }

    #[test]
    fn test_output_shape_matches_request() {
        let ensemble = WeightedRiskEnsemble::from_parts(
            vec![1.0, 2.0],
            vec![
                (vec![boxed(0.1)], vec![1.0]),
                (vec![boxed(0.9)], vec![1.0]),
            ],
        )
        .unwrap();

        let x = array![[0.0], [1.0]];
        let out = ensemble.predict(&x, &[0.5, 1.4, 2.0]).unwrap();
        assert_eq!(out.dim(), (2, 3));
        // 0.5 and 1.4 resolve to the first configured horizon, 2.0 to the second
        assert!((out[[0, 0]] - 0.1).abs() < 1e-12);
        assert!((out[[0, 1]] - 0.1).abs() < 1e-12);
        assert!((out[[0, 2]] - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_midpoint_horizon_resolves_to_earlier() {
        let ensemble = WeightedRiskEnsemble::from_parts(
            vec![1.0, 3.0],
            vec![
                (vec![boxed(0.1)], vec![1.0]),
                (vec![boxed(0.9)], vec![1.0]),
            ],
        )
        .unwrap();
        let x = array![[0.0]];
        let out = ensemble.predict(&x, &[2.0]).unwrap();
        assert!((out[[0, 0]] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_invalid_weights() {
        assert!(WeightedRiskEnsemble::from_parts(
            vec![1.0],
            vec![(vec![boxed(0.1)], vec![-1.0])],
        )
        .is_err());
        assert!(WeightedRiskEnsemble::from_parts(
            vec![1.0],
            vec![(vec![boxed(0.1), boxed(0.2)], vec![0.0, 0.0])],
        )
        .is_err());
        assert!(WeightedRiskEnsemble::from_parts(vec![1.0], vec![(vec![], vec![])]).is_err());
    }

    #[test]
    fn test_fit_refits_members_from_registry_models() {
        let mut registry_model = KaplanMeierBaseline::new();
        let x = array![[0.0], [0.0], [0.0], [0.0]];
        let t = array![1.0, 2.0, 3.0, 4.0];
        let y = array![1.0, 1.0, 1.0, 1.0];
        registry_model.fit(&x, &t, &y).unwrap();

        let mut ensemble = WeightedRiskEnsemble::from_parts(
            vec![2.5],
            vec![(vec![Box::new(registry_model) as Box<dyn RiskEstimator>], vec![1.0])],
        )
        .unwrap();

        // refit on a shifted cohort moves the baseline risk
        let before = ensemble.predict(&x, &[2.5]).unwrap()[[0, 0]];
        let t2 = array![10.0, 20.0, 30.0, 40.0];
        ensemble.fit(&x, &t2, &y).unwrap();
        let after = ensemble.predict(&x, &[2.5]).unwrap()[[0, 0]];
        assert!(before > 0.0);
        assert!(after.abs() < 1e-12);
    }
}
