//! Symbolic-pursuit explainer
//!
//! Thin wrapper around a [`SurrogatePursuit`] engine: the wrapped model is
//! reshaped into a single-output prediction function, the surrogate is
//! fitted once against it over the training set, and explanations read the
//! surrogate's local feature importance per row. Multi-horizon risk models
//! are projected down to the last evaluation horizon.

use crate::error::{PrognosError, Result};
use crate::explainers::surrogate::{ProjectionPursuit, SurrogatePursuit, SymbolicModel};
use crate::explainers::{Explainer, PredictFn};
use crate::model::{ClassifierModel, RegressorModel, RiskEstimator, TaskType};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Configuration for [`SymbolicPursuit`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolicPursuitConfig {
    /// Surrogate loss below which fitting stops
    pub loss_tol: f64,
    /// Term-acceptance ratio: a new term must shrink the loss to below
    /// `ratio_tol` times the current loss
    pub ratio_tol: f64,
    /// Iteration cap per surrogate term
    pub max_iter: usize,
    /// Numerical-stability epsilon
    pub eps: f64,
    pub random_seed: u64,
    /// Rejected terms tolerated before the surrogate stops growing
    pub patience: usize,
    /// Skip fitting the wrapped model at construction
    pub prefit: bool,
    /// Column labels; defaults to `feature_0..feature_n`
    pub feature_names: Option<Vec<String>>,
}

impl Default for SymbolicPursuitConfig {
    fn default() -> Self {
        Self {
            loss_tol: 1e-3,
            ratio_tol: 0.9,
            max_iter: 100,
            eps: 1e-5,
            random_seed: 0,
            patience: 10,
            prefit: false,
            feature_names: None,
        }
    }
}

impl SymbolicPursuitConfig {
    pub fn with_loss_tol(mut self, loss_tol: f64) -> Self {
        self.loss_tol = loss_tol;
        self
    }

    pub fn with_ratio_tol(mut self, ratio_tol: f64) -> Self {
        self.ratio_tol = ratio_tol;
        self
    }

    pub fn with_seed(mut self, random_seed: u64) -> Self {
        self.random_seed = random_seed;
        self
    }

    pub fn with_feature_names(mut self, feature_names: Vec<String>) -> Self {
        self.feature_names = Some(feature_names);
        self
    }

    pub fn prefit(mut self) -> Self {
        self.prefit = true;
        self
    }

    fn engine(&self) -> ProjectionPursuit {
        ProjectionPursuit {
            loss_tol: self.loss_tol,
            ratio_tol: self.ratio_tol,
            max_iter: self.max_iter,
            eps: self.eps,
            seed: self.random_seed,
            patience: self.patience,
            ..ProjectionPursuit::default()
        }
    }
}

/// Symbolic-pursuit explainer over a fitted surrogate
pub struct SymbolicPursuit {
    task: TaskType,
    feature_names: Vec<String>,
    surrogate: Box<dyn SymbolicModel>,
}

impl SymbolicPursuit {
    /// Wrap a classifier; the surrogate is fitted against the
    /// positive-class probability.
    pub fn for_classification(
        mut model: Box<dyn ClassifierModel>,
        x: &Array2<f64>,
        y: &Array1<f64>,
        config: SymbolicPursuitConfig,
    ) -> Result<Self> {
        if !config.prefit {
            model.fit(x, y)?;
        }
        let predict: PredictFn = Box::new(move |x| {
            let proba = model.predict_proba(x)?;
            if proba.ncols() < 2 {
                return Err(PrognosError::ShapeError {
                    expected: "at least 2 probability columns".to_string(),
                    actual: format!("{}", proba.ncols()),
                });
            }
            Ok(proba.column(1).to_owned())
        });
        Self::from_predict(TaskType::Classification, predict, x, config)
    }

    /// Wrap a regressor; the surrogate is fitted against its point
    /// predictions.
    pub fn for_regression(
        mut model: Box<dyn RegressorModel>,
        x: &Array2<f64>,
        y: &Array1<f64>,
        config: SymbolicPursuitConfig,
    ) -> Result<Self> {
        if !config.prefit {
            model.fit(x, y)?;
        }
        let predict: PredictFn = Box::new(move |x| model.predict(x));
        Self::from_predict(TaskType::Regression, predict, x, config)
    }

    /// Wrap a risk estimator; multi-horizon output is projected down to
    /// the last evaluation horizon.
    pub fn for_risk_estimation(
        mut model: Box<dyn RiskEstimator>,
        x: &Array2<f64>,
        times: &Array1<f64>,
        events: &Array1<f64>,
        eval_horizons: &[f64],
        config: SymbolicPursuitConfig,
    ) -> Result<Self> {
        let horizon = *eval_horizons.last().ok_or_else(|| {
            PrognosError::ConfigError(
                "risk estimation requires at least one evaluation horizon".to_string(),
            )
        })?;
        if !config.prefit {
            model.fit(x, times, events)?;
        }
        let predict: PredictFn =
            Box::new(move |x| Ok(model.predict(x, &[horizon])?.column(0).to_owned()));
        Self::from_predict(TaskType::RiskEstimation, predict, x, config)
    }

    /// Fit the default engine against an arbitrary single-output
    /// prediction function.
    pub fn from_predict(
        task: TaskType,
        predict: PredictFn,
        x: &Array2<f64>,
        config: SymbolicPursuitConfig,
    ) -> Result<Self> {
        let engine = config.engine();
        Self::with_engine(task, predict, x, config, &engine)
    }

    /// Fit a caller-supplied surrogate engine instead of the default
    /// projection pursuit.
    pub fn with_engine(
        task: TaskType,
        predict: PredictFn,
        x: &Array2<f64>,
        config: SymbolicPursuitConfig,
        engine: &dyn SurrogatePursuit,
    ) -> Result<Self> {
        let feature_names = match config.feature_names {
            Some(names) => {
                if names.len() != x.ncols() {
                    return Err(PrognosError::ShapeError {
                        expected: format!("{} feature names", x.ncols()),
                        actual: format!("{}", names.len()),
                    });
                }
                names
            }
            None => (0..x.ncols()).map(|i| format!("feature_{i}")).collect(),
        };
        let surrogate = engine.fit(&predict, x)?;
        info!(
            task = ?task,
            samples = x.nrows(),
            features = x.ncols(),
            "fitted symbolic surrogate"
        );
        Ok(Self {
            task,
            feature_names,
            surrogate,
        })
    }

    pub fn task_type(&self) -> TaskType {
        self.task
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

impl Explainer for SymbolicPursuit {
    /// Per-sample feature importance, aligned with `feature_names`
    type Explanation = Array2<f64>;
    /// Textual surrogate description plus term projection data
    type Plot = (String, Array2<f64>);

    fn explain(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.feature_names.len() {
            return Err(PrognosError::ShapeError {
                expected: format!("{} feature columns", self.feature_names.len()),
                actual: format!("{}", x.ncols()),
            });
        }
        let mut out = Array2::zeros((x.nrows(), x.ncols()));
        for (i, row) in x.rows().into_iter().enumerate() {
            let importance = self.surrogate.feature_importance(&row.to_owned())?;
            out.row_mut(i).assign(&importance);
        }
        Ok(out)
    }

    fn plot(&self, _x: &Array2<f64>) -> Result<(String, Array2<f64>)> {
        Ok((self.surrogate.describe(), self.surrogate.projections()))
    }

    fn name(&self) -> &'static str {
        "symbolic_pursuit"
    }

    fn pretty_name(&self) -> &'static str {
        "Symbolic Pursuit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    fn sample_inputs(n: usize, seed: u64) -> Array2<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut x = Array2::zeros((n, 2));
        for i in 0..n {
            x[[i, 0]] = rng.gen_range(-1.0..1.0);
            x[[i, 1]] = rng.gen_range(-1.0..1.0);
        }
        x
    }

    /// Regressor stub with a fixed linear response.
    struct LinearRegressor {
        fitted: bool,
    }

    impl RegressorModel for LinearRegressor {
        fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
            self.fitted = true;
            Ok(())
        }

        fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
            if !self.fitted {
                return Err(PrognosError::ModelNotFitted);
            }
            Ok(x.column(0).mapv(|v| 2.0 * v) - x.column(1).mapv(|v| 0.5 * v))
        }
    }

    #[test]
    fn test_regression_adapter_fits_and_explains() {
        let x = sample_inputs(80, 12);
        let y = Array1::zeros(80);
        let explainer = SymbolicPursuit::for_regression(
            Box::new(LinearRegressor { fitted: false }),
            &x,
            &y,
            SymbolicPursuitConfig::default(),
        )
        .unwrap();
        assert_eq!(explainer.task_type(), TaskType::Regression);

        let probe = array![[0.3, -0.1], [-0.6, 0.4]];
        let importance = explainer.explain(&probe).unwrap();
        assert_eq!(importance.dim(), (2, 2));
        // the dominant feature dominates the attribution on every row
        for i in 0..2 {
            assert!(importance[[i, 0]].abs() > importance[[i, 1]].abs());
        }
    }

    #[test]
    fn test_prefit_skips_model_fitting() {
        let x = sample_inputs(40, 13);
        let y = Array1::zeros(40);
        // an unfitted stub fails predict, so construction must fail too
        let result = SymbolicPursuit::for_regression(
            Box::new(LinearRegressor { fitted: false }),
            &x,
            &y,
            SymbolicPursuitConfig::default().prefit(),
        );
        assert!(matches!(result, Err(PrognosError::ModelNotFitted)));
    }

    #[test]
    fn test_plot_returns_description_and_projections() {
        let x = sample_inputs(60, 14);
        let predict: PredictFn = Box::new(|x: &Array2<f64>| Ok(x.column(0).mapv(|v| 3.0 * v)));
        let explainer = SymbolicPursuit::from_predict(
            TaskType::Regression,
            predict,
            &x,
            SymbolicPursuitConfig::default(),
        )
        .unwrap();

        let (description, projections) = explainer.plot(&x).unwrap();
        assert!(description.starts_with("f(x) ="));
        assert_eq!(projections.ncols(), 2);
    }

    #[test]
    fn test_feature_name_mismatch_rejected() {
        let x = sample_inputs(40, 15);
        let predict: PredictFn = Box::new(|x: &Array2<f64>| Ok(x.column(0).to_owned()));
        let result = SymbolicPursuit::from_predict(
            TaskType::Regression,
            predict,
            &x,
            SymbolicPursuitConfig::default().with_feature_names(vec!["only_one".to_string()]),
        );
        assert!(matches!(result, Err(PrognosError::ShapeError { .. })));
    }

    #[test]
    fn test_explain_checks_column_count() {
        let x = sample_inputs(40, 16);
        let predict: PredictFn = Box::new(|x: &Array2<f64>| Ok(x.column(0).to_owned()));
        let explainer = SymbolicPursuit::from_predict(
            TaskType::Regression,
            predict,
            &x,
            SymbolicPursuitConfig::default(),
        )
        .unwrap();
        let wrong = array![[1.0, 2.0, 3.0]];
        assert!(explainer.explain(&wrong).is_err());
    }
}
