//! Population-shift effect-size explainer
//!
//! Buckets samples into ordered risk tiers by fixed thresholds, then
//! compares the feature distributions of each tier against all strictly
//! higher tiers with the pooled-variance standardized mean difference
//! (Cohen's d). Features that separate low-risk from higher-risk
//! populations strongly stand out; everything below the configured
//! threshold is reported as zero.

use crate::error::{PrognosError, Result};
use crate::explainers::{Explainer, PredictFn};
use crate::model::{ClassifierModel, RiskEstimator, TaskType};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

// The tier loop allocates four buckets; the current thresholds never
// populate the top one.
const RISK_TIERS: usize = 4;
const TIER_LOW: f64 = 0.2;
const TIER_HIGH: f64 = 0.5;
// Guards Cohen's d when both groups have zero pooled variance.
const POOLED_STD_FLOOR: f64 = 1e-12;
// Effect-magnitude ladder separating heatmap bands.
const HEATMAP_GUIDES: [f64; 7] = [0.8, 0.7, 0.6, 0.5, 0.4, 0.3, 0.2];

/// Configuration for [`RiskEffectSize`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskEffectSizeConfig {
    /// Minimum effect size recorded in the output table
    pub effect_size_threshold: f64,
    /// Column labels; defaults to `feature_0..feature_n`
    pub feature_names: Option<Vec<String>>,
    /// Skip fitting the wrapped model at construction
    pub prefit: bool,
}

impl Default for RiskEffectSizeConfig {
    fn default() -> Self {
        Self {
            effect_size_threshold: 0.5,
            feature_names: None,
            prefit: false,
        }
    }
}

impl RiskEffectSizeConfig {
    pub fn with_threshold(mut self, effect_size_threshold: f64) -> Self {
        self.effect_size_threshold = effect_size_threshold;
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
}

/// Effect sizes by risk tier.
///
/// Rows are ordered low to high risk; a tier row is omitted entirely when
/// either compared group has fewer than two samples. Every cell is
/// non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSizeTable {
    pub tier_labels: Vec<String>,
    pub feature_names: Vec<String>,
    /// Shape (tiers, features)
    pub effect_sizes: Array2<f64>,
}

impl EffectSizeTable {
    /// Cell lookup by tier label and feature name.
    pub fn effect(&self, tier_label: &str, feature: &str) -> Option<f64> {
        let row = self.tier_labels.iter().position(|l| l == tier_label)?;
        let col = self.feature_names.iter().position(|f| f == feature)?;
        Some(self.effect_sizes[[row, col]])
    }
}

/// Renderer-ready projection of an [`EffectSizeTable`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSizeHeatmap {
    pub tier_labels: Vec<String>,
    /// Features with a nonzero effect somewhere, strongest first
    pub feature_names: Vec<String>,
    /// Shape (features, tiers), transposed for heatmap rendering
    pub effect_sizes: Array2<f64>,
    /// Feature-axis offsets where a guide line separates effect bands
    pub guide_lines: Vec<usize>,
}

/// Population-shift effect-size explainer
pub struct RiskEffectSize {
    task: TaskType,
    feature_names: Vec<String>,
    threshold: f64,
    predict: PredictFn,
}

impl RiskEffectSize {
    /// Wrap a classifier; the risk score is the positive-class probability.
    pub fn for_classification(
        mut model: Box<dyn ClassifierModel>,
        x: &Array2<f64>,
        y: &Array1<f64>,
        config: RiskEffectSizeConfig,
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
        Self::from_predict(TaskType::Classification, predict, x.ncols(), config)
    }

    /// Wrap a risk estimator; the risk score is read at the first
    /// evaluation horizon.
    pub fn for_risk_estimation(
        mut model: Box<dyn RiskEstimator>,
        x: &Array2<f64>,
        times: &Array1<f64>,
        events: &Array1<f64>,
        eval_horizons: &[f64],
        config: RiskEffectSizeConfig,
    ) -> Result<Self> {
        let horizon = *eval_horizons.first().ok_or_else(|| {
            PrognosError::ConfigError(
                "risk estimation requires at least one evaluation horizon".to_string(),
            )
        })?;
        if !config.prefit {
            model.fit(x, times, events)?;
        }
        let predict: PredictFn =
            Box::new(move |x| Ok(model.predict(x, &[horizon])?.column(0).to_owned()));
        Self::from_predict(TaskType::RiskEstimation, predict, x.ncols(), config)
    }

    /// Wrap an arbitrary single-output risk function.
    pub fn from_predict(
        task: TaskType,
        predict: PredictFn,
        n_features: usize,
        config: RiskEffectSizeConfig,
    ) -> Result<Self> {
        if config.effect_size_threshold < 0.0 {
            return Err(PrognosError::ConfigError(format!(
                "effect size threshold must be non-negative, got {}",
                config.effect_size_threshold
            )));
        }
        let feature_names = match config.feature_names {
            Some(names) => {
                if names.len() != n_features {
                    return Err(PrognosError::ShapeError {
                        expected: format!("{n_features} feature names"),
                        actual: format!("{}", names.len()),
                    });
                }
                names
            }
            None => (0..n_features).map(|i| format!("feature_{i}")).collect(),
        };
        Ok(Self {
            task,
            feature_names,
            threshold: config.effect_size_threshold,
            predict,
        })
    }

    pub fn task_type(&self) -> TaskType {
        self.task
    }

    fn risk_tier(risk: f64) -> usize {
        if risk < TIER_LOW {
            0
        } else if risk < TIER_HIGH {
            1
        } else {
            2
        }
    }

    fn effect_table(&self, x: &Array2<f64>) -> Result<EffectSizeTable> {
        if x.ncols() != self.feature_names.len() {
            return Err(PrognosError::ShapeError {
                expected: format!("{} feature columns", self.feature_names.len()),
                actual: format!("{}", x.ncols()),
            });
        }
        let risks = (self.predict)(x)?;
        if risks.len() != x.nrows() {
            return Err(PrognosError::ShapeError {
                expected: format!("{} risk scores", x.nrows()),
                actual: format!("{}", risks.len()),
            });
        }
        let tiers: Vec<usize> = risks.iter().map(|&r| Self::risk_tier(r)).collect();

        let mut tier_labels = Vec::new();
        let mut cells = Vec::new();
        for tier in 0..RISK_TIERS {
            let current: Vec<usize> = (0..x.nrows()).filter(|&i| tiers[i] == tier).collect();
            let higher: Vec<usize> = (0..x.nrows()).filter(|&i| tiers[i] > tier).collect();
            // effect sizes are unstable below two samples per group
            if current.len() < 2 || higher.len() < 2 {
                debug!(
                    tier,
                    current = current.len(),
                    higher = higher.len(),
                    "skipping underpopulated tier comparison"
                );
                continue;
            }
            for col in 0..x.ncols() {
                let a: Vec<f64> = current.iter().map(|&i| x[[i, col]]).collect();
                let b: Vec<f64> = higher.iter().map(|&i| x[[i, col]]).collect();
                let d = cohens_d(&a, &b);
                cells.push(if d >= self.threshold { d } else { 0.0 });
            }
            tier_labels.push(format!("Risk lvl {tier}"));
        }

        let effect_sizes = Array2::from_shape_vec((tier_labels.len(), x.ncols()), cells)?;
        Ok(EffectSizeTable {
            tier_labels,
            feature_names: self.feature_names.clone(),
            effect_sizes,
        })
    }

    fn heatmap(&self, table: EffectSizeTable) -> EffectSizeHeatmap {
        let n_tiers = table.effect_sizes.nrows();
        let mut columns: Vec<(String, Vec<f64>, f64)> = table
            .feature_names
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let values: Vec<f64> = (0..n_tiers)
                    .map(|row| table.effect_sizes[[row, col]])
                    .collect();
                let max = values.iter().fold(0.0f64, |acc, &v| acc.max(v));
                (name.clone(), values, max)
            })
            .collect();
        columns.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
        columns.retain(|(_, _, max)| *max > 0.0);

        let mut guide_lines = Vec::new();
        let mut ladder_pos = 0;
        for (idx, (_, _, max)) in columns.iter().enumerate() {
            if ladder_pos < HEATMAP_GUIDES.len() && *max < HEATMAP_GUIDES[ladder_pos] {
                ladder_pos += 1;
                guide_lines.push(idx);
            }
        }
        if !columns.is_empty() {
            guide_lines.push(columns.len());
        }

        let mut effect_sizes = Array2::zeros((columns.len(), n_tiers));
        let mut feature_names = Vec::with_capacity(columns.len());
        for (row, (name, values, _)) in columns.into_iter().enumerate() {
            feature_names.push(name);
            for (col, v) in values.into_iter().enumerate() {
                effect_sizes[[row, col]] = v;
            }
        }
        EffectSizeHeatmap {
            tier_labels: table.tier_labels,
            feature_names,
            effect_sizes,
            guide_lines,
        }
    }
}

impl Explainer for RiskEffectSize {
    type Explanation = EffectSizeTable;
    type Plot = EffectSizeHeatmap;

    fn explain(&self, x: &Array2<f64>) -> Result<EffectSizeTable> {
        self.effect_table(x)
    }

    fn plot(&self, x: &Array2<f64>) -> Result<EffectSizeHeatmap> {
        Ok(self.heatmap(self.effect_table(x)?))
    }

    fn name(&self) -> &'static str {
        "risk_effect_size"
    }

    fn pretty_name(&self) -> &'static str {
        "Risk Effect size"
    }
}

/// Pooled-variance standardized mean difference between two groups.
///
/// Group variances use the (n-1) denominator and are pooled weighted by
/// (n-1). Both groups need at least two samples; callers enforce that. A
/// zero pooled deviation is floored so degenerate groups produce a large
/// finite effect instead of a division artifact.
pub fn cohens_d(group_a: &[f64], group_b: &[f64]) -> f64 {
    let n1 = group_a.len() as f64;
    let n2 = group_b.len() as f64;
    let mean1 = group_a.iter().sum::<f64>() / n1;
    let mean2 = group_b.iter().sum::<f64>() / n2;
    let var1 = group_a.iter().map(|v| (v - mean1).powi(2)).sum::<f64>() / (n1 - 1.0);
    let var2 = group_b.iter().map(|v| (v - mean2).powi(2)).sum::<f64>() / (n2 - 1.0);
    let pooled = (((n1 - 1.0) * var1 + (n2 - 1.0) * var2) / (n1 + n2 - 2.0)).sqrt();
    ((mean1 - mean2) / pooled.max(POOLED_STD_FLOOR)).abs()
}
