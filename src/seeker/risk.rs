//! Risk-estimation ensemble seeker

use crate::ensemble::WeightedRiskEnsemble;
use crate::error::{PrognosError, Result};
use crate::hooks::{NoopHooks, StudyHooks};
use crate::metrics::{brier_score, concordance_index};
use crate::model::{validate_survival_inputs, RiskEstimator, RiskModelRegistry};
use crate::seeker::candidate::{mean_std, Candidate, CandidateScore};
use crate::seeker::config::RiskSeekerConfig;
use crate::seeker::folds::{k_fold_splits, CvSplit};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Per-horizon summary kept in the search report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonReport {
    pub horizon: f64,
    /// Candidates that produced a valid cross-validated score
    pub n_scored: usize,
    /// Candidates discarded because a fold failed
    pub n_failed: usize,
    /// Whether the wall-clock budget stopped candidate scheduling early
    pub timed_out: bool,
    pub elapsed_secs: f64,
    /// The retained top-k candidates with their scores, best first
    pub selected: Vec<CandidateScore>,
    /// Final ensemble weights, aligned with `selected`
    pub weights: Vec<f64>,
    /// Out-of-fold concordance of the refined weighting, when refinement ran
    pub refined_c_index: Option<f64>,
}

/// Full record of one search run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchReport {
    pub study_name: String,
    pub horizons: Vec<HorizonReport>,
    pub total_secs: f64,
}

impl SearchReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Cross-validated search over estimator configurations, one independent
/// search per time horizon.
///
/// `search` samples candidates from the configured pool, scores each by
/// k-fold cross-validation at the horizon, ranks them (concordance
/// descending, Brier ascending on ties), refits the top-k on the full data
/// and refines ensemble weights over cached out-of-fold predictions. The
/// cancellation hook is polled on the orchestrating thread between units of
/// work; fold fitting runs on worker threads and never observes it.
pub struct RiskEnsembleSeeker {
    config: RiskSeekerConfig,
    registry: RiskModelRegistry,
    hooks: Arc<dyn StudyHooks>,
    report: SearchReport,
}

impl RiskEnsembleSeeker {
    /// Seeker over the builtin estimator registry.
    pub fn new(config: RiskSeekerConfig) -> Result<Self> {
        Self::with_registry(config, RiskModelRegistry::builtin())
    }

    /// Seeker over a caller-supplied registry. The configuration is
    /// validated against it immediately.
    pub fn with_registry(config: RiskSeekerConfig, registry: RiskModelRegistry) -> Result<Self> {
        config.validate(&registry)?;
        Ok(Self {
            config,
            registry,
            hooks: Arc::new(NoopHooks),
            report: SearchReport::default(),
        })
    }

    /// Install a cancellation hook.
    pub fn with_hooks(mut self, hooks: Arc<dyn StudyHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &RiskSeekerConfig {
        &self.config
    }

    /// Report of the most recent `search` call.
    pub fn report(&self) -> &SearchReport {
        &self.report
    }

    /// Run the full study and assemble the weighted ensemble.
    ///
    /// Returns [`PrognosError::StudyCancelled`] as soon as the hook signals;
    /// no partial ensemble is ever returned.
    pub fn search(
        &mut self,
        x: &Array2<f64>,
        times: &Array1<f64>,
        events: &Array1<f64>,
    ) -> Result<WeightedRiskEnsemble> {
        validate_survival_inputs(x, times, events)?;
        if x.nrows() < self.config.cv {
            return Err(PrognosError::ValidationError(format!(
                "{} samples cannot support {}-fold cross-validation",
                x.nrows(),
                self.config.cv
            )));
        }
        self.check_cancelled()?;

        let started = Instant::now();
        info!(
            study = %self.config.study_name,
            horizons = self.config.time_horizons.len(),
            pool = self.config.estimators.len(),
            "starting risk ensemble search"
        );
        self.report = SearchReport {
            study_name: self.config.study_name.clone(),
            horizons: Vec::new(),
            total_secs: 0.0,
        };

        let horizons = self.config.time_horizons.clone();
        let mut parts = Vec::with_capacity(horizons.len());
        for (idx, &horizon) in horizons.iter().enumerate() {
            let (members, weights, horizon_report) =
                self.search_horizon(x, times, events, horizon, idx)?;
            parts.push((members, weights));
            self.report.horizons.push(horizon_report);
        }
        self.report.total_secs = started.elapsed().as_secs_f64();

        WeightedRiskEnsemble::from_parts(horizons, parts)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.hooks.should_cancel() {
            Err(PrognosError::StudyCancelled)
        } else {
            Ok(())
        }
    }

    fn search_horizon(
        &self,
        x: &Array2<f64>,
        times: &Array1<f64>,
        events: &Array1<f64>,
        horizon: f64,
        horizon_idx: usize,
    ) -> Result<(Vec<Box<dyn RiskEstimator>>, Vec<f64>, HorizonReport)> {
        let started = Instant::now();
        let splits = k_fold_splits(x.nrows(), self.config.cv, self.config.seed)?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_add(horizon_idx as u64));
        let mut scored: Vec<CandidateScore> = Vec::new();
        let mut n_failed = 0usize;
        let mut timed_out = false;

        for trial in 0..self.config.num_iter {
            self.check_cancelled()?;
            if started.elapsed().as_secs_f64() > self.config.timeout_secs {
                timed_out = true;
                debug!(horizon, trial, "time budget exhausted, stopping candidate scheduling");
                break;
            }
            let name = &self.config.estimators[rng.gen_range(0..self.config.estimators.len())];
            let params = self.registry.space(name)?.sample(&mut rng);
            let candidate = Candidate {
                estimator: name.clone(),
                params,
                horizon,
            };
            match self.score_candidate(&candidate, x, times, events, &splits) {
                Ok(score) => {
                    debug!(
                        estimator = %score.candidate.estimator,
                        horizon,
                        c_index = score.c_index_mean,
                        brier = score.brier_mean,
                        "scored candidate"
                    );
                    scored.push(score);
                }
                Err(err) => {
                    warn!(
                        estimator = %candidate.estimator,
                        horizon,
                        error = %err,
                        "candidate scoring failed, discarding"
                    );
                    n_failed += 1;
                }
            }
        }

        if scored.is_empty() {
            return Err(PrognosError::NoViableCandidates { horizon });
        }
        scored.sort_by(|a, b| a.ranking_cmp(b));
        let n_scored = scored.len();
        let top: Vec<CandidateScore> = scored.into_iter().take(self.config.top_k).collect();

        let mut members = Vec::with_capacity(top.len());
        for selected in &top {
            let mut model = self
                .registry
                .build(&selected.candidate.estimator, &selected.candidate.params)?;
            model.fit(x, times, events)?;
            members.push(model);
        }

        let (weights, refined_c_index) = if members.len() > 1 && self.config.num_ensemble_iter > 0
        {
            self.refine_weights(&top, x, times, events, horizon, &splits)?
        } else {
            (vec![1.0 / members.len() as f64; members.len()], None)
        };

        let elapsed_secs = started.elapsed().as_secs_f64();
        info!(
            horizon,
            members = members.len(),
            n_scored,
            elapsed_secs,
            "horizon search complete"
        );
        let horizon_report = HorizonReport {
            horizon,
            n_scored,
            n_failed,
            timed_out,
            elapsed_secs,
            selected: top,
            weights: weights.clone(),
            refined_c_index,
        };
        Ok((members, weights, horizon_report))
    }

    fn score_candidate(
        &self,
        candidate: &Candidate,
        x: &Array2<f64>,
        times: &Array1<f64>,
        events: &Array1<f64>,
        splits: &[CvSplit],
    ) -> Result<CandidateScore> {
        let fold_results: Vec<Result<(f64, f64)>> = splits
            .par_iter()
            .map(|split| self.score_fold(candidate, x, times, events, split))
            .collect();

        // one failed fold fails the whole candidate
        let mut c_scores = Vec::with_capacity(fold_results.len());
        let mut b_scores = Vec::with_capacity(fold_results.len());
        for result in fold_results {
            let (c, b) = result?;
            c_scores.push(c);
            b_scores.push(b);
        }
        let (c_index_mean, c_index_std) = mean_std(&c_scores);
        let (brier_mean, brier_std) = mean_std(&b_scores);
        Ok(CandidateScore {
            candidate: candidate.clone(),
            c_index_mean,
            c_index_std,
            brier_mean,
            brier_std,
        })
    }

    fn score_fold(
        &self,
        candidate: &Candidate,
        x: &Array2<f64>,
        times: &Array1<f64>,
        events: &Array1<f64>,
        split: &CvSplit,
    ) -> Result<(f64, f64)> {
        let (x_train, t_train, y_train) = take_rows(x, times, events, &split.train_indices);
        let (x_test, t_test, y_test) = take_rows(x, times, events, &split.test_indices);
        let mut model = self
            .registry
            .build(&candidate.estimator, &candidate.params)?;
        model.fit(&x_train, &t_train, &y_train)?;
        let pred = model.predict(&x_test, &[candidate.horizon])?;
        let pred = pred.column(0).to_owned();
        let c_index = concordance_index(
            &t_train,
            &y_train,
            &pred,
            &t_test,
            &y_test,
            candidate.horizon,
        )?;
        let brier = brier_score(
            &t_train,
            &y_train,
            &pred,
            &t_test,
            &y_test,
            candidate.horizon,
        )?;
        Ok((c_index, brier))
    }

    /// Coordinate-wise local search over ensemble weights, scored by the
    /// concordance of the blended out-of-fold predictions. The step shrinks
    /// whenever a full round yields no improvement.
    fn refine_weights(
        &self,
        top: &[CandidateScore],
        x: &Array2<f64>,
        times: &Array1<f64>,
        events: &Array1<f64>,
        horizon: f64,
        splits: &[CvSplit],
    ) -> Result<(Vec<f64>, Option<f64>)> {
        let k = top.len();
        let oof: Vec<Array1<f64>> = top
            .par_iter()
            .map(|selected| self.out_of_fold(&selected.candidate, x, times, events, splits))
            .collect::<Result<Vec<_>>>()?;

        let blend_score = |weights: &[f64]| -> Result<f64> {
            let mut blended = Array1::<f64>::zeros(times.len());
            for (weight, pred) in weights.iter().zip(oof.iter()) {
                blended.scaled_add(*weight, pred);
            }
            concordance_index(times, events, &blended, times, events, horizon)
        };

        let mut best_weights = vec![1.0 / k as f64; k];
        let mut best = blend_score(&best_weights)?;
        let mut step = 0.5 / k as f64;
        for round in 0..self.config.num_ensemble_iter {
            self.check_cancelled()?;
            let mut improved = false;
            for i in 0..k {
                for delta in [step, -step] {
                    let mut trial = best_weights.clone();
                    trial[i] = (trial[i] + delta).max(0.0);
                    let total: f64 = trial.iter().sum();
                    if total <= 0.0 {
                        continue;
                    }
                    for w in &mut trial {
                        *w /= total;
                    }
                    let score = blend_score(&trial)?;
                    if score > best + 1e-12 {
                        best = score;
                        best_weights = trial;
                        improved = true;
                    }
                }
            }
            if !improved {
                step /= 2.0;
            }
            debug!(round, best, step, "weight refinement round");
        }
        Ok((best_weights, Some(best)))
    }

    fn out_of_fold(
        &self,
        candidate: &Candidate,
        x: &Array2<f64>,
        times: &Array1<f64>,
        events: &Array1<f64>,
        splits: &[CvSplit],
    ) -> Result<Array1<f64>> {
        let mut oof = Array1::<f64>::zeros(x.nrows());
        for split in splits {
            let (x_train, t_train, y_train) = take_rows(x, times, events, &split.train_indices);
            let x_test = x.select(Axis(0), &split.test_indices);
            let mut model = self
                .registry
                .build(&candidate.estimator, &candidate.params)?;
            model.fit(&x_train, &t_train, &y_train)?;
            let pred = model.predict(&x_test, &[candidate.horizon])?;
            for (k, &row) in split.test_indices.iter().enumerate() {
                oof[row] = pred[[k, 0]];
            }
        }
        Ok(oof)
    }
}

fn take_rows(
    x: &Array2<f64>,
    times: &Array1<f64>,
    events: &Array1<f64>,
    indices: &[usize],
) -> (Array2<f64>, Array1<f64>, Array1<f64>) {
    (
        x.select(Axis(0), indices),
        times.select(Axis(0), indices),
        events.select(Axis(0), indices),
    )
}
