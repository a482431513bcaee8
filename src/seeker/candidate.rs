//! Candidate bookkeeping for the ensemble search

use crate::model::TrialParams;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// An estimator configuration drawn for one time horizon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub estimator: String,
    pub params: TrialParams,
    pub horizon: f64,
}

/// Cross-validated scores of one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub candidate: Candidate,
    pub c_index_mean: f64,
    pub c_index_std: f64,
    pub brier_mean: f64,
    pub brier_std: f64,
}

impl CandidateScore {
    /// Ranking order: concordance descending, Brier ascending on ties.
    pub fn ranking_cmp(&self, other: &Self) -> Ordering {
        other
            .c_index_mean
            .partial_cmp(&self.c_index_mean)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                self.brier_mean
                    .partial_cmp(&other.brier_mean)
                    .unwrap_or(Ordering::Equal)
            })
    }
}

/// Mean and population standard deviation of fold scores.
pub(crate) fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
