//! Ensemble search for risk estimation
//!
//! The seeker explores sampled estimator configurations per time horizon:
//! - random candidate sampling from the configured estimator pool
//! - k-fold cross-validated scoring (concordance index + Brier score)
//! - per-horizon wall-clock budget and cooperative cancellation
//! - top-k refit and coordinate-wise ensemble weight refinement

mod candidate;
mod config;
mod folds;
mod risk;

pub use candidate::{Candidate, CandidateScore};
pub use config::RiskSeekerConfig;
pub use folds::{k_fold_splits, CvSplit};
pub use risk::{HorizonReport, RiskEnsembleSeeker, SearchReport};
