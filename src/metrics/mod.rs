//! Evaluation metrics for time-to-event models
//!
//! Censoring-adjusted metrics used to score candidate estimators:
//! - Kaplan-Meier survival curves (also used for the censoring distribution)
//! - Time-dependent concordance index with inverse censoring weights
//! - Brier score with inverse censoring weights

mod survival;

pub use survival::{brier_score, concordance_index, KaplanMeier};

pub(crate) use survival::validate_time_event;
