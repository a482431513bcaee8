//! Ensemble layer
//!
//! Weighted aggregation of fitted risk estimators, one weight vector per
//! time horizon. Ensembles are assembled by the seeker and can be refit on
//! new data without disturbing their weights.

mod risk;

pub use risk::WeightedRiskEnsemble;
