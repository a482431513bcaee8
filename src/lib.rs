//! Prognos AutoML - Ensemble search for survival risk estimation
//!
//! This crate searches over survival-model configurations per time horizon,
//! assembles weighted risk ensembles, and explains the fitted result:
//! - Cross-validated candidate search with per-horizon budgets
//! - Weighted per-horizon ensembles with refit support
//! - Interpretability plugins over arbitrary prediction functions
//!
//! # Modules
//!
//! ## Search & Ensembling
//! - [`seeker`] - Ensemble search over estimator configurations
//! - [`ensemble`] - Weighted risk ensembles, one weight vector per horizon
//!
//! ## Models & Metrics
//! - [`model`] - Estimator plugin traits, search spaces, registry, builtins
//! - [`metrics`] - Censoring-adjusted concordance index and Brier score
//!
//! ## Interpretability
//! - [`explainers`] - Population-shift effect sizes and symbolic pursuit
//!
//! ## Infrastructure
//! - [`hooks`] - Cooperative cancellation of long-running studies

// Core error handling
pub mod error;

// Search & ensembling
pub mod ensemble;
pub mod seeker;

// Models & metrics
pub mod metrics;
pub mod model;

// Interpretability
pub mod explainers;

// Study lifecycle
pub mod hooks;

pub use error::{PrognosError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PrognosError, Result};

    // Search
    pub use crate::seeker::{
        Candidate, CandidateScore, HorizonReport, RiskEnsembleSeeker, RiskSeekerConfig,
        SearchReport,
    };

    // Ensembling
    pub use crate::ensemble::WeightedRiskEnsemble;

    // Models
    pub use crate::model::{
        AftDistribution, AftModel, ClassifierModel, CoxPh, KaplanMeierBaseline, RegressorModel,
        RiskEstimator, RiskModelRegistry, SearchSpace, TaskType, TrialParams,
    };

    // Metrics
    pub use crate::metrics::{brier_score, concordance_index, KaplanMeier};

    // Interpretability
    pub use crate::explainers::{
        EffectSizeTable, Explainer, RiskEffectSize, RiskEffectSizeConfig, SymbolicPursuit,
        SymbolicPursuitConfig,
    };

    // Cancellation
    pub use crate::hooks::{CancelFlag, NoopHooks, StudyHooks};
}
