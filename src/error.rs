//! Error types for the Prognos AutoML engine

use thiserror::Error;

/// Result type alias for Prognos operations
pub type Result<T> = std::result::Result<T, PrognosError>;

/// Main error type for the Prognos engine
#[derive(Error, Debug)]
pub enum PrognosError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Study cancelled")]
    StudyCancelled,

    #[error("No candidate scored for horizon {horizon}")]
    NoViableCandidates { horizon: f64 },

    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl From<serde_json::Error> for PrognosError {
    fn from(err: serde_json::Error) -> Self {
        PrognosError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PrognosError {
    fn from(err: ndarray::ShapeError) -> Self {
        PrognosError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PrognosError::ConfigError("bad horizon list".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad horizon list");
    }

    #[test]
    fn test_cancellation_is_distinct() {
        let err = PrognosError::StudyCancelled;
        assert!(matches!(err, PrognosError::StudyCancelled));
        assert_eq!(err.to_string(), "Study cancelled");
    }

    #[test]
    fn test_unknown_plugin_display() {
        let err = PrognosError::UnknownPlugin("mystery_model".to_string());
        assert_eq!(err.to_string(), "Unknown plugin: mystery_model");
    }
}
