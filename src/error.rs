//! Error types for model selection

use thiserror::Error;

/// Result type alias for model selection operations
pub type Result<T> = std::result::Result<T, SelectionError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum SelectionError {
    /// A hyperparameter grid that cannot be expanded
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// A single fold failed to fit or score
    #[error("Fold {fold} failed for configuration #{config_index}: {reason}")]
    FoldFit {
        config_index: usize,
        fold: usize,
        reason: String,
    },

    /// Requested split proportions leave a partition empty
    #[error("Partition '{partition}' would be empty for {n_samples} samples")]
    EmptyPartition {
        partition: String,
        n_samples: usize,
    },

    /// Every configuration failed on every fold
    #[error("No viable configuration among {n_candidates} candidates")]
    NoViableConfiguration { n_candidates: usize },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl SelectionError {
    /// Shorthand for an [`SelectionError::InvalidParameter`]
    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        SelectionError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<polars::error::PolarsError> for SelectionError {
    fn from(err: polars::error::PolarsError) -> Self {
        SelectionError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for SelectionError {
    fn from(err: serde_json::Error) -> Self {
        SelectionError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for SelectionError {
    fn from(err: ndarray::ShapeError) -> Self {
        SelectionError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
