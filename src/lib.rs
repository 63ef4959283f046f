//! model-select - Grid-search model selection for tabular classification
//!
//! Given a numerically encoded dataset and a categorical target, this crate
//! explores a discrete hyperparameter grid for each classifier family,
//! scores every configuration with k-fold cross-validation in parallel,
//! deterministically selects the best, refits it and reports held-out
//! performance.
//!
//! # Modules
//!
//! ## Core
//! - [`optimizer`] - Grid expansion and the parallel grid search engine
//! - [`training`] - Estimators, pipelines and cross-validation
//! - [`preprocessing`] - Feature standardization
//! - [`data`] - Datasets and the seeded train/validation/test split
//!
//! ## Around the core
//! - [`evaluation`] - Accuracy, confusion matrix, classification report
//! - [`selection`] - End-to-end run over several model families
//! - [`config`] - Run configuration
//! - [`utils`] - CSV loading and encoding
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core modules
pub mod data;
pub mod optimizer;
pub mod preprocessing;
pub mod training;

// Around the core
pub mod config;
pub mod evaluation;
pub mod selection;
pub mod utils;

// Services
pub mod cli;

pub use error::{Result, SelectionError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, SelectionError};

    // Data
    pub use crate::data::{train_val_test_split, DataSplit, Dataset, SplitIndices, SplitRatios};

    // Preprocessing
    pub use crate::preprocessing::StandardScaler;

    // Training
    pub use crate::training::{
        cross_val_score, cross_validate, CVStrategy, CrossValidator, Estimator, ModelFamily,
        Pipeline, RandomForestClassifier, ScoreRecord, SvmClassifier,
    };

    // Optimization
    pub use crate::optimizer::{
        Configuration, GridSearchCV, GridSearchConfig, HyperparameterGrid, ParameterValue,
        SearchResult,
    };

    // Evaluation
    pub use crate::evaluation::{accuracy, ClassificationReport, ConfusionMatrix, Scoring};

    // Orchestration
    pub use crate::config::SelectionConfig;
    pub use crate::selection::{ModelSelection, SelectionReport};
    pub use crate::utils::{DataLoader, LoadingConfig};
}
