//! Hyperparameter search
//!
//! Provides:
//! - Hyperparameter grids and their ordered Cartesian expansion
//! - Exhaustive grid search with cross-validation and parallel evaluation

mod config;
mod grid;
mod search;

pub use config::GridSearchConfig;
pub use grid::{Configuration, GridIter, HyperparameterGrid, ParameterValue};
pub use search::{GridSearchCV, SearchResult, SearchSummary};
