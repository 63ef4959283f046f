//! Model training module
//!
//! Provides the classifiers searched by the selector and the machinery to
//! evaluate them:
//! - Decision trees and Random Forests
//! - Support Vector Machines (one-vs-rest SMO)
//! - Standardize-then-classify pipelines
//! - K-fold and stratified cross-validation

mod config;
mod models;
pub mod cross_validation;
pub mod decision_tree;
pub mod pipeline;
pub mod random_forest;
pub mod svm;

pub use config::ModelFamily;
pub use models::Estimator;
pub use cross_validation::{
    cross_val_score, cross_validate, CVSplit, CVStrategy, CrossValidateReport, CrossValidator,
    FoldReport, ScoreRecord,
};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use pipeline::Pipeline;
pub use random_forest::{MaxFeatures, RandomForestClassifier};
pub use svm::{Gamma, KernelKind, KernelType, SvmClassifier};
