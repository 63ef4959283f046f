//! Model families and their default search grids

use super::pipeline::Pipeline;
use super::random_forest::RandomForestClassifier;
use super::svm::SvmClassifier;
use crate::error::{Result, SelectionError};
use crate::optimizer::{HyperparameterGrid, ParameterValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classifier families the selector knows how to search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    RandomForest,
    SupportVector,
}

impl ModelFamily {
    pub fn all() -> [ModelFamily; 2] {
        [ModelFamily::RandomForest, ModelFamily::SupportVector]
    }

    /// Standardize-then-classify template with default settings
    pub fn base_pipeline(&self, random_state: u64) -> Pipeline {
        match self {
            ModelFamily::RandomForest => Pipeline::new(Box::new(
                RandomForestClassifier::default().with_random_state(random_state),
            )),
            ModelFamily::SupportVector => Pipeline::new(Box::new(
                SvmClassifier::new().with_random_state(random_state),
            )),
        }
    }

    /// Candidate values searched when no grid is given
    pub fn default_grid(&self) -> HyperparameterGrid {
        match self {
            ModelFamily::RandomForest => HyperparameterGrid::new()
                .int("n_estimators", &[500, 700])
                .int("max_depth", &[10, 20])
                .int("min_samples_split", &[10, 20])
                .int("min_samples_leaf", &[5, 10])
                .categorical("max_features", &["sqrt"]),
            ModelFamily::SupportVector => HyperparameterGrid::new()
                .float("C", &[1.0, 5.0])
                .categorical("kernel", &["rbf"])
                .values(
                    "gamma",
                    vec![ParameterValue::from("scale"), ParameterValue::Float(0.1)],
                )
                .values(
                    "max_iter",
                    vec![ParameterValue::Int(500), ParameterValue::Unlimited],
                ),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::RandomForest => "random_forest",
            ModelFamily::SupportVector => "svc",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "random_forest" | "rf" | "forest" => Ok(ModelFamily::RandomForest),
            "svc" | "svm" | "support_vector" => Ok(ModelFamily::SupportVector),
            other => Err(SelectionError::ConfigError(format!(
                "unknown model family '{}', expected 'random_forest' or 'svc'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_sizes() {
        assert_eq!(ModelFamily::RandomForest.default_grid().len(), 16);
        assert_eq!(ModelFamily::SupportVector.default_grid().len(), 8);
    }

    #[test]
    fn test_default_grids_are_accepted() {
        for family in ModelFamily::all() {
            let template = family.base_pipeline(42);
            for config in family.default_grid().expand().unwrap() {
                assert!(template.clone_with_params(&config).is_ok(), "{}", config);
            }
        }
    }

    #[test]
    fn test_parse_family() {
        assert_eq!("rf".parse::<ModelFamily>().unwrap(), ModelFamily::RandomForest);
        assert_eq!("SVC".parse::<ModelFamily>().unwrap(), ModelFamily::SupportVector);
        assert!("knn".parse::<ModelFamily>().is_err());
        assert_eq!(ModelFamily::SupportVector.to_string(), "svc");
    }
}
