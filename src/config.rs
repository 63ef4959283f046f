//! Run-level configuration

use crate::data::SplitRatios;
use crate::error::{Result, SelectionError};
use crate::evaluation::Scoring;
use crate::optimizer::GridSearchConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for a full selection run: split, search and validation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Seed for the split, the folds and the estimators
    pub random_state: u64,
    /// Folds used while searching the grid
    pub cv_folds: usize,
    /// Train / validation / test fractions
    pub split: SplitRatios,
    /// Worker threads (None = all cores)
    pub n_jobs: Option<usize>,
    pub scoring: Scoring,
    /// Wall-clock budget for each family's grid search
    pub timeout_secs: Option<f64>,
    /// Folds of the stability check on the validation partition
    pub validation_folds: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            random_state: 42,
            cv_folds: 5,
            split: SplitRatios::default(),
            n_jobs: None,
            scoring: Scoring::Accuracy,
            timeout_secs: None,
            validation_folds: 5,
        }
    }
}

impl SelectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_split(mut self, split: SplitRatios) -> Self {
        self.split = split;
        self
    }

    pub fn with_n_jobs(mut self, n: usize) -> Self {
        self.n_jobs = Some(n);
        self
    }

    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_timeout(mut self, secs: f64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_validation_folds(mut self, folds: usize) -> Self {
        self.validation_folds = folds;
        self
    }

    /// Read a JSON file; missing keys keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: SelectionConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.split.validate()?;
        self.grid_search_config().validate()?;
        if self.validation_folds < 2 {
            return Err(SelectionError::ConfigError(format!(
                "validation_folds must be at least 2, got {}",
                self.validation_folds
            )));
        }
        Ok(())
    }

    /// Engine settings for one family's search
    pub fn grid_search_config(&self) -> GridSearchConfig {
        GridSearchConfig {
            cv_folds: self.cv_folds,
            random_state: self.random_state,
            n_jobs: self.n_jobs,
            scoring: self.scoring,
            timeout_secs: self.timeout_secs,
            stratify: true,
        }
    }
}
