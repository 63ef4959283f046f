//! Grid search configuration

use crate::error::{Result, SelectionError};
use crate::evaluation::Scoring;
use crate::training::CVStrategy;
use serde::{Deserialize, Serialize};

/// Configuration for an exhaustive grid search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearchConfig {
    /// Cross-validation folds per configuration
    pub cv_folds: usize,

    /// Seed for fold assignment
    pub random_state: u64,

    /// Worker threads (None = all cores)
    pub n_jobs: Option<usize>,

    /// Metric to maximize
    pub scoring: Scoring,

    /// Wall-clock budget in seconds; units not yet started when it runs out
    /// are skipped
    pub timeout_secs: Option<f64>,

    /// Keep class proportions in every fold
    pub stratify: bool,
}

impl Default for GridSearchConfig {
    fn default() -> Self {
        Self {
            cv_folds: 5,
            random_state: 42,
            n_jobs: None,
            scoring: Scoring::Accuracy,
            timeout_secs: None,
            stratify: true,
        }
    }
}

impl GridSearchConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the number of folds
    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    /// Builder method to set the seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to set the number of worker threads
    pub fn with_n_jobs(mut self, n: usize) -> Self {
        self.n_jobs = Some(n);
        self
    }

    /// Builder method to set the scoring function
    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// Builder method to set timeout
    pub fn with_timeout(mut self, secs: f64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Builder method to toggle stratified folds
    pub fn with_stratify(mut self, stratify: bool) -> Self {
        self.stratify = stratify;
        self
    }

    /// Fold strategy implied by this configuration
    pub fn cv_strategy(&self) -> CVStrategy {
        if self.stratify {
            CVStrategy::StratifiedKFold { n_splits: self.cv_folds, shuffle: true }
        } else {
            CVStrategy::KFold { n_splits: self.cv_folds, shuffle: true }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cv_folds < 2 {
            return Err(SelectionError::ConfigError(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if self.n_jobs == Some(0) {
            return Err(SelectionError::ConfigError(
                "n_jobs must be at least 1".to_string(),
            ));
        }
        if let Some(t) = self.timeout_secs {
            if !(t > 0.0 && t.is_finite()) {
                return Err(SelectionError::ConfigError(format!(
                    "timeout_secs must be a positive number of seconds, got {}",
                    t
                )));
            }
        }
        Ok(())
    }
}
