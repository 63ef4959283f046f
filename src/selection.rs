//! End-to-end selection run: split, search, validate, evaluate

use crate::config::SelectionConfig;
use crate::data::{DataSplit, Dataset};
use crate::error::{Result, SelectionError};
use crate::evaluation::ClassificationReport;
use crate::optimizer::{GridSearchCV, HyperparameterGrid, SearchSummary};
use crate::training::{
    cross_validate, CVStrategy, CrossValidateReport, CrossValidator, ModelFamily, ScoreRecord,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Outcome for one model family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyReport {
    pub family: ModelFamily,
    pub search: SearchSummary,
    /// Per-configuration fold scores, in grid order
    pub cv_results: Vec<ScoreRecord>,
    /// Stability check of the winner on the validation partition
    pub validation: Option<CrossValidateReport>,
    /// Winner's predictions on the test partition
    pub test_report: ClassificationReport,
}

impl FamilyReport {
    pub fn test_accuracy(&self) -> f64 {
        self.test_report.accuracy
    }
}

/// A family that produced no model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyFailure {
    pub family: ModelFamily,
    pub error: String,
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionReport {
    /// Train / validation / test row counts
    pub split_sizes: [usize; 3],
    pub n_features: usize,
    pub class_names: Vec<String>,
    pub config: SelectionConfig,
    /// Families that completed, in request order
    pub families: Vec<FamilyReport>,
    #[serde(default)]
    pub failures: Vec<FamilyFailure>,
    pub generated_at: DateTime<Utc>,
}

impl SelectionReport {
    /// Family with the highest cross-validated score; earlier families win
    /// ties. Test accuracy is reported but never used to choose.
    pub fn best_family(&self) -> Option<&FamilyReport> {
        self.families.iter().fold(None, |best: Option<&FamilyReport>, f| match best {
            Some(b) if b.search.best_score >= f.search.best_score => Some(b),
            _ => Some(f),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Runs grid search for each requested family on a shared split
pub struct ModelSelection {
    config: SelectionConfig,
    grids: HashMap<ModelFamily, HyperparameterGrid>,
}

impl ModelSelection {
    pub fn new(config: SelectionConfig) -> Self {
        Self {
            config,
            grids: HashMap::new(),
        }
    }

    /// Replace the default grid of `family`
    pub fn with_grid(mut self, family: ModelFamily, grid: HyperparameterGrid) -> Self {
        self.grids.insert(family, grid);
        self
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Grid searched for `family`
    pub fn grid(&self, family: ModelFamily) -> HyperparameterGrid {
        self.grids
            .get(&family)
            .cloned()
            .unwrap_or_else(|| family.default_grid())
    }

    /// Split once, then search, validate and test every family independently
    pub fn run(&self, dataset: &Dataset, families: &[ModelFamily]) -> Result<SelectionReport> {
        self.config.validate()?;
        if families.is_empty() {
            return Err(SelectionError::ConfigError(
                "at least one model family is required".to_string(),
            ));
        }

        let split = dataset.split(&self.config.split, self.config.random_state)?;
        let split_sizes = split.indices.sizes();
        info!(
            train = split_sizes[0],
            validation = split_sizes[1],
            test = split_sizes[2],
            seed = self.config.random_state,
            "Split dataset"
        );

        let mut reports = Vec::with_capacity(families.len());
        let mut failures = Vec::new();
        let mut first_error = None;
        for &family in families {
            match self.run_family(family, &split) {
                Ok(report) => reports.push(report),
                // Bad grids and parameters are the caller's mistake, not the family's
                Err(e @ (SelectionError::InvalidGrid(_)
                | SelectionError::InvalidParameter { .. }
                | SelectionError::ConfigError(_))) => return Err(e),
                Err(e) => {
                    warn!(family = %family, error = %e, "Family produced no model");
                    failures.push(FamilyFailure {
                        family,
                        error: e.to_string(),
                    });
                    first_error.get_or_insert(e);
                }
            }
        }

        if reports.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        Ok(SelectionReport {
            split_sizes,
            n_features: dataset.n_features(),
            class_names: dataset.class_names.clone(),
            config: self.config.clone(),
            families: reports,
            failures,
            generated_at: Utc::now(),
        })
    }

    /// Search on Training, validate on Validation, evaluate on Test
    fn run_family(&self, family: ModelFamily, split: &DataSplit) -> Result<FamilyReport> {
        let template = family.base_pipeline(self.config.random_state);
        let search = GridSearchCV::new(
            family.base_pipeline(self.config.random_state),
            self.grid(family),
            self.config.grid_search_config(),
        );
        let result = search.fit(&split.train.features, &split.train.labels)?;

        let validator = CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: self.config.validation_folds,
            shuffle: true,
        })
        .with_random_state(self.config.random_state);

        let validation = match cross_validate(
            &template,
            &result.best_config,
            &split.validation.features,
            &split.validation.labels,
            &validator,
            self.config.scoring,
        ) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(family = %family, error = %e, "Validation stage failed");
                None
            }
        };

        let predictions = result.predict(&split.test.features)?;
        let test_report = ClassificationReport::from_predictions(&split.test.labels, &predictions)?;

        info!(
            family = %family,
            cv_score = result.best_score,
            validation_score = validation.as_ref().map(|v| v.mean_test_score),
            test_accuracy = test_report.accuracy,
            "Family evaluated"
        );

        Ok(FamilyReport {
            family,
            search: result.summary(),
            cv_results: result.cv_results,
            validation,
            test_report,
        })
    }
}
