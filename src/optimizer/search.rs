//! Exhaustive grid search with cross-validation
//!
//! Every (configuration, fold) pair is an independent fit-and-score unit.
//! Units run on a rayon pool; fold scores are gathered per configuration in
//! fold order, and each finished configuration is offered to a single
//! mutex-guarded running best. The comparison is a total order on
//! `(no failed fold, mean score, -grid index)`, so the winner never depends
//! on which unit finished first or how many threads ran.

use super::config::GridSearchConfig;
use super::grid::{Configuration, HyperparameterGrid};
use crate::error::{Result, SelectionError};
use crate::training::cross_validation::{score_fold, CVSplit, CrossValidator, ScoreRecord};
use crate::training::Pipeline;
use ndarray::{Array1, Array2};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Running best: ranking key and grid index of the leading configuration
#[derive(Debug, Clone, Copy, PartialEq)]
struct Leader {
    complete: bool,
    mean_score: f64,
    index: usize,
}

impl Leader {
    fn from_record(record: &ScoreRecord) -> Self {
        Self {
            complete: record.is_complete(),
            mean_score: record.mean_score,
            index: record.config_index,
        }
    }

    /// A configuration with a failed fold never beats one without; then the
    /// higher mean wins and equal means go to the earlier configuration
    fn beats(&self, other: &Leader) -> bool {
        if self.complete != other.complete {
            return self.complete;
        }
        self.mean_score > other.mean_score
            || (self.mean_score == other.mean_score && self.index < other.index)
    }
}

/// Outcome of [`GridSearchCV::fit`]
#[derive(Debug)]
pub struct SearchResult {
    /// Winning configuration
    pub best_config: Configuration,
    /// Mean cross-validated score of the winner
    pub best_score: f64,
    /// Standard deviation of the winner's fold scores
    pub best_std: f64,
    /// Winner refitted on all training rows
    pub best_pipeline: Pipeline,
    /// One record per fully evaluated configuration, in grid order
    pub cv_results: Vec<ScoreRecord>,
    pub n_candidates: usize,
    pub n_folds: usize,
    /// Fit-and-score units that actually ran
    pub n_fits: usize,
    /// The wall-clock budget ran out before every unit started
    pub timed_out: bool,
    pub elapsed_secs: f64,
    pub refit_time_secs: f64,
}

/// Serializable view of a [`SearchResult`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSummary {
    pub estimator: String,
    pub best_config: Configuration,
    pub best_score: f64,
    pub best_std: f64,
    pub n_candidates: usize,
    pub n_folds: usize,
    pub n_fits: usize,
    pub timed_out: bool,
    pub elapsed_secs: f64,
}

impl SearchResult {
    pub fn summary(&self) -> SearchSummary {
        SearchSummary {
            estimator: self.best_pipeline.estimator_name().to_string(),
            best_config: self.best_config.clone(),
            best_score: self.best_score,
            best_std: self.best_std,
            n_candidates: self.n_candidates,
            n_folds: self.n_folds,
            n_fits: self.n_fits,
            timed_out: self.timed_out,
            elapsed_secs: self.elapsed_secs,
        }
    }

    /// Predict with the refitted winner
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.best_pipeline.predict(x)
    }
}

/// Grid search over a pipeline template
pub struct GridSearchCV {
    template: Pipeline,
    grid: HyperparameterGrid,
    config: GridSearchConfig,
}

impl GridSearchCV {
    /// Create a new search
    pub fn new(template: Pipeline, grid: HyperparameterGrid, config: GridSearchConfig) -> Self {
        Self {
            template,
            grid,
            config,
        }
    }

    pub fn grid(&self) -> &HyperparameterGrid {
        &self.grid
    }

    pub fn config(&self) -> &GridSearchConfig {
        &self.config
    }

    /// Total fit-and-score units (without the final refit)
    pub fn n_fits(&self) -> usize {
        self.grid.len() * self.config.cv_folds
    }

    /// Score every configuration and refit the best on `x`/`y`
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<SearchResult> {
        let start = Instant::now();
        self.config.validate()?;

        if x.nrows() != y.len() {
            return Err(SelectionError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        let configs = self.grid.expand()?;

        // Unknown names and badly typed values are fatal, before any fit
        for config in &configs {
            self.template.clone_with_params(config)?;
        }

        let splits = CrossValidator::new(self.config.cv_strategy())
            .with_random_state(self.config.random_state)
            .split(y)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.n_jobs.unwrap_or(0))
            .build()
            .map_err(|e| SelectionError::TrainingError(format!("thread pool: {}", e)))?;

        info!(
            estimator = self.template.estimator_name(),
            n_candidates = configs.len(),
            n_folds = splits.len(),
            n_fits = configs.len() * splits.len(),
            n_threads = pool.current_num_threads(),
            n_samples = x.nrows(),
            "Starting grid search"
        );

        let deadline = self
            .config
            .timeout_secs
            .map(|t| start + Duration::from_secs_f64(t));
        let timed_out = AtomicBool::new(false);
        let leader: Mutex<Option<Leader>> = Mutex::new(None);

        let records: Vec<Option<ScoreRecord>> = pool.install(|| {
            configs
                .par_iter()
                .map(|config| {
                    let record = self.evaluate(config, x, y, &splits, deadline, &timed_out)?;

                    debug!(
                        config_index = record.config_index,
                        params = %config,
                        mean_score = record.mean_score,
                        std_score = record.std_score,
                        n_failed = record.n_failed,
                        "Configuration scored"
                    );

                    if record.is_viable() {
                        let candidate = Leader::from_record(&record);
                        let mut best = leader.lock();
                        if best.map_or(true, |current| candidate.beats(&current)) {
                            *best = Some(candidate);
                        }
                    }

                    Some(record)
                })
                .collect()
        });

        let timed_out = timed_out.load(Ordering::Relaxed);
        let cv_results: Vec<ScoreRecord> = records.into_iter().flatten().collect();
        let n_fits: usize = cv_results.iter().map(|r| r.n_folds()).sum();

        if timed_out {
            warn!(
                evaluated = cv_results.len(),
                n_candidates = configs.len(),
                "Grid search budget exhausted, reporting partial best"
            );
        }

        let Some(leader) = leader.into_inner() else {
            return Err(SelectionError::NoViableConfiguration {
                n_candidates: configs.len(),
            });
        };

        let best_record = cv_results
            .iter()
            .find(|r| r.config_index == leader.index)
            .ok_or_else(|| {
                SelectionError::TrainingError(format!(
                    "missing scores for configuration #{}",
                    leader.index
                ))
            })?;
        let best_config = configs[leader.index].clone();

        info!(
            config_index = best_config.index,
            params = %best_config,
            mean_score = best_record.mean_score,
            std_score = best_record.std_score,
            "Selected configuration"
        );

        let refit_start = Instant::now();
        let mut best_pipeline = self.template.clone_with_params(&best_config)?;
        pool.install(|| best_pipeline.fit(x, y)).map_err(|e| {
            SelectionError::TrainingError(format!(
                "refit of configuration #{} failed: {}",
                best_config.index, e
            ))
        })?;
        let refit_time_secs = refit_start.elapsed().as_secs_f64();

        info!(
            refit_time_secs,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Refit on full training partition"
        );

        Ok(SearchResult {
            best_score: best_record.mean_score,
            best_std: best_record.std_score,
            best_config,
            best_pipeline,
            n_candidates: configs.len(),
            n_folds: splits.len(),
            n_fits,
            timed_out,
            elapsed_secs: start.elapsed().as_secs_f64(),
            refit_time_secs,
            cv_results,
        })
    }

    /// Score one configuration on every fold. Returns `None` if any of its
    /// units was skipped because the deadline passed.
    fn evaluate(
        &self,
        config: &Configuration,
        x: &Array2<f64>,
        y: &Array1<f64>,
        splits: &[CVSplit],
        deadline: Option<Instant>,
        timed_out: &AtomicBool,
    ) -> Option<ScoreRecord> {
        // Outer `None` marks a skipped unit, inner `None` a failed fold
        let scores: Vec<Option<Option<f64>>> = splits
            .par_iter()
            .map(|split| {
                if deadline.map_or(false, |d| Instant::now() >= d) {
                    timed_out.store(true, Ordering::Relaxed);
                    return None;
                }
                Some(score_fold(&self.template, config, x, y, split, self.config.scoring))
            })
            .collect();

        let scores: Option<Vec<Option<f64>>> = scores.into_iter().collect();
        scores.map(|s| ScoreRecord::from_scores(config.index, s))
    }
}
