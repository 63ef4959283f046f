//! Cross-validation: fold construction and per-configuration scoring

use super::pipeline::Pipeline;
use crate::error::{Result, SelectionError};
use crate::evaluation::Scoring;
use crate::optimizer::Configuration;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::warn;

/// Cross-validation strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CVStrategy {
    /// K-Fold cross-validation
    KFold { n_splits: usize, shuffle: bool },
    /// Stratified K-Fold (maintains class distribution)
    StratifiedKFold { n_splits: usize, shuffle: bool },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::StratifiedKFold { n_splits: 5, shuffle: true }
    }
}

impl CVStrategy {
    pub fn n_splits(&self) -> usize {
        match self {
            CVStrategy::KFold { n_splits, .. } | CVStrategy::StratifiedKFold { n_splits, .. } => {
                *n_splits
            }
        }
    }
}

/// A single train/test split
#[derive(Debug, Clone, PartialEq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
#[derive(Debug, Clone)]
pub struct CrossValidator {
    strategy: CVStrategy,
    random_state: u64,
}

impl CrossValidator {
    /// Create a new cross-validator
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: 42,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn strategy(&self) -> CVStrategy {
        self.strategy
    }

    /// Generate train/test splits over the rows of `y`
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        let n_samples = y.len();
        let n_splits = self.strategy.n_splits();

        if n_splits < 2 {
            return Err(SelectionError::ValidationError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < n_splits {
            return Err(SelectionError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, n_splits
            )));
        }

        let folds = match self.strategy {
            CVStrategy::KFold { shuffle, .. } => self.k_fold(n_samples, n_splits, shuffle),
            CVStrategy::StratifiedKFold { shuffle, .. } => {
                self.stratified_k_fold(y, n_splits, shuffle)
            }
        };

        Ok(Self::rotate(folds))
    }

    fn k_fold(&self, n_samples: usize, n_splits: usize, shuffle: bool) -> Vec<Vec<usize>> {
        let mut indices: Vec<usize> = (0..n_samples).collect();

        if shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
            indices.shuffle(&mut rng);
        }

        let base = n_samples / n_splits;
        let remainder = n_samples % n_splits;

        let mut folds = Vec::with_capacity(n_splits);
        let mut current = 0;
        for fold_idx in 0..n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            folds.push(indices[current..current + fold_size].to_vec());
            current += fold_size;
        }
        folds
    }

    fn stratified_k_fold(&self, y: &Array1<f64>, n_splits: usize, shuffle: bool) -> Vec<Vec<usize>> {
        // Ordered by class code so the layout does not depend on hashing
        let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        if shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        // Deal classes out one after another, continuing where the previous
        // class stopped, so fold sizes differ by at most one
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        let mut next = 0;
        for indices in class_indices.values() {
            for &idx in indices {
                folds[next % n_splits].push(idx);
                next += 1;
            }
        }
        folds
    }

    fn rotate(folds: Vec<Vec<usize>>) -> Vec<CVSplit> {
        (0..folds.len())
            .map(|fold_idx| CVSplit {
                test_indices: folds[fold_idx].clone(),
                train_indices: folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect(),
                fold_idx,
            })
            .collect()
    }
}

/// Per-fold scores of one configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Position of the configuration in grid order
    pub config_index: usize,
    /// Score of each fold in fold order; `None` where the fit or predict failed
    pub scores: Vec<Option<f64>>,
    /// Mean over the successful folds (0 when none succeeded)
    pub mean_score: f64,
    /// Standard deviation over the successful folds
    pub std_score: f64,
    /// Number of folds that failed
    pub n_failed: usize,
}

impl ScoreRecord {
    /// Create a record from fold scores
    pub fn from_scores(config_index: usize, scores: Vec<Option<f64>>) -> Self {
        let successful: Vec<f64> = scores.iter().flatten().copied().collect();
        let n_failed = scores.len() - successful.len();

        let (mean_score, std_score) = if successful.is_empty() {
            (0.0, 0.0)
        } else {
            let n = successful.len() as f64;
            let mean = successful.iter().sum::<f64>() / n;
            let var = successful.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
            (mean, var.sqrt())
        };

        Self {
            config_index,
            scores,
            mean_score,
            std_score,
            n_failed,
        }
    }

    pub fn n_folds(&self) -> usize {
        self.scores.len()
    }

    /// At least one fold produced a real score
    pub fn is_viable(&self) -> bool {
        self.n_failed < self.scores.len()
    }

    /// Every fold produced a real score
    pub fn is_complete(&self) -> bool {
        self.n_failed == 0
    }
}

fn take_rows(x: &Array2<f64>, y: &Array1<f64>, indices: &[usize]) -> (Array2<f64>, Array1<f64>) {
    (x.select(Axis(0), indices), y.select(Axis(0), indices))
}

/// Fit a fresh pipeline for `params` on the training side of `split` and
/// score it on the held-out side.
pub fn fit_and_score(
    template: &Pipeline,
    params: &Configuration,
    x: &Array2<f64>,
    y: &Array1<f64>,
    split: &CVSplit,
    scoring: Scoring,
) -> Result<f64> {
    let fold_error = |reason: String| SelectionError::FoldFit {
        config_index: params.index,
        fold: split.fold_idx,
        reason,
    };

    let mut pipeline = template.clone_with_params(params)?;
    let (x_train, y_train) = take_rows(x, y, &split.train_indices);
    let (x_test, y_test) = take_rows(x, y, &split.test_indices);

    pipeline
        .fit(&x_train, &y_train)
        .map_err(|e| fold_error(e.to_string()))?;
    let score = pipeline
        .score(&x_test, &y_test, scoring)
        .map_err(|e| fold_error(e.to_string()))?;

    if score.is_finite() {
        Ok(score)
    } else {
        Err(fold_error(format!("non-finite score {}", score)))
    }
}

/// Like [`fit_and_score`], but a failed fold is logged and yields `None`
pub fn score_fold(
    template: &Pipeline,
    params: &Configuration,
    x: &Array2<f64>,
    y: &Array1<f64>,
    split: &CVSplit,
    scoring: Scoring,
) -> Option<f64> {
    match fit_and_score(template, params, x, y, split, scoring) {
        Ok(score) => Some(score),
        Err(e) => {
            warn!(
                config_index = params.index,
                fold = split.fold_idx,
                params = %params,
                error = %e,
                "Fold failed, scoring as failure"
            );
            None
        }
    }
}

/// Score one configuration on every split.
///
/// Unknown parameter names or wrongly typed values are returned as errors;
/// failures inside a fold are absorbed into the record.
pub fn cross_val_score(
    template: &Pipeline,
    params: &Configuration,
    x: &Array2<f64>,
    y: &Array1<f64>,
    splits: &[CVSplit],
    scoring: Scoring,
) -> Result<ScoreRecord> {
    template.clone_with_params(params)?;

    let scores: Vec<Option<f64>> = splits
        .par_iter()
        .map(|split| score_fold(template, params, x, y, split, scoring))
        .collect();

    Ok(ScoreRecord::from_scores(params.index, scores))
}

/// Timings and scores of one fold in [`cross_validate`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldReport {
    pub fold: usize,
    pub fit_time_secs: f64,
    pub score_time_secs: f64,
    pub test_score: f64,
    pub train_score: f64,
}

/// Result of [`cross_validate`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossValidateReport {
    pub folds: Vec<FoldReport>,
    pub mean_test_score: f64,
    pub std_test_score: f64,
    pub mean_train_score: f64,
}

impl CrossValidateReport {
    fn from_folds(folds: Vec<FoldReport>) -> Self {
        let test = ScoreRecord::from_scores(0, folds.iter().map(|f| Some(f.test_score)).collect());
        let n = folds.len().max(1) as f64;
        let mean_train_score = folds.iter().map(|f| f.train_score).sum::<f64>() / n;

        Self {
            mean_test_score: test.mean_score,
            std_test_score: test.std_score,
            mean_train_score,
            folds,
        }
    }

    pub fn test_scores(&self) -> Vec<f64> {
        self.folds.iter().map(|f| f.test_score).collect()
    }
}

/// Cross-validate one configuration, refitting a fresh pipeline per fold
/// and recording fit/score times plus train and test scores. Any fold
/// failure is returned as [`SelectionError::FoldFit`].
pub fn cross_validate(
    template: &Pipeline,
    params: &Configuration,
    x: &Array2<f64>,
    y: &Array1<f64>,
    cv: &CrossValidator,
    scoring: Scoring,
) -> Result<CrossValidateReport> {
    let splits = cv.split(y)?;

    let folds = splits
        .par_iter()
        .map(|split| -> Result<FoldReport> {
            let fold_error = |e: SelectionError| SelectionError::FoldFit {
                config_index: params.index,
                fold: split.fold_idx,
                reason: e.to_string(),
            };

            let mut pipeline = template.clone_with_params(params)?;
            let (x_train, y_train) = take_rows(x, y, &split.train_indices);
            let (x_test, y_test) = take_rows(x, y, &split.test_indices);

            let start = Instant::now();
            pipeline.fit(&x_train, &y_train).map_err(fold_error)?;
            let fit_time_secs = start.elapsed().as_secs_f64();

            let start = Instant::now();
            let test_score = pipeline.score(&x_test, &y_test, scoring).map_err(fold_error)?;
            let score_time_secs = start.elapsed().as_secs_f64();

            let train_score = pipeline.score(&x_train, &y_train, scoring).map_err(fold_error)?;

            Ok(FoldReport {
                fold: split.fold_idx,
                fit_time_secs,
                score_time_secs,
                test_score,
                train_score,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CrossValidateReport::from_folds(folds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{RandomForestClassifier, SvmClassifier};

    fn coverage(splits: &[CVSplit], n: usize) {
        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort();
        assert_eq!(all_test, (0..n).collect::<Vec<_>>());

        for split in splits {
            assert_eq!(split.train_indices.len() + split.test_indices.len(), n);
            for idx in &split.test_indices {
                assert!(!split.train_indices.contains(idx));
            }
        }
    }

    #[test]
    fn test_k_fold() {
        let y = Array1::zeros(100);
        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 5, shuffle: false });
        let splits = cv.split(&y).unwrap();

        assert_eq!(splits.len(), 5);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 20);
            assert_eq!(split.train_indices.len(), 80);
        }
        coverage(&splits, 100);
    }

    #[test]
    fn test_stratified_k_fold() {
        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]);

        let cv = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 5, shuffle: false });
        let splits = cv.split(&y).unwrap();

        assert_eq!(splits.len(), 5);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 2);
            let ones = split.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
            assert_eq!(ones, 1);
        }
    }

    #[test]
    fn test_stratified_uneven_classes_cover_every_row_once() {
        let y = Array1::from_shape_fn(103, |i| (i % 4 == 0) as u8 as f64 + (i % 7 == 0) as u8 as f64);
        let cv = CrossValidator::new(CVStrategy::default()).with_random_state(3);
        let splits = cv.split(&y).unwrap();

        coverage(&splits, 103);
        let sizes: Vec<usize> = splits.iter().map(|s| s.test_indices.len()).collect();
        let (min, max) = (sizes.iter().min().unwrap(), sizes.iter().max().unwrap());
        assert!(max - min <= 1);
    }

    #[test]
    fn test_same_seed_same_folds() {
        let y = Array1::from_shape_fn(50, |i| (i % 3) as f64);
        let a = CrossValidator::new(CVStrategy::default()).with_random_state(9).split(&y).unwrap();
        let b = CrossValidator::new(CVStrategy::default()).with_random_state(9).split(&y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_too_few_samples() {
        let y = Array1::zeros(3);
        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 5, shuffle: true });
        assert!(matches!(cv.split(&y), Err(SelectionError::ValidationError(_))));
    }

    #[test]
    fn test_score_record_with_failed_fold() {
        let record = ScoreRecord::from_scores(2, vec![Some(0.8), None, Some(0.6)]);
        assert_eq!(record.n_failed, 1);
        assert!(record.is_viable());
        assert!(!record.is_complete());
        assert!((record.mean_score - 0.7).abs() < 1e-12);
        assert!((record.std_score - 0.1).abs() < 1e-12);

        let dead = ScoreRecord::from_scores(3, vec![None; 3]);
        assert!(!dead.is_viable());
        assert_eq!(dead.mean_score, 0.0);
    }

    #[test]
    fn test_score_record_with_failed_fold_survives_json() {
        let record = ScoreRecord::from_scores(0, vec![Some(0.9), Some(0.8), None, Some(0.85), Some(0.9)]);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("null"));

        let back: ScoreRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.n_failed, 1);
        assert!((back.mean_score - 0.8625).abs() < 1e-12);
    }

    fn blobs(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| (i % 2) as f64 * 4.0 + ((i * 31 + j * 17) % 10) as f64 / 10.0);
        let y = Array1::from_shape_fn(n, |i| (i % 2) as f64);
        (x, y)
    }

    #[test]
    fn test_cross_val_score_absorbs_fold_failures() {
        let (x, y) = blobs(40);
        let template = Pipeline::new(Box::new(SvmClassifier::new()));
        let splits = CrossValidator::new(CVStrategy::default()).split(&y).unwrap();

        let failing = Configuration::from_pairs(vec![("max_iter", 0i64)]);
        let record = cross_val_score(&template, &failing, &x, &y, &splits, Scoring::Accuracy).unwrap();
        assert_eq!(record.n_failed, 5);

        let valid = Configuration::from_pairs(vec![("max_iter", 200i64)]);
        let record = cross_val_score(&template, &valid, &x, &y, &splits, Scoring::Accuracy).unwrap();
        assert_eq!(record.n_failed, 0);
        assert!(record.mean_score > 0.9);
    }

    #[test]
    fn test_cross_val_score_rejects_unknown_parameter() {
        let (x, y) = blobs(20);
        let template = Pipeline::new(Box::new(RandomForestClassifier::new(3)));
        let splits = CrossValidator::new(CVStrategy::default()).split(&y).unwrap();

        let params = Configuration::from_pairs(vec![("depth", 3i64)]);
        assert!(cross_val_score(&template, &params, &x, &y, &splits, Scoring::Accuracy).is_err());
    }

    #[test]
    fn test_cross_validate_report() {
        let (x, y) = blobs(30);
        let template = Pipeline::new(Box::new(RandomForestClassifier::new(5)));
        let params = Configuration::from_pairs(vec![("max_depth", 3i64)]);
        let cv = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 3, shuffle: true });

        let report = cross_validate(&template, &params, &x, &y, &cv, Scoring::Accuracy).unwrap();
        assert_eq!(report.folds.len(), 3);
        for fold in &report.folds {
            assert!(fold.fit_time_secs >= 0.0);
            assert!((0.0..=1.0).contains(&fold.test_score));
            assert!((0.0..=1.0).contains(&fold.train_score));
        }
        assert_eq!(report.test_scores().len(), 3);
        assert!((0.0..=1.0).contains(&report.mean_train_score));
    }
}
