//! CART decision tree classifier
//!
//! Used as the base learner of [`super::random_forest::RandomForestClassifier`].
//! Splits are found by sorting each candidate feature once per node and
//! sweeping class counts from left to right.

use super::models::{check_fit_input, sorted_classes};
use crate::error::{Result, SelectionError};
use ndarray::{Array1, Array2};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node holding the index of the majority class
    Leaf { class_idx: usize, n_samples: usize },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Criterion {
    /// Gini impurity
    Gini,
    /// Shannon entropy
    Entropy,
}

impl Criterion {
    fn impurity(&self, counts: &[usize], n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let n = n as f64;
        match self {
            Criterion::Gini => {
                1.0 - counts
                    .iter()
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p
                    })
                    .sum::<f64>()
            }
            Criterion::Entropy => -counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
        }
    }
}

/// Decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth (None = grow until pure or too small)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split an internal node
    pub min_samples_split: usize,
    /// Minimum samples required in each leaf
    pub min_samples_leaf: usize,
    /// Number of features drawn at each split (None = all)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for feature sampling
    pub random_state: u64,
    n_features: usize,
    classes: Vec<i64>,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Row view of the training data shared by the recursive builder
struct TrainingView<'a> {
    x: &'a Array2<f64>,
    labels: &'a [usize],
    n_classes: usize,
}

impl DecisionTree {
    /// Create a new tree with permissive defaults
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: 0,
            n_features: 0,
            classes: Vec::new(),
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set number of features considered per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_fit_input(x, y)?;

        let classes = sorted_classes(y);
        let labels: Vec<usize> = y
            .iter()
            .map(|&v| classes.binary_search(&(v.round() as i64)).unwrap_or(0))
            .collect();
        let indices: Vec<usize> = (0..x.nrows()).collect();

        self.fit_encoded(x, &labels, classes, &indices)?;
        Ok(self)
    }

    /// Fit on a subset of rows with labels already encoded as indices into
    /// `classes`. `sample_indices` may contain repeats (bootstrap samples).
    pub(crate) fn fit_encoded(
        &mut self,
        x: &Array2<f64>,
        labels: &[usize],
        classes: Vec<i64>,
        sample_indices: &[usize],
    ) -> Result<()> {
        if sample_indices.is_empty() {
            return Err(SelectionError::ValidationError(
                "cannot fit a tree on zero samples".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(SelectionError::invalid_parameter(
                "min_samples_split",
                self.min_samples_split,
                "must be at least 2",
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(SelectionError::invalid_parameter(
                "min_samples_leaf",
                self.min_samples_leaf,
                "must be at least 1",
            ));
        }

        self.n_features = x.ncols();
        self.classes = classes;

        let view = TrainingView {
            x,
            labels,
            n_classes: self.classes.len(),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut importances = vec![0.0; self.n_features];

        let root = self.build_tree(&view, sample_indices.to_vec(), 0, &mut rng, &mut importances);
        self.root = Some(root);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(())
    }

    fn class_counts(&self, view: &TrainingView<'_>, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; view.n_classes];
        for &i in indices {
            counts[view.labels[i]] += 1;
        }
        counts
    }

    fn build_tree(
        &self,
        view: &TrainingView<'_>,
        indices: Vec<usize>,
        depth: usize,
        rng: &mut ChaCha8Rng,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let counts = self.class_counts(view, &indices);
        let leaf = TreeNode::Leaf {
            class_idx: majority(&counts),
            n_samples,
        };

        let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_pure;

        if should_stop {
            return leaf;
        }

        let parent_impurity = self.criterion.impurity(&counts, n_samples);

        let Some((feature_idx, threshold, gain)) =
            self.find_best_split(view, &indices, &counts, parent_impurity, rng)
        else {
            return leaf;
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| view.x[[i, feature_idx]] <= threshold);

        importances[feature_idx] += n_samples as f64 * gain;

        let left = Box::new(self.build_tree(view, left_indices, depth + 1, rng, importances));
        let right = Box::new(self.build_tree(view, right_indices, depth + 1, rng, importances));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
            impurity: parent_impurity,
        }
    }

    fn find_best_split(
        &self,
        view: &TrainingView<'_>,
        indices: &[usize],
        counts: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64, f64)> {
        let n_features = view.x.ncols();
        let n_try = self.max_features.unwrap_or(n_features).clamp(1, n_features);
        let candidates = sample(rng, n_features, n_try).into_vec();

        let n = indices.len();
        let mut best: Option<(usize, f64, f64)> = None;
        let mut column: Vec<(f64, usize)> = Vec::with_capacity(n);

        for feature_idx in candidates {
            column.clear();
            column.extend(indices.iter().map(|&i| (view.x[[i, feature_idx]], view.labels[i])));
            column.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let mut left_counts = vec![0usize; view.n_classes];
            let mut right_counts = counts.to_vec();

            for i in 0..n - 1 {
                let (value, label) = column[i];
                left_counts[label] += 1;
                right_counts[label] -= 1;

                let next_value = column[i + 1].0;
                if next_value <= value {
                    continue;
                }

                let left_n = i + 1;
                let right_n = n - left_n;
                if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                    continue;
                }

                let weighted = (left_n as f64 * self.criterion.impurity(&left_counts, left_n)
                    + right_n as f64 * self.criterion.impurity(&right_counts, right_n))
                    / n as f64;
                let gain = parent_impurity - weighted;

                if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature_idx, (value + next_value) / 2.0, gain));
                }
            }
        }

        best
    }

    /// Predict class indices (positions in the fitted class list)
    pub(crate) fn predict_indices(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let root = self.root.as_ref().ok_or(SelectionError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(SelectionError::ShapeError {
                expected: format!("{} columns", self.n_features),
                actual: format!("{} columns", x.ncols()),
            });
        }

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let mut node = root;
                loop {
                    match node {
                        TreeNode::Leaf { class_idx, .. } => break *class_idx,
                        TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                            node = if row[*feature_idx] <= *threshold { &**left } else { &**right };
                        }
                    }
                }
            })
            .collect())
    }

    /// Predict class codes
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let indices = self.predict_indices(x)?;
        Ok(indices.into_iter().map(|i| self.classes[i] as f64).collect())
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth (a lone leaf has depth 0)
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }

    /// Smallest leaf size in the fitted tree
    pub fn min_leaf_size(&self) -> Option<usize> {
        fn smallest(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { n_samples, .. } => *n_samples,
                TreeNode::Split { left, right, .. } => smallest(left).min(smallest(right)),
            }
        }
        self.root.as_ref().map(smallest)
    }
}

/// Index of the largest count; ties go to the lowest index
pub(crate) fn majority(counts: &[usize]) -> usize {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }
    best
}
