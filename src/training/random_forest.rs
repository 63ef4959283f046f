//! Random Forest classifier

use super::decision_tree::{majority, Criterion, DecisionTree};
use super::models::{
    check_fit_input, expect_bool, expect_int, expect_optional_int, sorted_classes,
    unknown_parameter, Estimator,
};
use crate::error::{Result, SelectionError};
use crate::optimizer::{Configuration, ParameterValue};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random Forest classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn at each split (sqrt by default)
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Base seed; tree `i` is seeded with `random_state + i`
    pub random_state: u64,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
    /// Number of features
    n_features: usize,
    /// Sorted class codes seen during fit
    classes: Vec<i64>,
}

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    fn parse(value: &ParameterValue) -> Result<Self> {
        match value {
            ParameterValue::String(s) => match s.as_str() {
                "sqrt" | "auto" => Ok(MaxFeatures::Sqrt),
                "log2" => Ok(MaxFeatures::Log2),
                "all" => Ok(MaxFeatures::All),
                _ => Err(SelectionError::invalid_parameter(
                    "max_features",
                    s,
                    "expected 'sqrt', 'log2', 'all', an integer or a fraction",
                )),
            },
            ParameterValue::Unlimited => Ok(MaxFeatures::All),
            ParameterValue::Int(n) => Ok(MaxFeatures::Fixed((*n).max(0) as usize)),
            ParameterValue::Float(f) => Ok(MaxFeatures::Fraction(*f)),
            ParameterValue::Bool(_) => Err(SelectionError::invalid_parameter(
                "max_features",
                value,
                "expected 'sqrt', 'log2', 'all', an integer or a fraction",
            )),
        }
    }
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Negative counts saturate to zero so that `fit` rejects them
fn expect_count(name: &str, value: &ParameterValue) -> Result<usize> {
    Ok(expect_int(name, value)?.max(0) as usize)
}

impl RandomForestClassifier {
    /// Create a new forest with `n_estimators` trees
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: 42,
            feature_importances: None,
            n_features: 0,
            classes: Vec::new(),
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

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Enable or disable bootstrap sampling
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    fn compute_max_features(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .clamp(1, n_features.max(1))
    }

    fn check_params(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(SelectionError::invalid_parameter(
                "n_estimators",
                self.n_estimators,
                "must be at least 1",
            ));
        }
        if self.max_depth == Some(0) {
            return Err(SelectionError::invalid_parameter("max_depth", 0, "must be at least 1"));
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
        match self.max_features {
            MaxFeatures::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                Err(SelectionError::invalid_parameter("max_features", f, "fraction must be in (0, 1]"))
            }
            MaxFeatures::Fixed(0) => {
                Err(SelectionError::invalid_parameter("max_features", 0, "must be at least 1"))
            }
            _ => Ok(()),
        }
    }

    fn fit_forest(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        self.check_params()?;

        let n_samples = x.nrows();
        self.n_features = x.ncols();
        let max_features = self.compute_max_features(self.n_features);

        let classes = sorted_classes(y);
        let labels: Vec<usize> = y
            .iter()
            .map(|&v| classes.binary_search(&(v.round() as i64)).unwrap_or(0))
            .collect();

        // Build trees in parallel
        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<DecisionTree> {
                let seed = self.random_state.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = DecisionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_criterion(self.criterion)
                    .with_random_state(seed);
                tree.max_depth = self.max_depth;

                tree.fit_encoded(x, &labels, classes.clone(), &sample_indices)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.classes = classes;
        self.compute_feature_importances();

        Ok(())
    }

    fn compute_feature_importances(&mut self) {
        if self.trees.is_empty() {
            return;
        }

        let mut total_importances = vec![0.0; self.n_features];

        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (total, &val) in total_importances.iter_mut().zip(imp.iter()) {
                    *total += val;
                }
            }
        }

        let total: f64 = total_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut total_importances {
                *imp /= total;
            }
        }

        self.feature_importances = Some(Array1::from_vec(total_importances));
    }

    /// Per-class vote counts, one row per sample
    fn votes(&self, x: &Array2<f64>) -> Result<Array2<usize>> {
        if self.trees.is_empty() {
            return Err(SelectionError::ModelNotFitted);
        }

        let all_predictions: Vec<Vec<usize>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_indices(x))
            .collect::<Result<Vec<_>>>()?;

        let mut votes = Array2::zeros((x.nrows(), self.classes.len()));
        for preds in &all_predictions {
            for (i, &class_idx) in preds.iter().enumerate() {
                votes[[i, class_idx]] += 1;
            }
        }
        Ok(votes)
    }

    /// Predict class probabilities as vote fractions
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let votes = self.votes(x)?;
        let n_trees = self.trees.len() as f64;
        Ok(votes.mapv(|v| v as f64 / n_trees))
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Class codes seen during fit
    pub fn classes(&self) -> &[i64] {
        &self.classes
    }
}

impl Estimator for RandomForestClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.fit_forest(x, y)
    }

    /// Majority vote; ties go to the lowest class code
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let votes = self.votes(x)?;
        Ok(votes
            .rows()
            .into_iter()
            .map(|row| {
                let counts: Vec<usize> = row.to_vec();
                self.classes[majority(&counts)] as f64
            })
            .collect())
    }

    fn clone_with_params(&self, params: &Configuration) -> Result<Box<dyn Estimator>> {
        let mut model = Self {
            trees: Vec::new(),
            feature_importances: None,
            n_features: 0,
            classes: Vec::new(),
            ..self.clone()
        };

        for (name, value) in params.iter() {
            match name {
                "n_estimators" => model.n_estimators = expect_count(name, value)?,
                "max_depth" => {
                    model.max_depth = expect_optional_int(name, value)?.map(|d| d.max(0) as usize)
                }
                "min_samples_split" => model.min_samples_split = expect_count(name, value)?,
                "min_samples_leaf" => model.min_samples_leaf = expect_count(name, value)?,
                "max_features" => model.max_features = MaxFeatures::parse(value)?,
                "bootstrap" => model.bootstrap = expect_bool(name, value)?,
                "random_state" => model.random_state = expect_int(name, value)? as u64,
                _ => return Err(unknown_parameter(self.name(), name, value)),
            }
        }

        Ok(Box::new(model))
    }

    fn name(&self) -> &'static str {
        "random_forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_blobs() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_classifier() {
        let (x, y) = two_blobs();

        let mut rf = RandomForestClassifier::new(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();

        let accuracy = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count() as f64
            / y.len() as f64;

        assert!(accuracy >= 0.8, "Accuracy too low: {}", accuracy);
        assert_eq!(rf.n_trees(), 10);
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let x = Array2::from_shape_fn((60, 3), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
        let y = Array1::from_shape_fn(60, |i| (i % 3) as f64);

        let mut a = RandomForestClassifier::new(15).with_random_state(7);
        let mut b = RandomForestClassifier::new(15).with_random_state(7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_predict_proba() {
        let x = array![[0.0, 0.0], [1.0, 1.0]];
        let y = array![0.0, 1.0];

        let mut rf = RandomForestClassifier::new(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let proba = rf.predict_proba(&x).unwrap();

        assert_eq!(proba.nrows(), 2);
        assert_eq!(proba.ncols(), 2);

        for i in 0..proba.nrows() {
            let row_sum: f64 = proba.row(i).sum();
            assert!((row_sum - 1.0).abs() < 1e-6, "Row {} sum: {}", i, row_sum);
        }
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut rf = RandomForestClassifier::new(10)
            .with_bootstrap(false)
            .with_max_features(MaxFeatures::All);
        rf.fit(&x, &y).unwrap();

        let importances = rf.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
        assert!(importances[0] > importances[1]);
    }

    #[test]
    fn test_clone_with_params() {
        let base = RandomForestClassifier::default();
        let params = Configuration::from_pairs(vec![
            ("n_estimators", ParameterValue::Int(5)),
            ("max_depth", ParameterValue::Unlimited),
            ("max_features", ParameterValue::from("log2")),
        ]);

        let mut model = base.clone_with_params(&params).unwrap();
        let (x, y) = two_blobs();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap().len(), 6);
        assert_eq!(model.name(), "random_forest");
    }

    #[test]
    fn test_unknown_parameter_is_config_error() {
        let base = RandomForestClassifier::default();
        let params = Configuration::from_pairs(vec![("learning_rate", 0.1)]);
        assert!(matches!(
            base.clone_with_params(&params),
            Err(SelectionError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_wrong_type_is_config_error() {
        let base = RandomForestClassifier::default();
        let params = Configuration::from_pairs(vec![("n_estimators", "many")]);
        assert!(base.clone_with_params(&params).is_err());
    }

    #[test]
    fn test_out_of_range_fails_at_fit() {
        let base = RandomForestClassifier::default();
        let params = Configuration::from_pairs(vec![("n_estimators", 0i64)]);
        let mut model = base.clone_with_params(&params).unwrap();

        let (x, y) = two_blobs();
        assert!(matches!(
            model.fit(&x, &y),
            Err(SelectionError::InvalidParameter { .. })
        ));
    }
}
