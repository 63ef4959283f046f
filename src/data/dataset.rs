//! Feature matrix, class codes and their names

use crate::error::{Result, SelectionError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Numeric feature matrix plus encoded class labels.
///
/// `labels[i]` is a class code `c` as `f64`; `class_names[c]` is the
/// original label text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub features: Array2<f64>,
    pub labels: Array1<f64>,
    pub feature_names: Vec<String>,
    pub class_names: Vec<String>,
}

impl Dataset {
    /// Build a dataset, checking shapes and naming anything left unnamed
    pub fn new(
        features: Array2<f64>,
        labels: Array1<f64>,
        feature_names: Vec<String>,
        class_names: Vec<String>,
    ) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(SelectionError::ShapeError {
                expected: format!("{} labels", features.nrows()),
                actual: format!("{} labels", labels.len()),
            });
        }
        if feature_names.len() != features.ncols() {
            return Err(SelectionError::ShapeError {
                expected: format!("{} feature names", features.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }
        if let Some(bad) = labels.iter().find(|v| !(v.fract() == 0.0 && **v >= 0.0)) {
            return Err(SelectionError::DataError(format!(
                "label {} is not a non-negative class code",
                bad
            )));
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(SelectionError::DataError(
                "features contain missing or non-finite values".to_string(),
            ));
        }

        Ok(Self {
            features,
            labels,
            feature_names,
            class_names,
        })
    }

    /// Dataset with generated names (`x0`, `x1`, ... and the codes themselves)
    pub fn from_arrays(features: Array2<f64>, labels: Array1<f64>) -> Result<Self> {
        let feature_names = (0..features.ncols()).map(|i| format!("x{}", i)).collect();
        let n_classes = labels.iter().fold(0.0f64, |m, &v| m.max(v + 1.0)) as usize;
        let class_names = (0..n_classes).map(|c| c.to_string()).collect();
        Self::new(features, labels, feature_names, class_names)
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn n_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Rows at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
            feature_names: self.feature_names.clone(),
            class_names: self.class_names.clone(),
        }
    }

    /// Number of rows per class code
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes()];
        for &label in &self.labels {
            let code = label as usize;
            if code >= counts.len() {
                counts.resize(code + 1, 0);
            }
            counts[code] += 1;
        }
        counts
    }
}
