//! Feature standardization

use crate::error::{Result, SelectionError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Standard scaler: `(x - mean) / std`, per feature.
///
/// Statistics come only from the rows passed to [`StandardScaler::fit`],
/// which keeps held-out rows out of the training statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    /// Create a new, unfitted scaler
    pub fn new() -> Self {
        Self {
            mean: None,
            scale: None,
        }
    }

    /// Compute per-feature mean and population standard deviation
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(SelectionError::ValidationError(
                "cannot fit a scaler on zero rows".to_string(),
            ));
        }

        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| SelectionError::ValidationError("empty input".to_string()))?;
        let std = x.std_axis(Axis(0), 0.0);

        // Zero-variance features are left unscaled
        let scale = std.mapv(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s });

        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(self)
    }

    /// Apply the fitted statistics to `x`
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = match (&self.mean, &self.scale) {
            (Some(mean), Some(scale)) => (mean, scale),
            _ => return Err(SelectionError::ModelNotFitted),
        };

        if x.ncols() != mean.len() {
            return Err(SelectionError::ShapeError {
                expected: format!("{} columns", mean.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        Ok((x - mean) / scale)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Undo the scaling
    pub fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = match (&self.mean, &self.scale) {
            (Some(mean), Some(scale)) => (mean, scale),
            _ => return Err(SelectionError::ModelNotFitted),
        };
        Ok(x * scale + mean)
    }

    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }

    /// Fitted per-feature means
    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    /// Fitted per-feature scales (1.0 for constant features)
    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0], [5.0, 50.0]];

        let mut scaler = StandardScaler::new();
        let result = scaler.fit_transform(&x).unwrap();

        let mean = result.mean_axis(Axis(0)).unwrap();
        let std = result.std_axis(Axis(0), 0.0);
        for j in 0..2 {
            assert!(mean[j].abs() < 1e-10); // Mean should be ~0
            assert!((std[j] - 1.0).abs() < 1e-10); // Std should be ~1
        }
    }

    #[test]
    fn test_constant_feature_is_not_divided_by_zero() {
        let x = array![[1.0, 7.0], [2.0, 7.0], [3.0, 7.0]];

        let mut scaler = StandardScaler::new();
        let result = scaler.fit_transform(&x).unwrap();

        assert_eq!(scaler.scale().unwrap()[1], 1.0);
        assert!(result.iter().all(|v| v.is_finite()));
        assert!(result.column(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_statistics_come_from_fit_rows_only() {
        let train = array![[0.0], [2.0]];
        let test = array![[100.0]];

        let mut scaler = StandardScaler::new();
        scaler.fit(&train).unwrap();
        let scaled = scaler.transform(&test).unwrap();

        assert_eq!(scaler.mean().unwrap()[0], 1.0);
        assert!((scaled[[0, 0]] - 99.0).abs() < 1e-10);
    }

    #[test]
    fn test_inverse_transform() {
        let x = array![[1.0, -3.0], [2.0, 0.5], [4.0, 8.0]];

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();
        let restored = scaler.inverse_transform(&scaled).unwrap();

        for (o, r) in x.iter().zip(restored.iter()) {
            assert!((o - r).abs() < 1e-10);
        }
    }

    #[test]
    fn test_transform_before_fit() {
        let scaler = StandardScaler::new();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(SelectionError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_column_mismatch() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(SelectionError::ShapeError { .. })
        ));
    }
}
