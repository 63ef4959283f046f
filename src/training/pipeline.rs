//! Standardize-then-classify pipeline

use super::models::Estimator;
use crate::error::Result;
use crate::evaluation::Scoring;
use crate::optimizer::Configuration;
use crate::preprocessing::StandardScaler;
use ndarray::{Array1, Array2};
use std::fmt;

/// A [`StandardScaler`] followed by an [`Estimator`], fitted as one unit.
///
/// The scaler is refitted on every call to [`Pipeline::fit`], so rows that
/// are only ever passed to `predict` never influence the scaling.
pub struct Pipeline {
    scaler: StandardScaler,
    estimator: Box<dyn Estimator>,
}

impl Pipeline {
    pub fn new(estimator: Box<dyn Estimator>) -> Self {
        Self {
            scaler: StandardScaler::new(),
            estimator,
        }
    }

    /// Fit the scaler, then the estimator on the scaled rows
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let x_scaled = self.scaler.fit_transform(x)?;
        self.estimator.fit(&x_scaled, y)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let x_scaled = self.scaler.transform(x)?;
        self.estimator.predict(&x_scaled)
    }

    /// Predict `x` and score against `y`
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>, scoring: Scoring) -> Result<f64> {
        let predictions = self.predict(x)?;
        scoring.score(y, &predictions)
    }

    /// Fresh, unfitted pipeline with `params` applied to the estimator
    pub fn clone_with_params(&self, params: &Configuration) -> Result<Pipeline> {
        Ok(Pipeline::new(self.estimator.clone_with_params(params)?))
    }

    pub fn is_fitted(&self) -> bool {
        self.scaler.is_fitted()
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn estimator_name(&self) -> &'static str {
        self.estimator.name()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("scaler", &self.scaler)
            .field("estimator", &self.estimator.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::RandomForestClassifier;
    use ndarray::array;

    #[test]
    fn test_pipeline_fit_predict() {
        let x = array![[0.0, 100.0], [0.1, 110.0], [1.0, 300.0], [1.1, 310.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut pipeline = Pipeline::new(Box::new(RandomForestClassifier::new(5)));
        assert!(!pipeline.is_fitted());
        pipeline.fit(&x, &y).unwrap();

        assert!(pipeline.is_fitted());
        assert_eq!(pipeline.predict(&x).unwrap().len(), 4);
        let acc = pipeline.score(&x, &y, Scoring::Accuracy).unwrap();
        assert!((0.0..=1.0).contains(&acc));
    }

    #[test]
    fn test_scaler_uses_fit_rows_only() {
        let x_train = array![[0.0], [2.0], [0.0], [2.0]];
        let y_train = array![0.0, 1.0, 0.0, 1.0];

        let mut pipeline = Pipeline::new(Box::new(RandomForestClassifier::new(3)));
        pipeline.fit(&x_train, &y_train).unwrap();
        pipeline.predict(&array![[1000.0]]).unwrap();

        assert_eq!(pipeline.scaler().mean().unwrap()[0], 1.0);
    }

    #[test]
    fn test_clone_with_params_is_unfitted() {
        let x = array![[0.0], [1.0]];
        let y = array![0.0, 1.0];

        let mut pipeline = Pipeline::new(Box::new(RandomForestClassifier::new(3)));
        pipeline.fit(&x, &y).unwrap();

        let params = Configuration::from_pairs(vec![("n_estimators", 4i64)]);
        let fresh = pipeline.clone_with_params(&params).unwrap();
        assert!(!fresh.is_fitted());
        assert_eq!(fresh.estimator_name(), "random_forest");
    }
}
