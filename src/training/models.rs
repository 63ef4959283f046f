//! Estimator trait and hyperparameter parsing helpers

use crate::error::{Result, SelectionError};
use crate::optimizer::{Configuration, ParameterValue};
use ndarray::{Array1, Array2};

/// A classifier that can be configured from a [`Configuration`].
///
/// Labels are class codes stored as `f64` (`0.0, 1.0, ...`).
pub trait Estimator: Send + Sync {
    /// Fit the estimator to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict class codes
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Return a fresh, unfitted copy with `params` applied on top of the
    /// current settings. Unknown names and wrong value types are errors;
    /// range checks happen in `fit`.
    fn clone_with_params(&self, params: &Configuration) -> Result<Box<dyn Estimator>>;

    /// Short family name used in logs and reports
    fn name(&self) -> &'static str;
}

pub(crate) fn unknown_parameter(estimator: &str, name: &str, value: &ParameterValue) -> SelectionError {
    SelectionError::invalid_parameter(
        name,
        value,
        format!("not a parameter of {}", estimator),
    )
}

pub(crate) fn expect_int(name: &str, value: &ParameterValue) -> Result<i64> {
    value
        .as_int()
        .ok_or_else(|| SelectionError::invalid_parameter(name, value, "expected an integer"))
}

pub(crate) fn expect_float(name: &str, value: &ParameterValue) -> Result<f64> {
    value
        .as_float()
        .ok_or_else(|| SelectionError::invalid_parameter(name, value, "expected a number"))
}

pub(crate) fn expect_bool(name: &str, value: &ParameterValue) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| SelectionError::invalid_parameter(name, value, "expected a boolean"))
}

/// Integer or `unlimited`
pub(crate) fn expect_optional_int(name: &str, value: &ParameterValue) -> Result<Option<i64>> {
    match value {
        ParameterValue::Unlimited => Ok(None),
        ParameterValue::Int(v) => Ok(Some(*v)),
        other => Err(SelectionError::invalid_parameter(
            name,
            other,
            "expected an integer or 'unlimited'",
        )),
    }
}

/// Distinct class codes, sorted ascending
pub(crate) fn sorted_classes(y: &Array1<f64>) -> Vec<i64> {
    let mut classes: Vec<i64> = y.iter().map(|&v| v.round() as i64).collect();
    classes.sort_unstable();
    classes.dedup();
    classes
}

pub(crate) fn check_fit_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(SelectionError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(SelectionError::ValidationError(
            "cannot fit on zero rows".to_string(),
        ));
    }
    if x.ncols() == 0 {
        return Err(SelectionError::ValidationError(
            "cannot fit on zero features".to_string(),
        ));
    }
    Ok(())
}
