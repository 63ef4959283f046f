//! Hyperparameter grids and their Cartesian expansion

use crate::error::{Result, SelectionError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single candidate value for a hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    /// No limit (e.g. unbounded depth or iterations)
    Unlimited,
}

impl ParameterValue {
    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, ParameterValue::Unlimited)
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::Bool(v) => write!(f, "{}", v),
            ParameterValue::String(v) => write!(f, "{}", v),
            ParameterValue::Unlimited => write!(f, "unlimited"),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Bool(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::String(v.to_string())
    }
}

/// One concrete assignment of a value to every parameter of a grid.
///
/// `index` is the position of this configuration in the grid's
/// deterministic expansion order and is what ties are broken on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub index: usize,
    pub params: Vec<(String, ParameterValue)>,
}

impl Configuration {
    /// Build a configuration outside of a grid (index 0)
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParameterValue>,
    {
        Self {
            index: 0,
            params: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a parameter by name
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, "}}")
    }
}

/// Ordered mapping from parameter name to candidate values.
///
/// Expansion order is lexicographic over insertion order: the first
/// parameter is the most significant digit, the last one varies fastest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterGrid {
    params: Vec<(String, Vec<ParameterValue>)>,
}

impl HyperparameterGrid {
    /// Create an empty grid
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a parameter with its candidate values
    pub fn add<V: Into<ParameterValue>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.params
            .push((name.into(), values.into_iter().map(Into::into).collect()));
        self
    }

    /// Add an integer parameter
    pub fn int(self, name: impl Into<String>, values: &[i64]) -> Self {
        self.add(name, values.iter().copied())
    }

    /// Add a float parameter
    pub fn float(self, name: impl Into<String>, values: &[f64]) -> Self {
        self.add(name, values.iter().copied())
    }

    /// Add a categorical parameter
    pub fn categorical(self, name: impl Into<String>, values: &[&str]) -> Self {
        self.add(name, values.iter().copied())
    }

    /// Add a parameter from already-built values (mixed kinds allowed)
    pub fn values(self, name: impl Into<String>, values: Vec<ParameterValue>) -> Self {
        self.add(name, values)
    }

    /// Parameter names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(name, _)| name.as_str())
    }

    /// Candidate values for a parameter
    pub fn candidates(&self, name: &str) -> Option<&[ParameterValue]> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn n_params(&self) -> usize {
        self.params.len()
    }

    /// Check that every parameter has at least one candidate and no name
    /// appears twice.
    pub fn validate(&self) -> Result<()> {
        if self.params.is_empty() {
            return Err(SelectionError::InvalidGrid(
                "grid has no parameters".to_string(),
            ));
        }
        for (i, (name, values)) in self.params.iter().enumerate() {
            if values.is_empty() {
                return Err(SelectionError::InvalidGrid(format!(
                    "parameter '{}' has an empty candidate list",
                    name
                )));
            }
            if self.params[..i].iter().any(|(other, _)| other == name) {
                return Err(SelectionError::InvalidGrid(format!(
                    "parameter '{}' is listed twice",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Number of configurations: the product of candidate counts
    pub fn len(&self) -> usize {
        if self.params.is_empty() {
            return 0;
        }
        self.params.iter().map(|(_, values)| values.len()).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode the configuration at `index` in expansion order
    pub fn configuration(&self, index: usize) -> Option<Configuration> {
        if index >= self.len() {
            return None;
        }

        let mut params = Vec::with_capacity(self.params.len());
        let mut remainder = index;
        // Mixed-radix decode, least significant (last) parameter first
        for (name, values) in self.params.iter().rev() {
            let radix = values.len();
            params.push((name.clone(), values[remainder % radix].clone()));
            remainder /= radix;
        }
        params.reverse();

        Some(Configuration { index, params })
    }

    /// Iterate over all configurations in expansion order
    pub fn iter(&self) -> GridIter<'_> {
        GridIter {
            grid: self,
            next: 0,
            len: self.len(),
        }
    }

    /// Validate and expand into the full ordered Cartesian product
    pub fn expand(&self) -> Result<Vec<Configuration>> {
        self.validate()?;
        Ok(self.iter().collect())
    }
}

/// Iterator over the configurations of a grid
pub struct GridIter<'a> {
    grid: &'a HyperparameterGrid,
    next: usize,
    len: usize,
}

impl Iterator for GridIter<'_> {
    type Item = Configuration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let config = self.grid.configuration(self.next);
        self.next += 1;
        config
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest_grid() -> HyperparameterGrid {
        HyperparameterGrid::new()
            .int("n_estimators", &[500, 700])
            .int("max_depth", &[10, 20])
            .int("min_samples_split", &[10, 20])
            .int("min_samples_leaf", &[5, 10])
            .categorical("max_features", &["sqrt"])
    }

    #[test]
    fn test_len_is_product() {
        let grid = forest_grid();
        assert_eq!(grid.len(), 16);
        assert_eq!(grid.expand().unwrap().len(), 16);
    }

    #[test]
    fn test_no_duplicates() {
        let configs = forest_grid().expand().unwrap();
        for i in 0..configs.len() {
            for j in (i + 1)..configs.len() {
                assert_ne!(configs[i].params, configs[j].params);
            }
        }
    }

    #[test]
    fn test_order_is_lexicographic() {
        let grid = HyperparameterGrid::new()
            .int("a", &[1, 2])
            .categorical("b", &["x", "y", "z"]);
        let configs = grid.expand().unwrap();

        let rendered: Vec<String> = configs.iter().map(|c| c.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "{a: 1, b: x}",
                "{a: 1, b: y}",
                "{a: 1, b: z}",
                "{a: 2, b: x}",
                "{a: 2, b: y}",
                "{a: 2, b: z}",
            ]
        );
        for (i, config) in configs.iter().enumerate() {
            assert_eq!(config.index, i);
        }
    }

    #[test]
    fn test_single_value_keeps_dimension() {
        let grid = HyperparameterGrid::new()
            .float("C", &[1.0, 5.0])
            .categorical("kernel", &["rbf"]);
        let configs = grid.expand().unwrap();
        assert_eq!(configs.len(), 2);
        assert!(configs.iter().all(|c| c.get("kernel").and_then(|v| v.as_str()) == Some("rbf")));
    }

    #[test]
    fn test_empty_candidate_list_rejected() {
        let grid = HyperparameterGrid::new()
            .int("n_estimators", &[100])
            .int("max_depth", &[]);
        assert!(matches!(grid.expand(), Err(SelectionError::InvalidGrid(_))));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let grid = HyperparameterGrid::new().int("a", &[1]).int("a", &[2]);
        assert!(matches!(grid.validate(), Err(SelectionError::InvalidGrid(_))));
    }

    #[test]
    fn test_random_access_matches_iteration() {
        let grid = forest_grid();
        for (i, config) in grid.iter().enumerate() {
            assert_eq!(grid.configuration(i).unwrap(), config);
        }
        assert!(grid.configuration(grid.len()).is_none());
    }

    #[test]
    fn test_mixed_values() {
        let grid = HyperparameterGrid::new()
            .values("max_iter", vec![ParameterValue::Int(500), ParameterValue::Unlimited]);
        let configs = grid.expand().unwrap();
        assert_eq!(configs[0].get("max_iter"), Some(&ParameterValue::Int(500)));
        assert!(configs[1].get("max_iter").unwrap().is_unlimited());
        assert_eq!(configs[1].to_string(), "{max_iter: unlimited}");
    }
}
