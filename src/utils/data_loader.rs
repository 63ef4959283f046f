//! CSV loading and encoding into a [`Dataset`]

use crate::data::Dataset;
use crate::error::{Result, SelectionError};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// How to turn a raw CSV into a numeric [`Dataset`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadingConfig {
    /// Label column
    pub target_column: String,
    /// Columns removed before encoding
    pub drop_columns: Vec<String>,
    /// Categorical columns expanded into 0/1 indicators (first level dropped)
    pub one_hot_columns: Vec<String>,
    /// Token read as a missing value
    pub null_value: String,
    /// Field separator
    pub separator: u8,
}

impl LoadingConfig {
    pub fn new(target_column: impl Into<String>) -> Self {
        Self {
            target_column: target_column.into(),
            drop_columns: Vec::new(),
            one_hot_columns: Vec::new(),
            null_value: "?".to_string(),
            separator: b',',
        }
    }

    pub fn with_drop_columns(mut self, columns: Vec<String>) -> Self {
        self.drop_columns = columns;
        self
    }

    pub fn with_one_hot_columns(mut self, columns: Vec<String>) -> Self {
        self.one_hot_columns = columns;
        self
    }
}

/// Row/column summary of a CSV file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub file_size: u64,
    pub n_rows: usize,
    pub n_rows_with_missing: usize,
    pub columns: Vec<(String, String)>,
}

/// Data loader for CSV files
pub struct DataLoader {
    config: LoadingConfig,
}

impl DataLoader {
    /// Create a new data loader
    pub fn new(config: LoadingConfig) -> Self {
        Self { config }
    }

    /// Read the raw CSV; the configured null token becomes a missing value
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        read_csv(path.as_ref(), &self.config.null_value, self.config.separator)
    }

    /// Read, clean and encode a CSV into a [`Dataset`]
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        let raw = self.load_csv(path)?;
        let n_raw = raw.height();

        let df = raw.drop_nulls::<String>(None)?;
        info!(
            path = %path.display(),
            rows = df.height(),
            dropped_rows = n_raw - df.height(),
            columns = df.width(),
            "Loaded CSV"
        );

        self.encode(&df)
    }

    /// Encode an already cleaned frame
    pub fn encode(&self, df: &DataFrame) -> Result<Dataset> {
        if df.height() == 0 {
            return Err(SelectionError::DataError("no rows left to encode".to_string()));
        }

        let target = &self.config.target_column;
        let (labels, class_names) = encode_labels(column_series(df, target)?)?;

        for name in self.config.drop_columns.iter().chain(&self.config.one_hot_columns) {
            column_series(df, name)?;
        }

        let mut feature_names: Vec<String> = Vec::new();
        let mut columns: Vec<Vec<f64>> = Vec::new();

        for name in df.get_column_names() {
            let name = name.as_str();
            if name == target || self.config.drop_columns.iter().any(|d| d == name) {
                continue;
            }

            let series = column_series(df, name)?;
            if self.config.one_hot_columns.iter().any(|c| c == name) {
                let (names, indicators) = one_hot(name, series)?;
                debug!(column = name, levels = names.len() + 1, "One-hot encoded");
                feature_names.extend(names);
                columns.extend(indicators);
            } else {
                feature_names.push(name.to_string());
                columns.push(numeric_values(name, series)?);
            }
        }

        let features = Array2::from_shape_fn((df.height(), columns.len()), |(r, c)| columns[c][r]);
        Dataset::new(features, labels, feature_names, class_names)
    }

    /// Get file info without encoding
    pub fn file_info(path: impl AsRef<Path>) -> Result<FileInfo> {
        let path = path.as_ref();
        let file_size = std::fs::metadata(path)?.len();
        let df = read_csv(path, "?", b',')?;
        let complete = df.drop_nulls::<String>(None)?.height();

        Ok(FileInfo {
            path: path.display().to_string(),
            file_size,
            n_rows: df.height(),
            n_rows_with_missing: df.height() - complete,
            columns: df
                .get_columns()
                .iter()
                .map(|c| (c.name().to_string(), c.dtype().to_string()))
                .collect(),
        })
    }
}

fn read_csv(path: &Path, null_value: &str, separator: u8) -> Result<DataFrame> {
    let file = File::open(path)?;

    let parse_opts = CsvParseOptions::default()
        .with_separator(separator)
        .with_null_values(Some(NullValues::AllColumnsSingle(null_value.into())));

    let reader = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .with_parse_options(parse_opts)
        .into_reader_with_file_handle(file);

    Ok(reader.finish()?)
}

fn column_series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| SelectionError::DataError(format!("column '{}' not found", name)))
}

fn string_values(series: &Series) -> Result<Vec<String>> {
    let as_str = series.cast(&DataType::String)?;
    Ok(as_str
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().trim().to_string())
        .collect())
}

/// Sorted distinct label texts become codes `0, 1, ...`
fn encode_labels(series: &Series) -> Result<(Array1<f64>, Vec<String>)> {
    let values = string_values(series)?;
    let mut classes = values.clone();
    classes.sort();
    classes.dedup();

    let labels = values
        .iter()
        .map(|v| classes.binary_search(v).unwrap_or(0) as f64)
        .collect();
    Ok((labels, classes))
}

/// One 0/1 column per level except the first (sorted) one
fn one_hot(name: &str, series: &Series) -> Result<(Vec<String>, Vec<Vec<f64>>)> {
    let values = string_values(series)?;
    let mut levels = values.clone();
    levels.sort();
    levels.dedup();

    let kept = levels.iter().skip(1);
    let names = kept.clone().map(|level| format!("{}_{}", name, level)).collect();
    let indicators = kept
        .map(|level| {
            values
                .iter()
                .map(|v| if v == level { 1.0 } else { 0.0 })
                .collect()
        })
        .collect();
    Ok((names, indicators))
}

fn numeric_values(name: &str, series: &Series) -> Result<Vec<f64>> {
    let cast = series.strict_cast(&DataType::Float64).map_err(|_| {
        SelectionError::DataError(format!(
            "column '{}' is not numeric; drop it or one-hot encode it",
            name
        ))
    })?;
    Ok(cast.f64()?.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}
