//! Classification metrics

use crate::error::{Result, SelectionError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::str::FromStr;

/// Scoring function used to rank configurations (higher is better)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    /// Fraction of correct predictions
    #[default]
    Accuracy,
    /// Unweighted mean of per-class F1
    MacroF1,
}

impl Scoring {
    pub fn score(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
        match self {
            Scoring::Accuracy => accuracy(y_true, y_pred),
            Scoring::MacroF1 => {
                Ok(ClassificationReport::from_predictions(y_true, y_pred)?.macro_avg.f1_score)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scoring::Accuracy => "accuracy",
            Scoring::MacroF1 => "macro_f1",
        }
    }
}

impl FromStr for Scoring {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "accuracy" => Ok(Scoring::Accuracy),
            "macro_f1" | "f1_macro" => Ok(Scoring::MacroF1),
            other => Err(SelectionError::ConfigError(format!(
                "unknown scoring '{}', expected 'accuracy' or 'macro_f1'",
                other
            ))),
        }
    }
}

fn check_lengths(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(SelectionError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(SelectionError::ValidationError(
            "cannot score zero predictions".to_string(),
        ));
    }
    Ok(())
}

/// Fraction of predictions equal to the true label
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t.round() as i64 == p.round() as i64)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Confusion matrix: rows are true classes, columns are predicted classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Class codes, sorted; index `i` labels row `i` and column `i`
    pub classes: Vec<i64>,
    pub matrix: Array2<u64>,
}

impl ConfusionMatrix {
    /// Build from predictions; the class set is the union of both vectors
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        check_lengths(y_true, y_pred)?;

        let mut classes: Vec<i64> = y_true
            .iter()
            .chain(y_pred.iter())
            .map(|v| v.round() as i64)
            .collect();
        classes.sort_unstable();
        classes.dedup();

        let mut matrix = Array2::zeros((classes.len(), classes.len()));
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            let row = classes.binary_search(&(t.round() as i64)).unwrap_or(0);
            let col = classes.binary_search(&(p.round() as i64)).unwrap_or(0);
            matrix[[row, col]] += 1;
        }

        Ok(Self { classes, matrix })
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn total(&self) -> u64 {
        self.matrix.sum()
    }
}

/// Precision, recall and F1 of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class: i64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Number of true instances of the class
    pub support: u64,
}

/// Averaged precision, recall and F1
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

/// Per-class metrics plus overall accuracy and macro/weighted averages.
/// A ratio with a zero denominator is reported as 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub class_metrics: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub n_samples: u64,
    pub confusion_matrix: ConfusionMatrix,
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl ClassificationReport {
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        Ok(Self::from_confusion(ConfusionMatrix::from_predictions(y_true, y_pred)?))
    }

    pub fn from_confusion(confusion_matrix: ConfusionMatrix) -> Self {
        let matrix = &confusion_matrix.matrix;
        let n_samples = matrix.sum();
        let support = matrix.sum_axis(Axis(1));
        let predicted = matrix.sum_axis(Axis(0));

        let class_metrics: Vec<ClassMetrics> = confusion_matrix
            .classes
            .iter()
            .enumerate()
            .map(|(i, &class)| {
                let true_positives = matrix[[i, i]];
                let precision = ratio(true_positives, predicted[i]);
                let recall = ratio(true_positives, support[i]);
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    class,
                    precision,
                    recall,
                    f1_score,
                    support: support[i],
                }
            })
            .collect();

        let n_classes = class_metrics.len().max(1) as f64;
        let macro_avg = AverageMetrics {
            precision: class_metrics.iter().map(|c| c.precision).sum::<f64>() / n_classes,
            recall: class_metrics.iter().map(|c| c.recall).sum::<f64>() / n_classes,
            f1_score: class_metrics.iter().map(|c| c.f1_score).sum::<f64>() / n_classes,
        };

        let weighted = |f: fn(&ClassMetrics) -> f64| {
            if n_samples == 0 {
                return 0.0;
            }
            class_metrics
                .iter()
                .map(|c| f(c) * c.support as f64)
                .sum::<f64>()
                / n_samples as f64
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1_score: weighted(|c| c.f1_score),
        };

        Self {
            accuracy: ratio(matrix.diag().sum(), n_samples),
            class_metrics,
            macro_avg,
            weighted_avg,
            n_samples,
            confusion_matrix,
        }
    }

    /// Plain-text table; `class_names[code]` labels a class when present
    pub fn render(&self, class_names: &[String]) -> String {
        let label = |code: i64| {
            usize::try_from(code)
                .ok()
                .and_then(|i| class_names.get(i))
                .cloned()
                .unwrap_or_else(|| code.to_string())
        };

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>16} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        );
        for c in &self.class_metrics {
            let _ = writeln!(
                out,
                "{:>16} {:>10.4} {:>10.4} {:>10.4} {:>10}",
                label(c.class),
                c.precision,
                c.recall,
                c.f1_score,
                c.support
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:>16} {:>10} {:>10} {:>10.4} {:>10}",
            "accuracy", "", "", self.accuracy, self.n_samples
        );
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            let _ = writeln!(
                out,
                "{:>16} {:>10.4} {:>10.4} {:>10.4} {:>10}",
                name, avg.precision, avg.recall, avg.f1_score, self.n_samples
            );
        }
        out
    }
}
