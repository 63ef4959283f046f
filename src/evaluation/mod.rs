//! Held-out evaluation: accuracy, confusion matrix and per-class report

mod metrics;

pub use metrics::{
    accuracy, AverageMetrics, ClassMetrics, ClassificationReport, ConfusionMatrix, Scoring,
};
