//! Regression evaluation metrics

use serde::{Deserialize, Serialize};

/// Predictions within this distance of the label count as accurate
pub const ACCURACY_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub samples: usize,
    pub mae: f64,
    pub rmse: f64,
    /// Fraction of predictions within [`ACCURACY_THRESHOLD`]
    pub accuracy: f64,
    pub min_error: f64,
    pub max_error: f64,
    pub mean_error: f64,
    pub std_error: f64,
}

impl Evaluation {
    /// Compare predictions to labels. Errors are `prediction - truth`.
    pub fn compute(predictions: &[f64], truth: &[f64]) -> Self {
        let errors: Vec<f64> = predictions.iter().zip(truth).map(|(p, t)| p - t).collect();
        if errors.is_empty() {
            return Self::default();
        }

        let n = errors.len() as f64;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
        let rmse = (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt();
        let accurate = errors.iter().filter(|e| e.abs() <= ACCURACY_THRESHOLD).count();
        let mean_error = errors.iter().sum::<f64>() / n;
        let std_error = (errors.iter().map(|e| (e - mean_error).powi(2)).sum::<f64>() / n).sqrt();

        Self {
            samples: errors.len(),
            mae,
            rmse,
            accuracy: accurate as f64 / n,
            min_error: errors.iter().copied().fold(f64::INFINITY, f64::min),
            max_error: errors.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean_error,
            std_error,
        }
    }
}
