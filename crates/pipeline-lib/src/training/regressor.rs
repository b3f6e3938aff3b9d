//! Linear regressor trained by full-batch gradient descent

use super::Regressor;
use crate::error::{PipelineError, Result};
use crate::features::NUM_FEATURES;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Linear model over standardised features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub weights: Vec<f64>,
    pub bias: f64,
}

/// Gradient descent hyperparameters
#[derive(Debug, Clone)]
pub struct GradientDescent {
    pub epochs: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
}

impl Default for GradientDescent {
    fn default() -> Self {
        Self {
            epochs: 100,
            learning_rate: 0.01,
            weight_decay: 0.01,
        }
    }
}

impl Default for LinearRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegressor {
    pub fn new() -> Self {
        Self {
            weights: vec![0.0; NUM_FEATURES],
            bias: 0.0,
        }
    }

    /// Mean squared error over a dataset
    pub fn mse(&self, x: &[[f64; NUM_FEATURES]], y: &[f64]) -> f64 {
        if x.is_empty() {
            return 0.0;
        }
        x.iter()
            .zip(y)
            .map(|(row, target)| (self.predict(row) - target).powi(2))
            .sum::<f64>()
            / x.len() as f64
    }

    /// Fit on `(x, y)`, keeping the weights with the lowest validation loss
    /// seen across epochs. Returns that loss.
    pub fn fit(
        &mut self,
        params: &GradientDescent,
        x: &[[f64; NUM_FEATURES]],
        y: &[f64],
        x_val: &[[f64; NUM_FEATURES]],
        y_val: &[f64],
    ) -> Result<f64> {
        if x.is_empty() || x.len() != y.len() || x_val.len() != y_val.len() {
            return Err(PipelineError::Training(format!(
                "invalid training shapes: {} rows, {} targets, {} validation rows, {} validation targets",
                x.len(),
                y.len(),
                x_val.len(),
                y_val.len()
            )));
        }

        let n = x.len() as f64;
        let mut best = self.clone();
        let mut best_loss = self.mse(x_val, y_val);

        for epoch in 0..params.epochs {
            let mut grad_w = [0.0; NUM_FEATURES];
            let mut grad_b = 0.0;
            for (row, target) in x.iter().zip(y) {
                let err = self.predict(row) - target;
                for (g, v) in grad_w.iter_mut().zip(row) {
                    *g += 2.0 * err * v / n;
                }
                grad_b += 2.0 * err / n;
            }

            for (w, g) in self.weights.iter_mut().zip(grad_w) {
                *w -= params.learning_rate * (g + params.weight_decay * *w);
            }
            self.bias -= params.learning_rate * grad_b;

            let val_loss = self.mse(x_val, y_val);
            if !val_loss.is_finite() {
                return Err(PipelineError::Training(format!(
                    "validation loss diverged at epoch {}",
                    epoch + 1
                )));
            }
            if val_loss < best_loss {
                best_loss = val_loss;
                best = self.clone();
            }
            debug!(epoch = epoch + 1, val_loss = val_loss, "Epoch completed");
        }

        *self = best;
        Ok(best_loss)
    }
}

impl Regressor for LinearRegressor {
    fn predict(&self, features: &[f64; NUM_FEATURES]) -> f64 {
        self.weights
            .iter()
            .zip(features)
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.bias
    }

    fn kind(&self) -> &str {
        "linear"
    }
}
