//! Model training and export
//!
//! A thin supervised-regression layer over the labelled feature vectors:
//! standardise, fit a linear model, evaluate on a held-out slice, and write
//! the artifacts the serving side needs.

mod evaluation;
mod export;
mod regressor;
mod scaler;

pub use evaluation::{Evaluation, ACCURACY_THRESHOLD};
pub use export::{
    compute_checksum, load_scaler, ArtifactExporter, ExportSummary, ModelArtifact, MANIFEST_FILE,
    MODEL_FILE, SCALER_FILE,
};
pub use regressor::{GradientDescent, LinearRegressor};
pub use scaler::StandardScaler;

use crate::error::Result;
use crate::features::NUM_FEATURES;
use crate::labels::LabeledExample;
use crate::models::ServerId;
use tracing::info;

/// Version stamped on exported models
pub const MODEL_VERSION: &str = "1.2.0";

/// Trait for trained regression models
pub trait Regressor: Send + Sync {
    /// Predict a score from scaled features in canonical order
    fn predict(&self, features: &[f64; NUM_FEATURES]) -> f64;

    /// Short model family name
    fn kind(&self) -> &str;
}

/// Configuration for a training run
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub gradient_descent: GradientDescent,
    /// Every n-th example is held out for validation; below 2 disables the split
    pub validation_every: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            gradient_descent: GradientDescent::default(),
            validation_every: 5,
        }
    }
}

/// Positional training matrix in canonical feature order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub server_ids: Vec<ServerId>,
    pub x: Vec<[f64; NUM_FEATURES]>,
    pub y: Vec<f64>,
}

impl TrainingSet {
    pub fn from_examples(examples: &[LabeledExample]) -> Self {
        Self {
            server_ids: examples.iter().map(|e| e.features.server_id).collect(),
            x: examples.iter().map(|e| e.features.to_array()).collect(),
            y: examples.iter().map(|e| e.label).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Deterministic split into (train, validation).
    ///
    /// With fewer than two examples, or `every < 2`, both halves are the
    /// full set.
    pub fn split(&self, every: usize) -> (TrainingSet, TrainingSet) {
        if self.len() < 2 || every < 2 {
            return (self.clone(), self.clone());
        }
        let mut train = TrainingSet::default();
        let mut validation = TrainingSet::default();
        for i in 0..self.len() {
            let target = if (i + 1) % every == 0 {
                &mut validation
            } else {
                &mut train
            };
            target.server_ids.push(self.server_ids[i]);
            target.x.push(self.x[i]);
            target.y.push(self.y[i]);
        }
        if validation.is_empty() {
            validation = train.clone();
        }
        (train, validation)
    }
}

/// Everything produced by a training run
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub model: LinearRegressor,
    pub scaler: StandardScaler,
    pub evaluation: Evaluation,
    pub validation_loss: f64,
    pub train_samples: usize,
    pub validation_samples: usize,
}

impl TrainedModel {
    /// Score raw (unscaled) canonical features
    pub fn predict_raw(&self, features: &[f64; NUM_FEATURES]) -> f64 {
        self.model.predict(&self.scaler.transform(features))
    }
}

/// Fit a scaler and regressor on `set`
pub fn train(set: &TrainingSet, config: &TrainingConfig) -> Result<TrainedModel> {
    let (train_set, validation_set) = set.split(config.validation_every);

    let scaler = StandardScaler::fit(&train_set.x);
    let x_train: Vec<_> = train_set.x.iter().map(|r| scaler.transform(r)).collect();
    let x_val: Vec<_> = validation_set.x.iter().map(|r| scaler.transform(r)).collect();

    let mut model = LinearRegressor::new();
    let validation_loss = model.fit(
        &config.gradient_descent,
        &x_train,
        &train_set.y,
        &x_val,
        &validation_set.y,
    )?;

    let predictions: Vec<f64> = x_val.iter().map(|r| model.predict(r)).collect();
    let evaluation = Evaluation::compute(&predictions, &validation_set.y);

    info!(
        model = model.kind(),
        train_samples = train_set.len(),
        validation_samples = validation_set.len(),
        validation_loss = validation_loss,
        mae = evaluation.mae,
        rmse = evaluation.rmse,
        "Training completed"
    );

    Ok(TrainedModel {
        model,
        scaler,
        evaluation,
        validation_loss,
        train_samples: train_set.len(),
        validation_samples: validation_set.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServerFeatureVector;

    fn examples(n: usize) -> Vec<LabeledExample> {
        (0..n)
            .map(|i| LabeledExample {
                features: ServerFeatureVector {
                    server_id: i as ServerId,
                    cpu_usage: 10.0 * i as f64,
                    memory_usage: 20.0,
                    active_conns: (i + 1) as u64,
                    error_rate: 0.0,
                    response_p95: 100.0 + i as f64,
                    capacity: 100,
                },
                label: 70.0 + 2.0 * i as f64,
            })
            .collect()
    }

    #[test]
    fn test_training_set_is_positional() {
        let set = TrainingSet::from_examples(&examples(2));
        assert_eq!(set.x[1], [10.0, 20.0, 2.0, 0.0, 101.0, 100.0]);
        assert_eq!(set.server_ids, vec![0, 1]);
    }

    #[test]
    fn test_split_every_fifth() {
        let set = TrainingSet::from_examples(&examples(10));
        let (train, val) = set.split(5);
        assert_eq!(train.len(), 8);
        assert_eq!(val.server_ids, vec![4, 9]);
    }

    #[test]
    fn test_split_small_set_reuses_train() {
        let set = TrainingSet::from_examples(&examples(1));
        let (train, val) = set.split(5);
        assert_eq!(train, val);
        let set = TrainingSet::from_examples(&examples(3));
        let (train, val) = set.split(5);
        assert_eq!(train.len(), 3);
        assert_eq!(val.len(), 3);
    }

    #[test]
    fn test_train_produces_complete_scaler() {
        let set = TrainingSet::from_examples(&examples(12));
        let trained = train(&set, &TrainingConfig::default()).unwrap();
        assert!(trained.scaler.is_complete());
        assert_eq!(trained.model.weights.len(), NUM_FEATURES);
        assert!(trained.validation_loss.is_finite());
        assert!(trained.predict_raw(&set.x[0]).is_finite());
    }
}
