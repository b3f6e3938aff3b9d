//! Trainer configuration

use anyhow::{Context, Result};
use pipeline_lib::source::{StoreConfig, StoreCredentials};
use pipeline_lib::training::{GradientDescent, TrainingConfig};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming an optional configuration file
pub const CONFIG_FILE_VAR: &str = "TRAINER_CONFIG";

/// Trainer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TrainerConfig {
    /// Postgres connection string for the event store
    #[serde(default)]
    pub database_url: String,

    /// How far back to read requests, in seconds
    #[serde(default = "default_lookback_window")]
    pub lookback_window_secs: u64,

    /// Maximum gap between a request and its metric snapshot, in seconds
    #[serde(default = "default_metric_tolerance")]
    pub metric_tolerance_secs: u64,

    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    /// Directory receiving model, scaler and feature manifest
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Manifest of a running serving deployment that exports must match
    #[serde(default)]
    pub serving_manifest_path: Option<PathBuf>,

    /// Prometheus textfile written at the end of the run
    #[serde(default)]
    pub metrics_textfile: Option<PathBuf>,

    #[serde(default = "default_epochs")]
    pub epochs: usize,

    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    #[serde(default = "default_weight_decay")]
    pub weight_decay: f64,

    /// Every n-th example is held out for validation
    #[serde(default = "default_validation_every")]
    pub validation_every: usize,
}

fn default_lookback_window() -> u64 {
    7 * 24 * 60 * 60
}

fn default_metric_tolerance() -> u64 {
    60
}

fn default_query_timeout() -> u64 {
    30
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("ml/models")
}

fn default_epochs() -> usize {
    100
}

fn default_learning_rate() -> f64 {
    0.01
}

fn default_weight_decay() -> f64 {
    0.01
}

fn default_validation_every() -> usize {
    5
}

impl TrainerConfig {
    /// Load configuration from the environment and, if `TRAINER_CONFIG` is
    /// set, the file it names
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_FILE_VAR).ok().map(PathBuf::from);
        Self::from_sources(file, config::Environment::with_prefix("TRAINER").try_parsing(true))
    }

    /// Build from an optional file overlaid by an environment source.
    /// Environment values win over the file.
    pub fn from_sources(file: Option<PathBuf>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = &file {
            builder = builder.add_source(config::File::from(path.clone()).required(true));
        }
        let config = builder
            .add_source(env)
            .build()
            .context("Failed to read trainer configuration")?;

        config
            .try_deserialize()
            .context("Invalid trainer configuration")
    }

    /// Explicit store configuration handed to the event source
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            lookback_window: Duration::from_secs(self.lookback_window_secs),
            metric_tolerance: Duration::from_secs(self.metric_tolerance_secs),
            query_timeout: Duration::from_secs(self.query_timeout_secs),
            credentials: StoreCredentials::new(self.database_url.clone()),
        }
    }

    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            gradient_descent: GradientDescent {
                epochs: self.epochs,
                learning_rate: self.learning_rate,
                weight_decay: self.weight_decay,
            },
            validation_every: self.validation_every,
        }
    }
}
