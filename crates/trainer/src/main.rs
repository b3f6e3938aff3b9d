//! Feature trainer - batch feature pipeline for the load balancer model
//!
//! Runs once per invocation: reads the event store, computes per-server
//! features and labels, trains the scoring model and exports it together
//! with its scaler and feature manifest. Exits non-zero if the run aborts.

use anyhow::{Context, Result};
use pipeline_lib::{
    parity::FeatureManifest,
    source::PgEventSource,
    training::ArtifactExporter,
    DatasetState, Pipeline,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

const TRAINER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!(version = TRAINER_VERSION, "Starting feature-trainer");

    let config = config::TrainerConfig::load()?;
    info!(
        artifact_dir = %config.artifact_dir.display(),
        lookback_window_secs = config.lookback_window_secs,
        metric_tolerance_secs = config.metric_tolerance_secs,
        "Trainer configured"
    );

    let mut exporter = ArtifactExporter::new(&config.artifact_dir);
    if let Some(path) = &config.serving_manifest_path {
        let serving = FeatureManifest::load(path)
            .with_context(|| format!("Failed to load serving manifest {}", path.display()))?;
        exporter = exporter.with_serving_manifest(serving);
    }

    let source = PgEventSource::new(config.store_config());
    let pipeline = Pipeline::new(Box::new(source), config.training_config(), exporter);

    let result = pipeline.run().await;

    if let Some(path) = &config.metrics_textfile {
        if let Err(e) = pipeline.metrics().write_textfile(path) {
            warn!(error = %e, path = %path.display(), "Failed to write metrics textfile");
        }
    }

    let report = result.context("Feature pipeline run aborted")?;
    match report.dataset {
        DatasetState::Empty => info!(run_id = %report.run_id, "No data in window, nothing exported"),
        DatasetState::Populated { rows } => info!(
            run_id = %report.run_id,
            rows = rows,
            servers = report.features.len(),
            "Run complete"
        ),
    }

    Ok(())
}
