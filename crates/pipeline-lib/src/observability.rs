//! Observability infrastructure for the feature pipeline
//!
//! Provides:
//! - Prometheus metrics (run duration, rows fetched, servers featured, guards, parity failures)
//! - Structured JSON logging with tracing
//!
//! The pipeline is a batch job, so metrics are exported by writing the text
//! exposition format to a file for the node exporter's textfile collector.

use crate::error::{PipelineError, Result};
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_gauge, Encoder, Gauge,
    Histogram, IntCounter, IntGauge, TextEncoder,
};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for whole-run duration (in seconds)
const RUN_DURATION_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PipelineMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct PipelineMetricsInner {
    run_duration_seconds: Histogram,
    rows_fetched: IntGauge,
    null_metric_rows: IntGauge,
    servers_featured: IntGauge,
    division_guards: IntCounter,
    parity_failures: IntCounter,
    store_errors: IntCounter,
    validation_mae: Gauge,
}

impl PipelineMetricsInner {
    fn new() -> Self {
        Self {
            run_duration_seconds: register_histogram!(
                "nb_pipeline_run_duration_seconds",
                "Wall time of a full pipeline run",
                RUN_DURATION_BUCKETS.to_vec()
            )
            .expect("Failed to register run_duration_seconds"),

            rows_fetched: register_int_gauge!(
                "nb_pipeline_rows_fetched",
                "Joined rows returned by the event store in the last run"
            )
            .expect("Failed to register rows_fetched"),

            null_metric_rows: register_int_gauge!(
                "nb_pipeline_null_metric_rows",
                "Joined rows with no metric snapshot in the last run"
            )
            .expect("Failed to register null_metric_rows"),

            servers_featured: register_int_gauge!(
                "nb_pipeline_servers_featured",
                "Servers with a feature vector in the last run"
            )
            .expect("Failed to register servers_featured"),

            division_guards: register_int_counter!(
                "nb_pipeline_division_guards_total",
                "Error-rate computations where the zero-guard substituted a denominator of 1"
            )
            .expect("Failed to register division_guards"),

            parity_failures: register_int_counter!(
                "nb_pipeline_parity_failures_total",
                "Feature manifest parity checks that failed"
            )
            .expect("Failed to register parity_failures"),

            store_errors: register_int_counter!(
                "nb_pipeline_store_errors_total",
                "Runs aborted because the event store was unavailable"
            )
            .expect("Failed to register store_errors"),

            validation_mae: register_gauge!(
                "nb_pipeline_validation_mae",
                "Mean absolute error of the last trained model on validation data"
            )
            .expect("Failed to register validation_mae"),
        }
    }
}

/// Pipeline metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct PipelineMetrics {
    _private: (),
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PipelineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PipelineMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_run_duration(&self, duration_secs: f64) {
        self.inner().run_duration_seconds.observe(duration_secs);
    }

    pub fn set_rows_fetched(&self, rows: usize, null_metric_rows: usize) {
        self.inner().rows_fetched.set(rows as i64);
        self.inner().null_metric_rows.set(null_metric_rows as i64);
    }

    pub fn set_servers_featured(&self, count: usize) {
        self.inner().servers_featured.set(count as i64);
    }

    pub fn add_division_guards(&self, count: usize) {
        self.inner().division_guards.inc_by(count as u64);
    }

    pub fn inc_parity_failures(&self) {
        self.inner().parity_failures.inc();
    }

    pub fn inc_store_errors(&self) {
        self.inner().store_errors.inc();
    }

    pub fn set_validation_mae(&self, mae: f64) {
        self.inner().validation_mae.set(mae);
    }

    /// Render all registered metrics in the Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Write the text exposition to `path` (textfile collector convention)
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let temp_path = path.with_extension("prom.tmp");
        fs::write(&temp_path, self.render()).map_err(|e| PipelineError::artifact(&temp_path, e))?;
        fs::rename(&temp_path, path).map_err(|e| PipelineError::artifact(path, e))?;
        debug!(path = %path.display(), "Metrics textfile written");
        Ok(())
    }
}

/// Structured logger for pipeline run events
///
/// Provides consistent JSON-formatted logging for the lifecycle of one
/// batch run.
#[derive(Clone)]
pub struct StructuredLogger {
    run_id: String,
}

impl StructuredLogger {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Log run startup
    pub fn log_run_started(&self, source: &str, artifact_dir: &str) {
        info!(
            event = "run_started",
            run_id = %self.run_id,
            source = %source,
            artifact_dir = %artifact_dir,
            "Feature pipeline run started"
        );
    }

    /// Log the result of the store fetch
    pub fn log_dataset(&self, rows: usize, null_metric_rows: usize) {
        if rows == 0 {
            info!(
                event = "empty_dataset",
                run_id = %self.run_id,
                "Event store returned no rows, emitting empty features and labels"
            );
        } else {
            info!(
                event = "dataset_fetched",
                run_id = %self.run_id,
                rows = rows,
                null_metric_rows = null_metric_rows,
                "Joined rows fetched"
            );
        }
    }

    /// Log feature and label computation
    pub fn log_features(&self, servers: usize, labels: usize, division_guards: usize) {
        info!(
            event = "features_computed",
            run_id = %self.run_id,
            servers = servers,
            labels = labels,
            division_guards = division_guards,
            "Feature vectors and labels computed"
        );
    }

    /// Log a parity check result
    pub fn log_parity(&self, manifest: &str, error: Option<&PipelineError>) {
        match error {
            None => info!(
                event = "parity_verified",
                run_id = %self.run_id,
                manifest = %manifest,
                "Training and serving feature sets match"
            ),
            Some(e) => warn!(
                event = "parity_violation",
                run_id = %self.run_id,
                manifest = %manifest,
                error = %e,
                "Training and serving feature sets differ, export blocked"
            ),
        }
    }

    /// Log completed export
    pub fn log_export(&self, dir: &str, model_version: &str, label_version: &str, checksum: &str) {
        info!(
            event = "artifacts_exported",
            run_id = %self.run_id,
            dir = %dir,
            model_version = %model_version,
            label_version = %label_version,
            checksum = %checksum,
            "Model, scaler and feature manifest exported"
        );
    }

    /// Log a run that ended without training
    pub fn log_training_skipped(&self, reason: &str) {
        info!(
            event = "training_skipped",
            run_id = %self.run_id,
            reason = %reason,
            "Training skipped"
        );
    }

    /// Log an aborted run
    pub fn log_run_aborted(&self, error: &PipelineError) {
        warn!(
            event = "run_aborted",
            run_id = %self.run_id,
            error = %error,
            "Feature pipeline run aborted, no artifacts written"
        );
    }

    /// Log run completion
    pub fn log_run_finished(&self, elapsed_ms: u64) {
        info!(
            event = "run_finished",
            run_id = %self.run_id,
            elapsed_ms = elapsed_ms,
            "Feature pipeline run finished"
        );
    }
}
