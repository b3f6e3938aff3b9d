//! Batch pipeline orchestration
//!
//! One run is a straight line: fetch joined rows, aggregate features, score
//! labels, align, train, check parity and export. Nothing is written unless
//! every stage before export succeeded.


use crate::error::{PipelineError, Result};
use crate::features::{Aggregation, FeatureAggregator};
use crate::labels::{align, LabelScorer, LABEL_VERSION};
use crate::models::{JoinedRow, ServerFeatureVector, ServerLabel};
use crate::observability::{PipelineMetrics, StructuredLogger};
use crate::source::EventSource;
use crate::training::{
    train, ArtifactExporter, ExportSummary, TrainedModel, TrainingConfig, TrainingSet,
    MODEL_VERSION,
};
use chrono::Utc;
use std::time::Instant;

/// Whether the store returned anything for the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetState {
    /// Zero rows. Not an error: the run emits empty features and labels.
    Empty,
    Populated { rows: usize },
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub dataset: DatasetState,
    pub features: Vec<ServerFeatureVector>,
    pub labels: Vec<ServerLabel>,
    pub division_guards: usize,
    pub null_metric_rows: usize,
    /// `None` when the dataset was empty
    pub trained: Option<TrainedModel>,
    /// `None` when the dataset was empty
    pub export: Option<ExportSummary>,
}

/// Pure feature and label stage over already-fetched rows
pub fn compute(rows: &[JoinedRow]) -> (Aggregation, Vec<ServerLabel>) {
    let aggregation = FeatureAggregator::new().aggregate(rows);
    let labels = LabelScorer::new().score(rows);
    (aggregation, labels)
}

/// A configured pipeline, ready to run once or many times
pub struct Pipeline {
    source: Box<dyn EventSource>,
    training: TrainingConfig,
    exporter: ArtifactExporter,
    metrics: PipelineMetrics,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn EventSource>,
        training: TrainingConfig,
        exporter: ArtifactExporter,
    ) -> Self {
        Self {
            source,
            training,
            exporter,
            metrics: PipelineMetrics::new(),
        }
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Execute one run end to end
    pub async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        let run_id = format!("run-{}", Utc::now().format("%Y%m%dT%H%M%S%.3fZ"));
        let logger = StructuredLogger::new(run_id.clone());
        logger.log_run_started(self.source.name(), &self.exporter.dir().display().to_string());

        let result = self.execute(run_id, &logger).await;

        let elapsed = started.elapsed();
        self.metrics.observe_run_duration(elapsed.as_secs_f64());
        match &result {
            Ok(_) => logger.log_run_finished(elapsed.as_millis() as u64),
            Err(e) => {
                if e.is_store_failure() {
                    self.metrics.inc_store_errors();
                }
                logger.log_run_aborted(e);
            }
        }
        result
    }

    async fn execute(&self, run_id: String, logger: &StructuredLogger) -> Result<RunReport> {
        let rows = self.source.fetch().await?;
        let null_metric_rows = rows.iter().filter(|r| !r.has_metrics()).count();
        logger.log_dataset(rows.len(), null_metric_rows);
        self.metrics.set_rows_fetched(rows.len(), null_metric_rows);

        if rows.is_empty() {
            self.metrics.set_servers_featured(0);
            logger.log_training_skipped("empty dataset");
            return Ok(RunReport {
                run_id,
                dataset: DatasetState::Empty,
                features: Vec::new(),
                labels: Vec::new(),
                division_guards: 0,
                null_metric_rows: 0,
                trained: None,
                export: None,
            });
        }

        let (aggregation, labels) = compute(&rows);
        logger.log_features(
            aggregation.vectors.len(),
            labels.len(),
            aggregation.division_guards,
        );
        self.metrics.set_servers_featured(aggregation.vectors.len());
        self.metrics.add_division_guards(aggregation.division_guards);

        let examples = align(&aggregation.vectors, &labels)?;
        let trained = train(&TrainingSet::from_examples(&examples), &self.training)?;
        self.metrics.set_validation_mae(trained.evaluation.mae);

        let manifest_target = self.exporter.dir().display().to_string();
        let export = match self.exporter.export(&trained) {
            Ok(summary) => {
                logger.log_parity(&manifest_target, None);
                logger.log_export(
                    &manifest_target,
                    MODEL_VERSION,
                    LABEL_VERSION,
                    &summary.model_sha256,
                );
                summary
            }
            Err(e) => {
                if matches!(e, PipelineError::FeatureSetMismatch { .. }) {
                    self.metrics.inc_parity_failures();
                    logger.log_parity(&manifest_target, Some(&e));
                }
                return Err(e);
            }
        };

        Ok(RunReport {
            run_id,
            dataset: DatasetState::Populated { rows: rows.len() },
            features: aggregation.vectors,
            labels,
            division_guards: aggregation.division_guards,
            null_metric_rows: aggregation.null_metric_rows,
            trained: Some(trained),
            export: Some(export),
        })
    }
}
