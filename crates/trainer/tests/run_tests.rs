//! Integration tests for a full trainer run
//!
//! Exercise the same wiring as `main` with the in-memory event source in
//! place of Postgres.

use chrono::{DateTime, Duration, TimeZone, Utc};
use pipeline_lib::{
    parity::{verify_manifest_file, FeatureManifest},
    source::{MemoryEventSource, StoreConfig},
    training::{load_scaler, ArtifactExporter, ModelArtifact, TrainingConfig, MANIFEST_FILE},
    DatasetState, MetricSnapshot, Pipeline, PipelineError, RequestEvent, RequestStatus,
    ServerRecord,
};
use tempfile::TempDir;

fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

/// Four servers with a mix of healthy and failing traffic
fn fleet() -> MemoryEventSource {
    let mut requests = Vec::new();
    let mut snapshots = Vec::new();
    let mut id = 0;
    for server_id in 1..=4i64 {
        for step in 0..6i64 {
            id += 1;
            let offset = step * 300;
            requests.push(RequestEvent {
                request_id: id,
                server_id,
                timestamp: t0() + Duration::seconds(offset + 10),
                response_time: 40.0 * server_id as f64 + 5.0 * step as f64,
                status: RequestStatus::from_success(step % server_id != 0 || server_id == 1),
            });
            snapshots.push(MetricSnapshot {
                server_id,
                timestamp: t0() + Duration::seconds(offset),
                cpu_usage: 15.0 * server_id as f64,
                memory_usage: 30.0 + step as f64,
                request_count: 2,
            });
        }
    }

    MemoryEventSource::new(StoreConfig::default())
        .with_requests(requests)
        .with_snapshots(snapshots)
        .with_servers(
            (1..=4)
                .map(|server_id| ServerRecord {
                    server_id,
                    capacity: 100 * server_id,
                    weight: Some(1),
                })
                .collect(),
        )
        .with_now(t0() + Duration::hours(2))
}

#[tokio::test]
async fn test_run_exports_consistent_artifacts() {
    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::new(
        Box::new(fleet()),
        TrainingConfig::default(),
        ArtifactExporter::new(dir.path()),
    );

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.dataset, DatasetState::Populated { rows: 24 });
    assert_eq!(report.features.len(), 4);
    assert!(report
        .features
        .iter()
        .all(|f| (0.0..=1.0).contains(&f.error_rate)));

    let export = report.export.unwrap();
    let model = ModelArtifact::load(&export.model_path).unwrap();
    let scaler = load_scaler(&export.scaler_path).unwrap();
    let manifest = FeatureManifest::load(&export.manifest_path).unwrap();

    assert_eq!(model.feature_names, manifest.features);
    assert_eq!(scaler.mean.len(), manifest.features.len());
    assert_eq!(scaler.scale.len(), manifest.features.len());
    assert_eq!(manifest.model_sha256.as_deref(), Some(export.model_sha256.as_str()));
}

#[tokio::test]
async fn test_parity_rerun_against_previous_export() {
    let dir = TempDir::new().unwrap();
    Pipeline::new(
        Box::new(fleet()),
        TrainingConfig::default(),
        ArtifactExporter::new(dir.path()),
    )
    .run()
    .await
    .unwrap();

    // A later check only needs the manifest on disk.
    let manifest_path = dir.path().join(MANIFEST_FILE);
    assert!(verify_manifest_file(&manifest_path).is_ok());

    // A serving manifest that drifted is caught without retraining.
    let mut drifted = FeatureManifest::load(&manifest_path).unwrap();
    drifted.features.retain(|f| f != "capacity");
    drifted.features.push("weight".to_string());
    let drifted_path = dir.path().join("drifted.json");
    std::fs::write(&drifted_path, drifted.to_json().unwrap()).unwrap();

    match verify_manifest_file(&drifted_path).unwrap_err() {
        PipelineError::FeatureSetMismatch { missing, extra } => {
            assert!(missing.contains("capacity"));
            assert!(extra.contains("weight"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_bare_array_serving_manifest_accepted() {
    let dir = TempDir::new().unwrap();
    let serving = FeatureManifest::from_json(
        r#"["cpu_usage","memory_usage","active_conns","error_rate","response_p95","capacity"]"#,
    )
    .unwrap();

    let report = Pipeline::new(
        Box::new(fleet()),
        TrainingConfig::default(),
        ArtifactExporter::new(dir.path().join("out")).with_serving_manifest(serving),
    )
    .run()
    .await
    .unwrap();

    assert!(report.export.is_some());
}
