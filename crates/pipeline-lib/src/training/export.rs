//! Artifact export
//!
//! Writes the model, scaler and feature manifest into one directory. Parity
//! is checked before anything touches disk, and every file is written to a
//! temp path and renamed so readers never see a partial artifact. The
//! manifest is written last and carries the model's checksum.

use super::{Evaluation, TrainedModel, MODEL_VERSION};
use crate::error::{PipelineError, Result};
use crate::features::FeatureName;
use crate::labels::LABEL_VERSION;
use crate::models::ServerFeatureVector;
use crate::parity::{verify_parity, FeatureManifest};
use crate::training::StandardScaler;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const MODEL_FILE: &str = "model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const MANIFEST_FILE: &str = "feature_manifest.json";

/// Serialized trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_version: String,
    pub label_version: String,
    pub kind: String,
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    pub bias: f64,
    pub evaluation: Evaluation,
    pub trained_at: DateTime<Utc>,
}

impl ModelArtifact {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| PipelineError::artifact(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Paths and checksum of a completed export
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    pub manifest_path: PathBuf,
    pub model_sha256: String,
}

/// Writes training artifacts into a directory
pub struct ArtifactExporter {
    dir: PathBuf,
    serving_manifest: Option<FeatureManifest>,
}

impl ArtifactExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            serving_manifest: None,
        }
    }

    /// Also require parity with the manifest a serving deployment already
    /// runs with
    pub fn with_serving_manifest(mut self, manifest: FeatureManifest) -> Self {
        self.serving_manifest = Some(manifest);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Check the manifest about to be written, and the serving manifest if
    /// one was supplied, against the columns the feature vectors actually
    /// carry
    pub fn verify(&self, manifest: &FeatureManifest) -> Result<()> {
        let emitted = ServerFeatureVector::emitted_names()?;
        verify_parity(emitted.as_slice(), manifest.features.as_slice())?;
        if let Some(serving) = &self.serving_manifest {
            verify_parity(emitted.as_slice(), serving.features.as_slice())?;
        }
        Ok(())
    }

    pub fn export(&self, trained: &TrainedModel) -> Result<ExportSummary> {
        let now = Utc::now();
        let mut manifest = FeatureManifest::canonical();
        manifest.label_version = Some(LABEL_VERSION.to_string());
        manifest.generated_at = Some(now);

        if let Err(e) = self.verify(&manifest) {
            warn!(error = %e, "Parity check failed, export blocked");
            return Err(e);
        }

        fs::create_dir_all(&self.dir).map_err(|e| PipelineError::artifact(&self.dir, e))?;

        let artifact = ModelArtifact {
            model_version: MODEL_VERSION.to_string(),
            label_version: LABEL_VERSION.to_string(),
            kind: "linear".to_string(),
            feature_names: FeatureName::names(),
            weights: trained.model.weights.clone(),
            bias: trained.model.bias,
            evaluation: trained.evaluation.clone(),
            trained_at: now,
        };
        let model_bytes = serde_json::to_vec_pretty(&artifact)?;
        let model_sha256 = compute_checksum(&model_bytes);

        let model_path = self.dir.join(MODEL_FILE);
        write_atomic(&model_path, &model_bytes)?;

        let scaler_path = self.dir.join(SCALER_FILE);
        write_atomic(&scaler_path, &serde_json::to_vec_pretty(&trained.scaler)?)?;

        manifest.model_sha256 = Some(model_sha256.clone());
        let manifest_path = self.dir.join(MANIFEST_FILE);
        write_atomic(&manifest_path, manifest.to_json()?.as_bytes())?;

        info!(
            dir = %self.dir.display(),
            model_version = MODEL_VERSION,
            label_version = LABEL_VERSION,
            checksum = %model_sha256,
            "Artifacts exported"
        );

        Ok(ExportSummary {
            model_path,
            scaler_path,
            manifest_path,
            model_sha256,
        })
    }
}

/// Load an exported scaler
pub fn load_scaler(path: &Path) -> Result<StandardScaler> {
    let content = fs::read_to_string(path).map_err(|e| PipelineError::artifact(path, e))?;
    Ok(serde_json::from_str(&content)?)
}

/// Hex-encoded SHA-256 of `data`
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path).map_err(|e| PipelineError::artifact(&temp_path, e))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| PipelineError::artifact(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| PipelineError::artifact(path, e))?;
    Ok(())
}
