//! Train/serve parity contract
//!
//! The feature manifest is the one schema both sides agree on. Training
//! writes it at export time and the serving deployment reads it and looks up
//! features by name. Parity holds when the manifest names exactly the set of
//! features training produces, each exactly once; the order of names in the
//! manifest is not significant.

use crate::error::{PipelineError, Result};
use crate::features::{FeatureName, FEATURE_NAMES};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

/// Exported list of feature names a trained model expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureManifest {
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

/// Accepted on-disk layouts
#[derive(Deserialize)]
#[serde(untagged)]
enum ManifestFile {
    Full(FeatureManifest),
    Names(Vec<String>),
}

impl FeatureManifest {
    pub fn new(features: Vec<String>) -> Self {
        Self {
            features,
            label_version: None,
            model_sha256: None,
            generated_at: None,
        }
    }

    /// Manifest listing the canonical feature names in canonical order
    pub fn canonical() -> Self {
        Self::new(FeatureName::names())
    }

    /// Parse a manifest from JSON, either the full object or a bare array
    pub fn from_json(json: &str) -> Result<Self> {
        match serde_json::from_str::<ManifestFile>(json) {
            Ok(ManifestFile::Full(m)) => Ok(m),
            Ok(ManifestFile::Names(features)) => Ok(Self::new(features)),
            Err(e) => Err(PipelineError::ManifestInvalid(e.to_string())),
        }
    }

    /// Load a manifest file. An absent file is `ManifestMissing`, never a
    /// default manifest.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PipelineError::ManifestMissing(path.to_path_buf()));
            }
            Err(e) => return Err(PipelineError::artifact(path, e)),
        };
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Check that `manifest` names exactly the features in `training`.
///
/// `missing` lists training features the manifest lacks; `extra` lists
/// manifest names training does not produce, plus any name the manifest
/// repeats. A name repeated on the training side is reported as missing.
pub fn verify_parity<T, M>(training: &[T], manifest: &[M]) -> Result<()>
where
    T: AsRef<str>,
    M: AsRef<str>,
{
    let (training, training_repeats) = distinct(training);
    let (serving, serving_repeats) = distinct(manifest);

    let mut missing: BTreeSet<String> = training.difference(&serving).map(|s| s.to_string()).collect();
    let mut extra: BTreeSet<String> = serving.difference(&training).map(|s| s.to_string()).collect();
    missing.extend(training_repeats);
    extra.extend(serving_repeats);

    if missing.is_empty() && extra.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::FeatureSetMismatch { missing, extra })
    }
}

/// Distinct names, and the names that appear more than once
fn distinct<N: AsRef<str>>(names: &[N]) -> (BTreeSet<&str>, BTreeSet<String>) {
    let mut seen = BTreeSet::new();
    let mut repeated = BTreeSet::new();
    for name in names {
        let name = name.as_ref();
        if !seen.insert(name) {
            repeated.insert(name.to_string());
        }
    }
    (seen, repeated)
}

/// Re-run the parity check against an exported manifest file, without
/// retraining.
pub fn verify_manifest_file(path: &Path) -> Result<FeatureManifest> {
    let manifest = FeatureManifest::load(path)?;
    match verify_parity(&FEATURE_NAMES, manifest.features.as_slice()) {
        Ok(()) => {
            info!(
                event = "parity_verified",
                manifest = %path.display(),
                features = manifest.features.len(),
                "Feature manifest matches training features"
            );
            Ok(manifest)
        }
        Err(e) => {
            warn!(
                event = "parity_violation",
                manifest = %path.display(),
                error = %e,
                "Feature manifest does not match training features"
            );
            Err(e)
        }
    }
}
