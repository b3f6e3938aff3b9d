//! Pipeline error types.

use crate::models::ServerId;
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a pipeline run or block an export.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("event store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("feature set mismatch: missing {missing:?}, extra {extra:?}")]
    FeatureSetMismatch {
        /// Training features absent from the other side
        missing: BTreeSet<String>,
        /// Names on the other side that training does not produce
        extra: BTreeSet<String>,
    },

    #[error("feature manifest not found: {}", .0.display())]
    ManifestMissing(PathBuf),

    #[error("feature manifest is invalid: {0}")]
    ManifestInvalid(String),

    #[error("labels not aligned with features: orphaned features {orphaned_features:?}, orphaned labels {orphaned_labels:?}")]
    LabelAlignment {
        orphaned_features: Vec<ServerId>,
        orphaned_labels: Vec<ServerId>,
    },

    #[error("training failed: {0}")]
    Training(String),

    #[error("artifact error at {}: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn artifact(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Artifact {
            path: path.into(),
            source,
        }
    }

    /// True for failures that must abort the whole run
    pub fn is_store_failure(&self) -> bool {
        matches!(self, PipelineError::StoreUnavailable(_))
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::StoreUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
