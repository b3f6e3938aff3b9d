//! Feature pipeline library for the load-balancer scoring model
//!
//! This crate provides the core functionality for:
//! - Reading requests, metric snapshots and server records from the event store
//! - Joining requests to the nearest preceding metric snapshot
//! - Per-server feature aggregation and label scoring
//! - Train/serve feature parity checks
//! - Model training and artifact export
//! - Metrics and structured logging for batch runs

pub mod error;
pub mod features;
pub mod join;
pub mod labels;
pub mod models;
pub mod observability;
pub mod parity;
pub mod pipeline;
pub mod source;
pub mod training;

pub use error::{PipelineError, Result};
pub use models::*;
pub use observability::{PipelineMetrics, StructuredLogger};
pub use pipeline::{DatasetState, Pipeline, RunReport};
