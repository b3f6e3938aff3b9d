//! Core data models for the feature pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a backend server in the event store
pub type ServerId = i64;

/// Outcome of a proxied request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Success,
    Failure,
}

impl RequestStatus {
    /// The store records status as a boolean success flag
    pub fn from_success(success: bool) -> Self {
        if success {
            RequestStatus::Success
        } else {
            RequestStatus::Failure
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RequestStatus::Failure)
    }
}

/// A single observed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEvent {
    pub request_id: i64,
    pub server_id: ServerId,
    pub timestamp: DateTime<Utc>,
    /// Response time in milliseconds
    pub response_time: f64,
    pub status: RequestStatus,
}

/// Point-in-time resource metrics for a server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub server_id: ServerId,
    pub timestamp: DateTime<Utc>,
    /// Percent, 0-100
    pub cpu_usage: f64,
    /// Percent, 0-100
    pub memory_usage: f64,
    pub request_count: i64,
}

/// Capacity and weight reference data for a server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub server_id: ServerId,
    pub capacity: i64,
    pub weight: Option<i64>,
}

/// A request joined with at most one metric snapshot.
///
/// Metric fields stay `None` when no snapshot fell inside the match
/// tolerance; they are never defaulted to a value that would look like load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedRow {
    pub request_id: i64,
    pub server_id: ServerId,
    pub timestamp: DateTime<Utc>,
    pub response_time: f64,
    pub status: RequestStatus,
    pub capacity: i64,
    #[serde(default)]
    pub weight: Option<i64>,
    #[serde(default)]
    pub metric_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cpu_usage: Option<f64>,
    #[serde(default)]
    pub memory_usage: Option<f64>,
    #[serde(default)]
    pub request_count: Option<i64>,
}

impl JoinedRow {
    /// Build a row for a request that matched no metric snapshot
    pub fn unmatched(request: &RequestEvent, server: &ServerRecord) -> Self {
        Self {
            request_id: request.request_id,
            server_id: request.server_id,
            timestamp: request.timestamp,
            response_time: request.response_time,
            status: request.status,
            capacity: server.capacity,
            weight: server.weight,
            metric_timestamp: None,
            cpu_usage: None,
            memory_usage: None,
            request_count: None,
        }
    }

    /// Build a row for a request matched to `snapshot`
    pub fn matched(request: &RequestEvent, server: &ServerRecord, snapshot: &MetricSnapshot) -> Self {
        Self {
            metric_timestamp: Some(snapshot.timestamp),
            cpu_usage: Some(snapshot.cpu_usage),
            memory_usage: Some(snapshot.memory_usage),
            request_count: Some(snapshot.request_count),
            ..Self::unmatched(request, server)
        }
    }

    /// True when a metric snapshot was joined to this request
    pub fn has_metrics(&self) -> bool {
        self.metric_timestamp.is_some()
    }
}

/// Per-server feature vector in canonical column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFeatureVector {
    pub server_id: ServerId,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub active_conns: u64,
    pub error_rate: f64,
    pub response_p95: f64,
    pub capacity: i64,
}

/// Per-server training label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerLabel {
    pub server_id: ServerId,
    pub score: f64,
}
