//! In-memory event source
//!
//! Holds raw requests, snapshots and server records and produces joined rows
//! with the same window and tolerance semantics as the store query.

use super::{async_trait, EventSource, StoreConfig};
use crate::error::{PipelineError, Result};
use crate::join::TemporalJoin;
use crate::models::{JoinedRow, MetricSnapshot, RequestEvent, ServerRecord};
use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// Event source over in-memory data
pub struct MemoryEventSource {
    config: StoreConfig,
    requests: Vec<RequestEvent>,
    snapshots: Vec<MetricSnapshot>,
    servers: Vec<ServerRecord>,
    now: Option<DateTime<Utc>>,
    unavailable: Option<String>,
}

impl MemoryEventSource {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            requests: Vec::new(),
            snapshots: Vec::new(),
            servers: Vec::new(),
            now: None,
            unavailable: None,
        }
    }

    pub fn with_requests(mut self, requests: Vec<RequestEvent>) -> Self {
        self.requests = requests;
        self
    }

    pub fn with_snapshots(mut self, snapshots: Vec<MetricSnapshot>) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn with_servers(mut self, servers: Vec<ServerRecord>) -> Self {
        self.servers = servers;
        self
    }

    /// Pin the reference time used for the lookback window
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Make every fetch fail as if the store could not be reached
    pub fn unavailable(mut self, reason: impl Into<String>) -> Self {
        self.unavailable = Some(reason.into());
        self
    }
}

#[async_trait]
impl EventSource for MemoryEventSource {
    async fn fetch(&self) -> Result<Vec<JoinedRow>> {
        if let Some(reason) = &self.unavailable {
            return Err(PipelineError::StoreUnavailable(reason.clone()));
        }

        let now = self.now.unwrap_or_else(Utc::now);
        let window = ChronoDuration::from_std(self.config.lookback_window)
            .unwrap_or(ChronoDuration::MAX);
        let cutoff = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);

        let in_window: Vec<RequestEvent> = self
            .requests
            .iter()
            .filter(|r| r.timestamp >= cutoff)
            .cloned()
            .collect();

        Ok(TemporalJoin::new(self.config.metric_tolerance).join(
            &in_window,
            &self.snapshots,
            &self.servers,
        ))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequestStatus;
    use chrono::TimeZone;
    use std::time::Duration;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn request(id: i64, age_secs: i64) -> RequestEvent {
        RequestEvent {
            request_id: id,
            server_id: 1,
            timestamp: now() - ChronoDuration::seconds(age_secs),
            response_time: 50.0,
            status: RequestStatus::Success,
        }
    }

    fn server() -> ServerRecord {
        ServerRecord {
            server_id: 1,
            capacity: 10,
            weight: None,
        }
    }

    #[tokio::test]
    async fn test_empty_store_yields_no_rows() {
        let source = MemoryEventSource::new(StoreConfig::default());
        let rows = source.fetch().await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_lookback_window_excludes_old_requests() {
        let config = StoreConfig {
            lookback_window: Duration::from_secs(3600),
            ..Default::default()
        };
        let source = MemoryEventSource::new(config)
            .with_requests(vec![request(1, 60), request(2, 7200)])
            .with_servers(vec![server()])
            .with_now(now());

        let rows = source.fetch().await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.request_id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[tokio::test]
    async fn test_unavailable_store_returns_no_rows() {
        let source = MemoryEventSource::new(StoreConfig::default())
            .with_requests(vec![request(1, 1)])
            .with_servers(vec![server()])
            .unavailable("connection refused");

        let err = source.fetch().await.unwrap_err();
        assert!(err.is_store_failure());
    }
}
