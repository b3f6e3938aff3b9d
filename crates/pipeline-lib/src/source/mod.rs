//! Event source adapters
//!
//! Read-only access to the store of requests, metric snapshots and server
//! records. Every adapter returns the same shape: one [`JoinedRow`] per
//! (request, matching snapshot) pair, or one null-metric row per request
//! that matched nothing, restricted to the configured lookback window.

mod memory;
mod postgres;

pub use memory::MemoryEventSource;
pub use postgres::PgEventSource;

pub use async_trait::async_trait;

use crate::error::Result;
use crate::models::JoinedRow;
use std::fmt;
use std::time::Duration;

/// Default lookback window (7 days)
pub const DEFAULT_LOOKBACK_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default metric-match tolerance (1 minute)
pub const DEFAULT_METRIC_TOLERANCE: Duration = Duration::from_secs(60);

/// Default store query timeout
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection secret for the event store. `Debug` never prints it.
#[derive(Clone, Default)]
pub struct StoreCredentials(String);

impl StoreCredentials {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self(connection_string.into())
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StoreCredentials(<redacted>)")
    }
}

/// Configuration handed to an event source at construction
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Only requests newer than `now - lookback_window` are fetched
    pub lookback_window: Duration,
    /// Maximum gap between a snapshot and the request it is joined to
    pub metric_tolerance: Duration,
    /// A query running longer than this is reported as `StoreUnavailable`
    pub query_timeout: Duration,
    pub credentials: StoreCredentials,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lookback_window: DEFAULT_LOOKBACK_WINDOW,
            metric_tolerance: DEFAULT_METRIC_TOLERANCE,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            credentials: StoreCredentials::default(),
        }
    }
}

/// Trait for event store implementations
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch joined rows for the configured window.
    ///
    /// An empty vector is a valid result. Any connectivity or query failure
    /// is returned as `PipelineError::StoreUnavailable` and no rows.
    async fn fetch(&self) -> Result<Vec<JoinedRow>>;

    /// Short name used in logs
    fn name(&self) -> &str;
}
