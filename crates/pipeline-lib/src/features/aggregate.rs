//! Per-server feature aggregation
//!
//! Groups joined rows by server and reduces each group with a fixed rule per
//! feature:
//! - `cpu_usage`, `memory_usage`: mean over non-null metric values
//! - `active_conns`: sum of per-row `request_count`, a row without one counts as 1
//! - `error_rate`: failed joined rows / `max(active_conns, 1)`, both counted per row
//! - `response_p95`: interpolated 95th percentile over requests that matched a snapshot
//! - `capacity`: first observed value
//!
//! Aggregates with no defined value are emitted as 0 so the vector never
//! carries a missing value into scoring or training.

use super::stats::{guarded_ratio, mean, percentile};
use crate::models::{JoinedRow, ServerFeatureVector, ServerId};
use std::collections::BTreeMap;
use tracing::debug;

/// Percentile used for the response time feature
pub const PERCENTILE: f64 = 95.0;

/// Result of aggregating one batch of joined rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    /// One vector per server, ordered by server id
    pub vectors: Vec<ServerFeatureVector>,
    /// Groups where the error-rate denominator was zero
    pub division_guards: usize,
    /// Rows that carried no metric snapshot
    pub null_metric_rows: usize,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Reduces joined rows to per-server feature vectors
#[derive(Debug, Clone)]
pub struct FeatureAggregator {
    percentile: f64,
}

impl Default for FeatureAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureAggregator {
    pub fn new() -> Self {
        Self {
            percentile: PERCENTILE,
        }
    }

    /// Group rows by server id, preserving input order inside each group
    pub fn group_by_server(rows: &[JoinedRow]) -> BTreeMap<ServerId, Vec<&JoinedRow>> {
        let mut groups: BTreeMap<ServerId, Vec<&JoinedRow>> = BTreeMap::new();
        for row in rows {
            groups.entry(row.server_id).or_default().push(row);
        }
        groups
    }

    pub fn aggregate(&self, rows: &[JoinedRow]) -> Aggregation {
        let mut out = Aggregation {
            null_metric_rows: rows.iter().filter(|r| !r.has_metrics()).count(),
            ..Default::default()
        };

        for (server_id, group) in Self::group_by_server(rows) {
            let (vector, guarded) = self.aggregate_group(server_id, &group);
            if guarded {
                out.division_guards += 1;
                debug!(
                    event = "division_guard_triggered",
                    server_id = server_id,
                    "active_conns was zero, substituted 1 as error_rate denominator"
                );
            }
            out.vectors.push(vector);
        }
        out
    }

    /// Aggregate a single server group. The flag reports whether the
    /// error-rate zero-guard fired.
    pub fn aggregate_group(
        &self,
        server_id: ServerId,
        rows: &[&JoinedRow],
    ) -> (ServerFeatureVector, bool) {
        let cpu: Vec<f64> = rows.iter().filter_map(|r| r.cpu_usage).collect();
        let memory: Vec<f64> = rows.iter().filter_map(|r| r.memory_usage).collect();

        let active_conns: u64 = rows
            .iter()
            .map(|r| r.request_count.map(|c| c.max(0) as u64).unwrap_or(1))
            .sum();

        // Counted per joined row, like the request_count sum it is divided by.
        let failed = rows.iter().filter(|r| r.status.is_failure()).count();

        let (ratio, guarded) = guarded_ratio(failed as u64, active_conns);
        let error_rate = if guarded { 0.0 } else { ratio.clamp(0.0, 1.0) };

        let mut response_times: BTreeMap<i64, f64> = BTreeMap::new();
        for row in rows.iter().filter(|r| r.has_metrics()) {
            response_times.entry(row.request_id).or_insert(row.response_time);
        }
        let response_times: Vec<f64> = response_times.into_values().collect();

        let vector = ServerFeatureVector {
            server_id,
            cpu_usage: mean(&cpu).unwrap_or(0.0),
            memory_usage: mean(&memory).unwrap_or(0.0),
            active_conns,
            error_rate,
            response_p95: percentile(&response_times, self.percentile)
                .unwrap_or(0.0)
                .max(0.0),
            capacity: rows.first().map(|r| r.capacity).unwrap_or(0),
        };
        (vector, guarded)
    }
}
