//! Temporal join of requests to metric snapshots
//!
//! A request is matched to every snapshot of the same server whose timestamp
//! lies in `[request.timestamp - tolerance, request.timestamp]`. A request
//! with no match still yields exactly one row, with null metric fields.

use crate::models::{JoinedRow, MetricSnapshot, RequestEvent, ServerId, ServerRecord};
use chrono::Duration as ChronoDuration;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Joins requests to the snapshots taken shortly before them
pub struct TemporalJoin {
    tolerance: ChronoDuration,
}

impl TemporalJoin {
    pub fn new(tolerance: Duration) -> Self {
        Self {
            tolerance: ChronoDuration::from_std(tolerance).unwrap_or(ChronoDuration::MAX),
        }
    }

    /// Join requests against snapshots and server records.
    ///
    /// Requests whose server has no record are dropped, matching the inner
    /// join on servers in the store query. Output is ordered by request
    /// timestamp, then request id, then snapshot timestamp.
    pub fn join(
        &self,
        requests: &[RequestEvent],
        snapshots: &[MetricSnapshot],
        servers: &[ServerRecord],
    ) -> Vec<JoinedRow> {
        let servers: BTreeMap<ServerId, &ServerRecord> =
            servers.iter().map(|s| (s.server_id, s)).collect();

        let mut by_server: BTreeMap<ServerId, Vec<&MetricSnapshot>> = BTreeMap::new();
        for snapshot in snapshots {
            by_server.entry(snapshot.server_id).or_default().push(snapshot);
        }
        for series in by_server.values_mut() {
            series.sort_by_key(|s| s.timestamp);
        }

        let mut ordered: Vec<&RequestEvent> = requests.iter().collect();
        ordered.sort_by_key(|r| (r.timestamp, r.request_id));

        let mut rows = Vec::with_capacity(ordered.len());
        let mut unmatched = 0usize;
        let mut orphaned = 0usize;

        for request in ordered {
            let Some(server) = servers.get(&request.server_id) else {
                orphaned += 1;
                continue;
            };

            let matches = by_server
                .get(&request.server_id)
                .map(|series| self.window(series, request))
                .unwrap_or_default();

            if matches.is_empty() {
                unmatched += 1;
                rows.push(JoinedRow::unmatched(request, server));
            } else {
                rows.extend(matches.iter().map(|m| JoinedRow::matched(request, server, m)));
            }
        }

        debug!(
            rows = rows.len(),
            unmatched_requests = unmatched,
            requests_without_server = orphaned,
            "Temporal join completed"
        );
        rows
    }

    /// Snapshots in `[ts - tolerance, ts]` from a timestamp-sorted series
    fn window<'a>(
        &self,
        series: &[&'a MetricSnapshot],
        request: &RequestEvent,
    ) -> Vec<&'a MetricSnapshot> {
        let upper = request.timestamp;
        let lower = upper
            .checked_sub_signed(self.tolerance)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);

        let start = series.partition_point(|s| s.timestamp < lower);
        let end = series.partition_point(|s| s.timestamp <= upper);
        series[start..end.max(start)].to_vec()
    }
}
