//! Training label scoring
//!
//! Each request is scored as
//! `0.7 * response_time + 0.2 * cpu_usage + 0.1 * failed`, and a server's
//! label is the mean score of its requests. The weights are part of the
//! label definition: changing them produces a different [`LABEL_VERSION`]
//! and models trained on the old labels must not be compared with new ones.

use crate::error::{PipelineError, Result};
use crate::features::FeatureAggregator;
use crate::models::{JoinedRow, ServerFeatureVector, ServerId, ServerLabel};
use std::collections::{BTreeMap, BTreeSet};

/// Weight of response time (ms) in the score
pub const RESPONSE_TIME_WEIGHT: f64 = 0.7;

/// Weight of CPU usage (percent) in the score
pub const CPU_WEIGHT: f64 = 0.2;

/// Weight of the failure indicator in the score
pub const FAILURE_WEIGHT: f64 = 0.1;

/// Identifies the score definition above
pub const LABEL_VERSION: &str = "score-v1-0.7rt-0.2cpu-0.1fail";

/// Score a single request
pub fn score_request(response_time: f64, cpu_usage: f64, failed: bool) -> f64 {
    let indicator = if failed { 1.0 } else { 0.0 };
    RESPONSE_TIME_WEIGHT * response_time + CPU_WEIGHT * cpu_usage + FAILURE_WEIGHT * indicator
}

/// Per-request view assembled from one or more joined rows
struct RequestScore {
    response_time: f64,
    failed: bool,
    cpu: Vec<f64>,
}

/// Computes per-server labels from joined rows
#[derive(Debug, Clone, Default)]
pub struct LabelScorer;

impl LabelScorer {
    pub fn new() -> Self {
        Self
    }

    /// One label per server that has at least one row, ordered by server id.
    ///
    /// A request matched to several snapshots is scored once, with the mean
    /// of its snapshots' CPU usage. Requests with no CPU observation have no
    /// defined score and are left out of the mean; a server where no request
    /// could be scored gets a label of 0.
    pub fn score(&self, rows: &[JoinedRow]) -> Vec<ServerLabel> {
        FeatureAggregator::group_by_server(rows)
            .into_iter()
            .map(|(server_id, group)| ServerLabel {
                server_id,
                score: self.score_group(&group),
            })
            .collect()
    }

    fn score_group(&self, rows: &[&JoinedRow]) -> f64 {
        let mut requests: BTreeMap<i64, RequestScore> = BTreeMap::new();
        for row in rows {
            let entry = requests.entry(row.request_id).or_insert_with(|| RequestScore {
                response_time: row.response_time,
                failed: row.status.is_failure(),
                cpu: Vec::new(),
            });
            if let Some(cpu) = row.cpu_usage {
                entry.cpu.push(cpu);
            }
        }

        let scores: Vec<f64> = requests
            .values()
            .filter_map(|r| {
                crate::features::mean(&r.cpu).map(|cpu| score_request(r.response_time, cpu, r.failed))
            })
            .collect();

        crate::features::mean(&scores).unwrap_or(0.0)
    }
}

/// A feature vector paired with its label
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    pub features: ServerFeatureVector,
    pub label: f64,
}

/// Pair feature vectors and labels by server id.
///
/// The two inputs come from independent group-bys and may be in any order;
/// the output follows the order of `features`. Any server present on only
/// one side is an error.
pub fn align(features: &[ServerFeatureVector], labels: &[ServerLabel]) -> Result<Vec<LabeledExample>> {
    let by_server: BTreeMap<ServerId, f64> = labels.iter().map(|l| (l.server_id, l.score)).collect();
    let feature_ids: BTreeSet<ServerId> = features.iter().map(|f| f.server_id).collect();

    let orphaned_features: Vec<ServerId> = feature_ids
        .iter()
        .filter(|id| !by_server.contains_key(id))
        .copied()
        .collect();
    let orphaned_labels: Vec<ServerId> = by_server
        .keys()
        .filter(|id| !feature_ids.contains(id))
        .copied()
        .collect();

    if !orphaned_features.is_empty()
        || !orphaned_labels.is_empty()
        || by_server.len() != labels.len()
        || feature_ids.len() != features.len()
    {
        return Err(PipelineError::LabelAlignment {
            orphaned_features,
            orphaned_labels,
        });
    }

    Ok(features
        .iter()
        .map(|f| LabeledExample {
            features: f.clone(),
            label: by_server[&f.server_id],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequestStatus;
    use chrono::{TimeZone, Utc};

    fn row(request_id: i64, server_id: ServerId, rt: f64, cpu: Option<f64>, failed: bool) -> JoinedRow {
        let ts = Utc.timestamp_opt(1_700_000_000 + request_id, 0).unwrap();
        JoinedRow {
            request_id,
            server_id,
            timestamp: ts,
            response_time: rt,
            status: if failed { RequestStatus::Failure } else { RequestStatus::Success },
            capacity: 10,
            weight: None,
            metric_timestamp: cpu.map(|_| ts),
            cpu_usage: cpu,
            memory_usage: cpu,
            request_count: cpu.map(|_| 1),
        }
    }

    fn vector(server_id: ServerId) -> ServerFeatureVector {
        ServerFeatureVector {
            server_id,
            cpu_usage: 0.0,
            memory_usage: 0.0,
            active_conns: 1,
            error_rate: 0.0,
            response_p95: 0.0,
            capacity: 1,
        }
    }

    #[test]
    fn test_score_request_weights() {
        assert!((score_request(100.0, 50.0, false) - 80.0).abs() < 1e-9);
        assert!((score_request(100.0, 50.0, true) - 80.1).abs() < 1e-9);
    }

    #[test]
    fn test_server_label_is_mean_of_request_scores() {
        let rows = vec![
            row(1, 1, 100.0, Some(50.0), false),
            row(2, 1, 200.0, Some(60.0), true),
            row(3, 1, 300.0, Some(70.0), false),
        ];
        let labels = LabelScorer::new().score(&rows);
        let expected = (score_request(100.0, 50.0, false)
            + score_request(200.0, 60.0, true)
            + score_request(300.0, 70.0, false))
            / 3.0;
        assert_eq!(labels.len(), 1);
        assert!((labels[0].score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_unscorable_requests_excluded() {
        let rows = vec![row(1, 1, 100.0, Some(50.0), false), row(2, 1, 9_999.0, None, true)];
        let labels = LabelScorer::new().score(&rows);
        assert!((labels[0].score - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_server_without_scores_gets_zero_label() {
        let labels = LabelScorer::new().score(&[row(1, 4, 100.0, None, false)]);
        assert_eq!(labels, vec![ServerLabel { server_id: 4, score: 0.0 }]);
    }

    #[test]
    fn test_multi_snapshot_request_scored_once() {
        let mut a = row(1, 1, 100.0, Some(40.0), false);
        let b = row(1, 1, 100.0, Some(60.0), false);
        a.metric_timestamp = Some(a.timestamp - chrono::Duration::seconds(10));
        let labels = LabelScorer::new().score(&[a, b]);
        assert!((labels[0].score - score_request(100.0, 50.0, false)).abs() < 1e-9);
    }

    #[test]
    fn test_align_rekeys_by_server() {
        let features = vec![vector(1), vector(2)];
        let labels = vec![
            ServerLabel { server_id: 2, score: 20.0 },
            ServerLabel { server_id: 1, score: 10.0 },
        ];
        let examples = align(&features, &labels).unwrap();
        assert_eq!(examples[0].features.server_id, 1);
        assert_eq!(examples[0].label, 10.0);
        assert_eq!(examples[1].label, 20.0);
    }

    #[test]
    fn test_align_rejects_orphans() {
        let features = vec![vector(1), vector(2)];
        let labels = vec![
            ServerLabel { server_id: 1, score: 1.0 },
            ServerLabel { server_id: 3, score: 3.0 },
        ];
        match align(&features, &labels) {
            Err(PipelineError::LabelAlignment { orphaned_features, orphaned_labels }) => {
                assert_eq!(orphaned_features, vec![2]);
                assert_eq!(orphaned_labels, vec![3]);
            }
            other => panic!("expected alignment error, got {:?}", other),
        }
    }

    #[test]
    fn test_labels_share_feature_universe() {
        let rows = vec![
            row(1, 1, 100.0, Some(10.0), false),
            row(2, 2, 100.0, None, false),
            row(3, 3, 100.0, Some(30.0), true),
        ];
        let features = FeatureAggregator::new().aggregate(&rows).vectors;
        let labels = LabelScorer::new().score(&rows);
        let f: BTreeSet<_> = features.iter().map(|v| v.server_id).collect();
        let l: BTreeSet<_> = labels.iter().map(|v| v.server_id).collect();
        assert_eq!(f, l);
        assert_eq!(align(&features, &labels).unwrap().len(), 3);
    }
}
