//! Canonical feature schema shared by training and serving

use crate::error::{PipelineError, Result};
use crate::models::{ServerFeatureVector, ServerId};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// Number of features in a server vector
pub const NUM_FEATURES: usize = 6;

/// Feature names in canonical order
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "cpu_usage",
    "memory_usage",
    "active_conns",
    "error_rate",
    "response_p95",
    "capacity",
];

/// One column of the server feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureName {
    CpuUsage,
    MemoryUsage,
    ActiveConns,
    ErrorRate,
    ResponseP95,
    Capacity,
}

impl FeatureName {
    /// All features in canonical order
    pub const ALL: [FeatureName; NUM_FEATURES] = [
        FeatureName::CpuUsage,
        FeatureName::MemoryUsage,
        FeatureName::ActiveConns,
        FeatureName::ErrorRate,
        FeatureName::ResponseP95,
        FeatureName::Capacity,
    ];

    pub fn as_str(&self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }

    /// Position of this feature in the canonical order
    pub fn index(&self) -> usize {
        match self {
            FeatureName::CpuUsage => 0,
            FeatureName::MemoryUsage => 1,
            FeatureName::ActiveConns => 2,
            FeatureName::ErrorRate => 3,
            FeatureName::ResponseP95 => 4,
            FeatureName::Capacity => 5,
        }
    }

    /// Owned canonical names, in order
    pub fn names() -> Vec<String> {
        FEATURE_NAMES.iter().map(|n| n.to_string()).collect()
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureName {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        FeatureName::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown feature: {}", s))
    }
}

impl ServerFeatureVector {
    /// Values in canonical column order
    pub fn to_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.cpu_usage,
            self.memory_usage,
            self.active_conns as f64,
            self.error_rate,
            self.response_p95,
            self.capacity as f64,
        ]
    }

    /// Names of the value columns a vector serializes, read off the struct
    /// itself rather than [`FEATURE_NAMES`]. The identifier column is left out.
    pub fn emitted_names() -> Result<Vec<String>> {
        let zero = ServerFeatureVector {
            server_id: 0,
            cpu_usage: 0.0,
            memory_usage: 0.0,
            active_conns: 0,
            error_rate: 0.0,
            response_p95: 0.0,
            capacity: 0,
        };
        match serde_json::to_value(&zero)? {
            serde_json::Value::Object(fields) => Ok(fields
                .into_iter()
                .map(|(name, _)| name)
                .filter(|name| name != "server_id")
                .collect()),
            other => Err(PipelineError::Training(format!(
                "feature vector serialized as {}, expected an object",
                other
            ))),
        }
    }

    pub fn get(&self, feature: FeatureName) -> f64 {
        self.to_array()[feature.index()]
    }

    /// Build a vector from name-keyed values, the way the serving side reads
    /// features. Every canonical name must be present and no other name may
    /// appear.
    pub fn from_named(server_id: ServerId, values: &HashMap<String, f64>) -> Result<Self> {
        let expected: BTreeSet<String> = FeatureName::names().into_iter().collect();
        let given: BTreeSet<String> = values.keys().cloned().collect();

        let missing: BTreeSet<String> = expected.difference(&given).cloned().collect();
        let extra: BTreeSet<String> = given.difference(&expected).cloned().collect();
        if !missing.is_empty() || !extra.is_empty() {
            return Err(PipelineError::FeatureSetMismatch { missing, extra });
        }

        let value = |f: FeatureName| values.get(f.as_str()).copied().unwrap_or(0.0);
        Ok(ServerFeatureVector {
            server_id,
            cpu_usage: value(FeatureName::CpuUsage),
            memory_usage: value(FeatureName::MemoryUsage),
            active_conns: value(FeatureName::ActiveConns).max(0.0).round() as u64,
            error_rate: value(FeatureName::ErrorRate),
            response_p95: value(FeatureName::ResponseP95),
            capacity: value(FeatureName::Capacity).round() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector() -> ServerFeatureVector {
        ServerFeatureVector {
            server_id: 1,
            cpu_usage: 60.0,
            memory_usage: 40.0,
            active_conns: 3,
            error_rate: 0.25,
            response_p95: 290.0,
            capacity: 100,
        }
    }

    #[test]
    fn test_canonical_order() {
        let names: Vec<_> = FeatureName::ALL.iter().map(|f| f.as_str()).collect();
        assert_eq!(
            names,
            vec!["cpu_usage", "memory_usage", "active_conns", "error_rate", "response_p95", "capacity"]
        );
        for (i, f) in FeatureName::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
        }
    }

    #[test]
    fn test_to_array_follows_schema() {
        let v = vector();
        assert_eq!(v.to_array(), [60.0, 40.0, 3.0, 0.25, 290.0, 100.0]);
        assert_eq!(v.get(FeatureName::ResponseP95), 290.0);
    }

    #[test]
    fn test_from_str_round_trip() {
        for f in FeatureName::ALL {
            assert_eq!(f.as_str().parse::<FeatureName>().unwrap(), f);
        }
        assert!("foo".parse::<FeatureName>().is_err());
    }

    #[test]
    fn test_emitted_names_match_canonical_set() {
        let emitted: BTreeSet<String> = ServerFeatureVector::emitted_names()
            .unwrap()
            .into_iter()
            .collect();
        let canonical: BTreeSet<String> = FeatureName::names().into_iter().collect();
        assert_eq!(emitted, canonical);
    }

    #[test]
    fn test_from_named_ignores_key_order() {
        let v = vector();
        let mut named: HashMap<String, f64> = HashMap::new();
        for f in FeatureName::ALL.iter().rev() {
            named.insert(f.as_str().to_string(), v.get(*f));
        }
        assert_eq!(ServerFeatureVector::from_named(1, &named).unwrap(), v);
    }

    #[test]
    fn test_from_named_reports_missing_and_extra() {
        let mut named: HashMap<String, f64> = FeatureName::names()
            .into_iter()
            .map(|n| (n, 1.0))
            .collect();
        named.remove("capacity");
        named.insert("weight".to_string(), 1.0);

        match ServerFeatureVector::from_named(1, &named) {
            Err(PipelineError::FeatureSetMismatch { missing, extra }) => {
                assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec!["capacity"]);
                assert_eq!(extra.into_iter().collect::<Vec<_>>(), vec!["weight"]);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }
}
