//! Feature computation
//!
//! Turns joined rows into one feature vector per server. The column order of
//! every vector is fixed by [`FeatureName::ALL`]; training consumes vectors
//! positionally in that order.

mod aggregate;
mod schema;
mod stats;

pub use aggregate::{Aggregation, FeatureAggregator, PERCENTILE};
pub use schema::{FeatureName, FEATURE_NAMES, NUM_FEATURES};
pub use stats::{guarded_ratio, mean, percentile};
