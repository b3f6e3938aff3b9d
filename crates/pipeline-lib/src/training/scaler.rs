//! Feature standardisation
//!
//! Per-feature mean and population standard deviation, in canonical feature
//! order. A constant feature gets a scale of 1 so transforming never divides
//! by zero. Serving applies exactly `(x - mean) / scale` with these values.

use crate::features::NUM_FEATURES;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on rows of canonical feature values
    pub fn fit(rows: &[[f64; NUM_FEATURES]]) -> Self {
        let mut mean = vec![0.0; NUM_FEATURES];
        let mut scale = vec![1.0; NUM_FEATURES];
        if rows.is_empty() {
            return Self { mean, scale };
        }

        let n = rows.len() as f64;
        for col in 0..NUM_FEATURES {
            let m = rows.iter().map(|r| r[col]).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[col] - m).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            mean[col] = m;
            scale[col] = if std > f64::EPSILON { std } else { 1.0 };
        }
        Self { mean, scale }
    }

    pub fn transform(&self, row: &[f64; NUM_FEATURES]) -> [f64; NUM_FEATURES] {
        let mut out = [0.0; NUM_FEATURES];
        for (i, v) in row.iter().enumerate() {
            let mean = self.mean.get(i).copied().unwrap_or(0.0);
            let scale = self.scale.get(i).copied().unwrap_or(1.0);
            out[i] = (v - mean) / scale;
        }
        out
    }

    /// True when both vectors have one entry per feature
    pub fn is_complete(&self) -> bool {
        self.mean.len() == NUM_FEATURES && self.scale.len() == NUM_FEATURES
    }
}
