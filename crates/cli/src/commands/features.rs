//! Offline feature computation from a dump of joined rows

use anyhow::{Context, Result};
use pipeline_lib::features::FEATURE_NAMES;
use pipeline_lib::pipeline::compute;
use pipeline_lib::{JoinedRow, ServerFeatureVector, ServerLabel};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tabled::Tabled;

use crate::output::{
    color_error_rate, format_float, format_ms, print_info, print_json, print_table,
    print_warning, OutputFormat,
};

#[derive(Tabled, Serialize)]
struct FeatureRow {
    #[tabled(rename = "Server")]
    server_id: i64,
    #[tabled(rename = "CPU %")]
    cpu_usage: String,
    #[tabled(rename = "Mem %")]
    memory_usage: String,
    #[tabled(rename = "Conns")]
    active_conns: u64,
    #[tabled(rename = "Errors")]
    error_rate: String,
    #[tabled(rename = "p95")]
    response_p95: String,
    #[tabled(rename = "Capacity")]
    capacity: i64,
    #[tabled(rename = "Label")]
    label: String,
}

#[derive(Serialize)]
struct FeatureReport {
    feature_names: Vec<&'static str>,
    features: Vec<ServerFeatureVector>,
    labels: Vec<ServerLabel>,
    division_guards: usize,
    null_metric_rows: usize,
}

/// Load joined rows from a JSON array
pub fn load_rows(path: &Path) -> Result<Vec<JoinedRow>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of joined rows", path.display()))
}

pub fn show_features(path: &Path, format: OutputFormat) -> Result<()> {
    let rows = load_rows(path)?;
    let (aggregation, labels) = compute(&rows);

    if let OutputFormat::Json = format {
        print_json(&FeatureReport {
            feature_names: FEATURE_NAMES.to_vec(),
            features: aggregation.vectors,
            labels,
            division_guards: aggregation.division_guards,
            null_metric_rows: aggregation.null_metric_rows,
        });
        return Ok(());
    }

    if rows.is_empty() {
        print_warning("No rows in input, features and labels are empty");
        return Ok(());
    }

    let scores: BTreeMap<i64, f64> = labels.iter().map(|l| (l.server_id, l.score)).collect();
    let table: Vec<FeatureRow> = aggregation
        .vectors
        .iter()
        .map(|v| FeatureRow {
            server_id: v.server_id,
            cpu_usage: format_float(v.cpu_usage),
            memory_usage: format_float(v.memory_usage),
            active_conns: v.active_conns,
            error_rate: color_error_rate(v.error_rate),
            response_p95: format_ms(v.response_p95),
            capacity: v.capacity,
            label: scores
                .get(&v.server_id)
                .map(|s| format_float(*s))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    print_table(&table, format);
    print_info(&format!(
        "{} rows, {} servers, {} without metrics, {} division guards",
        rows.len(),
        aggregation.vectors.len(),
        aggregation.null_metric_rows,
        aggregation.division_guards
    ));
    Ok(())
}
