//! Inspect exported artifacts

use anyhow::{Context, Result};
use colored::Colorize;
use pipeline_lib::features::FEATURE_NAMES;
use pipeline_lib::parity::FeatureManifest;
use pipeline_lib::training::{load_scaler, ModelArtifact};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::output::{
    format_float, format_ratio, print_heading, print_info, print_json, print_table, OutputFormat,
};

/// One row per feature, used by every artifact table
#[derive(Tabled, Serialize)]
struct FeatureRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Feature")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled, Serialize)]
struct ScalerRow {
    #[tabled(rename = "Feature")]
    name: String,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Scale")]
    scale: String,
}

/// Show a feature manifest
pub fn show_manifest(path: &Path, format: OutputFormat) -> Result<()> {
    let manifest = FeatureManifest::load(path)
        .with_context(|| format!("Failed to load manifest {}", path.display()))?;

    if let OutputFormat::Json = format {
        print_json(&manifest);
        return Ok(());
    }

    print_heading("Feature Manifest");
    println!("File:          {}", path.display().to_string().cyan());
    println!(
        "Label version: {}",
        manifest.label_version.as_deref().unwrap_or("-")
    );
    println!(
        "Model SHA-256: {}",
        manifest.model_sha256.as_deref().unwrap_or("-")
    );
    if let Some(generated_at) = manifest.generated_at {
        println!(
            "Generated:     {}",
            generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!();

    let rows: Vec<FeatureRow> = manifest
        .features
        .iter()
        .enumerate()
        .map(|(index, name)| FeatureRow {
            index,
            name: name.clone(),
            value: canonical_marker(index, name),
        })
        .collect();
    print_table(&rows, format);
    Ok(())
}

/// Show scaler parameters
pub fn show_scaler(path: &Path, format: OutputFormat) -> Result<()> {
    let scaler = load_scaler(path)
        .with_context(|| format!("Failed to load scaler {}", path.display()))?;

    if let OutputFormat::Json = format {
        print_json(&scaler);
        return Ok(());
    }

    print_heading("Scaler Parameters");
    let rows: Vec<ScalerRow> = scaler
        .mean
        .iter()
        .zip(&scaler.scale)
        .enumerate()
        .map(|(i, (mean, scale))| ScalerRow {
            name: FEATURE_NAMES.get(i).copied().unwrap_or("?").to_string(),
            mean: format_float(*mean),
            scale: format_float(*scale),
        })
        .collect();
    print_table(&rows, format);

    if !scaler.is_complete() {
        print_info("Scaler does not cover all features in canonical order");
    }
    Ok(())
}

/// Show a trained model artifact
pub fn show_model(path: &Path, format: OutputFormat) -> Result<()> {
    let model = ModelArtifact::load(path)
        .with_context(|| format!("Failed to load model {}", path.display()))?;

    if let OutputFormat::Json = format {
        print_json(&model);
        return Ok(());
    }

    print_heading("Model");
    println!("Version:       {}", model.model_version.cyan());
    println!("Label version: {}", model.label_version);
    println!("Kind:          {}", model.kind);
    println!(
        "Trained:       {}",
        model.trained_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("Bias:          {}", format_float(model.bias));
    println!();

    let rows: Vec<FeatureRow> = model
        .feature_names
        .iter()
        .zip(&model.weights)
        .enumerate()
        .map(|(index, (name, weight))| FeatureRow {
            index,
            name: name.clone(),
            value: format_float(*weight),
        })
        .collect();
    print_table(&rows, format);

    let eval = &model.evaluation;
    println!();
    println!("{}", "Validation".bold());
    println!("{}", "-".repeat(60));
    println!("Samples:  {}", eval.samples);
    println!("MAE:      {}", format_float(eval.mae));
    println!("RMSE:     {}", format_float(eval.rmse));
    println!("Accuracy: {}", format_ratio(eval.accuracy));
    Ok(())
}

fn canonical_marker(index: usize, name: &str) -> String {
    match FEATURE_NAMES.get(index) {
        Some(expected) if *expected == name => "canonical".green().to_string(),
        Some(expected) => format!("expected {}", expected).red().to_string(),
        None => "extra".red().to_string(),
    }
}
