//! Parity verification against an exported manifest

use anyhow::Result;
use colored::Colorize;
use pipeline_lib::features::FEATURE_NAMES;
use pipeline_lib::parity::verify_manifest_file;
use pipeline_lib::PipelineError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

use crate::output::{format_names, print_error, print_json, print_success, OutputFormat};

#[derive(Serialize)]
struct VerifyResult {
    manifest: String,
    ok: bool,
    missing: BTreeSet<String>,
    extra: BTreeSet<String>,
}

/// Re-run the parity check. Returns whether the manifest matches; a missing
/// or unreadable manifest is an error.
pub fn verify(path: &Path, format: OutputFormat) -> Result<bool> {
    let (missing, extra) = match verify_manifest_file(path) {
        Ok(_) => (BTreeSet::new(), BTreeSet::new()),
        Err(PipelineError::FeatureSetMismatch { missing, extra }) => (missing, extra),
        Err(e) => return Err(e.into()),
    };
    let ok = missing.is_empty() && extra.is_empty();

    match format {
        OutputFormat::Json => print_json(&VerifyResult {
            manifest: path.display().to_string(),
            ok,
            missing,
            extra,
        }),
        OutputFormat::Table => {
            if ok {
                print_success(&format!(
                    "{} matches the {} training features",
                    path.display().to_string().cyan(),
                    FEATURE_NAMES.len()
                ));
            } else {
                print_error(&format!("{} does not match training features", path.display()));
                eprintln!("  missing: {}", format_names(&missing));
                eprintln!("  extra:   {}", format_names(&extra));
            }
        }
    }

    Ok(ok)
}
