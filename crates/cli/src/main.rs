//! Neura Balancer pipeline CLI
//!
//! An offline tool for checking train/serve feature parity, inspecting
//! exported artifacts and computing features from a dump of joined rows.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{features, show, verify};
use pipeline_lib::features::FEATURE_NAMES;
use std::path::PathBuf;
use std::process::ExitCode;

/// Neura Balancer pipeline CLI
#[derive(Parser)]
#[command(name = "nbctl")]
#[command(author, version, about = "CLI for the Neura Balancer feature pipeline", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, short, global = true, default_value = "table", env = "NBCTL_FORMAT")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Re-run the parity check against an exported feature manifest
    Verify {
        /// Path to feature_manifest.json
        manifest: PathBuf,
    },

    /// Inspect exported artifacts
    #[command(subcommand)]
    Show(ShowCommands),

    /// Compute features and labels from a JSON dump of joined rows
    Features {
        /// Path to a JSON array of joined rows
        rows: PathBuf,
    },

    /// Print the canonical feature list
    Schema,
}

#[derive(Subcommand)]
pub enum ShowCommands {
    /// Show a feature manifest
    Manifest { path: PathBuf },

    /// Show scaler parameters
    Scaler { path: PathBuf },

    /// Show a trained model
    Model { path: PathBuf },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Verify { manifest } => {
            if !verify::verify(&manifest, cli.format)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Show(show_cmd) => match show_cmd {
            ShowCommands::Manifest { path } => show::show_manifest(&path, cli.format)?,
            ShowCommands::Scaler { path } => show::show_scaler(&path, cli.format)?,
            ShowCommands::Model { path } => show::show_model(&path, cli.format)?,
        },
        Commands::Features { rows } => {
            features::show_features(&rows, cli.format)?;
        }
        Commands::Schema => match cli.format {
            output::OutputFormat::Json => output::print_json(&FEATURE_NAMES),
            output::OutputFormat::Table => {
                for (index, name) in FEATURE_NAMES.iter().enumerate() {
                    println!("{} {}", index, name);
                }
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}
