//! Conversational Sequence Analyzer
//!
//! Loads an annotated sequence table, runs the analysis and writes every
//! output table.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release -- --input data/sample_sequences.csv
//! cargo run --release -- --input sequences.csv --output-dir results --config analysis_config.toml
//! ```
//!
//! # Environment Variables
//!
//! - `CONVO_CONFIG`: Path to an analysis config TOML (when `--config` is not given)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use convo_analyzer::{analysis, report, AnalysisConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "convo-analyzer")]
#[command(about = "Transition, phase and escalation analysis of conversational sequences")]
#[command(version)]
struct CliArgs {
    /// Sequence table (CSV) to analyze
    #[arg(long, short)]
    input: PathBuf,

    /// Directory for the output tables (overrides output.dir from config)
    #[arg(long, short)]
    output_dir: Option<PathBuf>,

    /// Analysis config TOML
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let config =
        AnalysisConfig::load(args.config.as_deref()).context("Failed to load analysis config")?;
    let output_dir = args.output_dir.unwrap_or_else(|| config.output.dir.clone());

    let table = analysis::load_sequences(&args.input)
        .with_context(|| format!("Failed to load sequences from {}", args.input.display()))?;

    let outcome = analysis::run(&table.sequences, &config);

    let written = report::write_artifacts(&outcome, &output_dir)
        .with_context(|| format!("Failed to write artifacts to {}", output_dir.display()))?;
    for path in &written {
        info!(path = %path.display(), "Wrote");
    }

    report::print_summary(&outcome);
    Ok(())
}
