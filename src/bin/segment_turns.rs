//! Speaker segments to conversational turns.
//!
//! Reads a diarized `speaker,start,end,text` CSV and writes merged turns
//! (`speaker,start,end,text,bc_count,secondary_speech,sentiment`).
//!
//! Usage:
//!   cargo run --bin segment-turns -- \
//!     --input speaker_segments.csv --output conversational_turns.csv

use anyhow::{Context, Result};
use clap::Parser;
use convo_analyzer::turns;
use convo_analyzer::AnalysisConfig;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Merge diarized speech segments into conversational turns.
#[derive(Parser)]
#[command(name = "segment-turns")]
struct Args {
    /// Speaker segment CSV
    #[arg(long, short)]
    input: PathBuf,

    /// Output turn CSV
    #[arg(long, short)]
    output: PathBuf,

    /// Analysis config TOML (uses the [turns] section)
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

    let args = Args::parse();
    let config =
        AnalysisConfig::load(args.config.as_deref()).context("Failed to load analysis config")?;

    let segments = turns::load_segments(&args.input)
        .with_context(|| format!("Failed to read segments from {}", args.input.display()))?;
    let merged = turns::segment_turns(&segments, &config.turns);

    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    turns::write_turns(BufWriter::new(file), &merged)
        .with_context(|| format!("Failed to write turns to {}", args.output.display()))?;

    println!(
        "Merged {} segments into {} turns -> {}",
        segments.len(),
        merged.len(),
        args.output.display()
    );
    Ok(())
}
