//! Output artifacts
//!
//! Writes the tables of an [`AnalysisReport`] as CSV files (and the recorded
//! issues as JSON) into one output directory, and prints a console summary.
//! Nothing time- or run-dependent is written, so two runs over the same
//! input produce identical files.

use crate::analysis::AnalysisReport;
use crate::types::AnnotatedSequence;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PROCESSED_FILE: &str = "processed_sequences.csv";
pub const COUNTS_FILE: &str = "conversation_counts.csv";
pub const SUMMARY_FILE: &str = "corpus_summary.csv";
pub const TRANSITIONS_FILE: &str = "transition_probabilities.csv";
pub const PHASE_FILE: &str = "phase_disclosure.csv";
pub const SPEAKER_PHASE_FILE: &str = "speaker_phase_disclosure.csv";
pub const SLOPES_FILE: &str = "escalation_slopes.csv";
pub const ISSUES_FILE: &str = "issues.json";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV write error at {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON write error at {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One flat row of the processed sequence table
#[derive(Debug, Serialize)]
struct ProcessedRow<'a> {
    interaction_id: &'a str,
    sequence_start: f64,
    sequence_end: f64,
    sequence_duration: f64,
    sequence_type: &'a str,
    initiating_speaker: &'a str,
    next_type: Option<&'a str>,
    next_speaker: Option<&'a str>,
    speaker_change: Option<&'static str>,
    progress: Option<f64>,
    phase: Option<u8>,
}

impl<'a> From<&'a AnnotatedSequence> for ProcessedRow<'a> {
    fn from(a: &'a AnnotatedSequence) -> Self {
        let s = &a.sequence;
        Self {
            interaction_id: &s.interaction_id,
            sequence_start: s.sequence_start,
            sequence_end: s.sequence_end,
            sequence_duration: s.sequence_duration,
            sequence_type: &s.sequence_type,
            initiating_speaker: &s.initiating_speaker,
            next_type: a.next_type(),
            next_speaker: a.next_speaker(),
            speaker_change: a.speaker_change().map(|c| c.as_str()),
            progress: a.position.map(|p| p.progress),
            phase: a.phase(),
        }
    }
}

/// Write every artifact into `dir`, creating it if needed.
///
/// Returns the paths written, in a fixed order.
pub fn write_artifacts(report: &AnalysisReport, dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
    fs::create_dir_all(dir).map_err(|source| ReportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let processed = report
        .conversations
        .iter()
        .flat_map(|c| &c.sequences)
        .map(ProcessedRow::from);

    let summary = [&report.summary.total_q, &report.summary.total_d];

    let written = vec![
        write_csv(&dir.join(PROCESSED_FILE), processed)?,
        write_csv(&dir.join(COUNTS_FILE), &report.counts)?,
        write_csv(&dir.join(SUMMARY_FILE), summary)?,
        write_csv(&dir.join(TRANSITIONS_FILE), &report.transitions)?,
        write_csv(&dir.join(PHASE_FILE), &report.phase_disclosure)?,
        write_csv(&dir.join(SPEAKER_PHASE_FILE), &report.speaker_phase_disclosure)?,
        write_csv(&dir.join(SLOPES_FILE), &report.escalation_slopes)?,
        write_issues(&dir.join(ISSUES_FILE), report)?,
    ];

    tracing::info!(dir = %dir.display(), files = written.len(), "Artifacts written");
    Ok(written)
}

fn write_csv<I>(path: &Path, rows: I) -> Result<PathBuf, ReportError>
where
    I: IntoIterator,
    I::Item: Serialize,
{
    let csv_err = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(path.to_path_buf())
}

fn write_issues(path: &Path, report: &AnalysisReport) -> Result<PathBuf, ReportError> {
    let file = File::create(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &report.issues).map_err(|source| {
        ReportError::Json {
            path: path.to_path_buf(),
            source,
        }
    })?;
    writer.flush().map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(path.to_path_buf())
}

/// Print the headline numbers of a run
pub fn print_summary(report: &AnalysisReport) {
    let q = &report.summary.total_q;
    let d = &report.summary.total_d;

    println!("=== Conversational Sequence Analysis ===");
    println!(
        "  Sequences:     {} in {} conversations",
        report.sequence_count(),
        report.counts.len()
    );
    println!("  Questions:     mean {:.2}, sd {:.2}", q.mean, q.std_dev);
    println!("  Disclosures:   mean {:.2}, sd {:.2}", d.mean, d.std_dev);
    println!();
    println!("  {:<12} {:<16} {:<12} {:>6} {:>7}", "type", "speaker change", "next", "n", "prob");
    for t in &report.transitions {
        println!(
            "  {:<12} {:<16} {:<12} {:>6} {:>7.3}",
            t.sequence_type,
            t.speaker_change.map_or("-", |c| c.as_str()),
            t.next_type.as_deref().unwrap_or("-"),
            t.count,
            t.prob
        );
    }
    println!();

    let fitted = report.escalation_slopes.iter().filter(|s| !s.slope.is_nan()).count();
    println!(
        "  Slopes:        {} fitted of {} speaker tracks",
        fitted,
        report.escalation_slopes.len()
    );
    println!(
        "  Issues:        {} ({} degenerate conversations)",
        report.issues.len(),
        report.degenerate_conversations()
    );
}
