//! Sequence Table Loader
//!
//! Reads an annotated sequence table (CSV) into normalized [`Sequence`]
//! records:
//!
//! 1. Resolve the required columns from the header row
//! 2. Discard the header remnant row directly below the header
//! 3. Parse the numeric columns, failing the load on the first bad value
//! 4. Trim `sequence_type`
//! 5. Stable-sort by `(interaction_id, sequence_start)`
//!
//! # Usage
//!
//! ```ignore
//! use convo_analyzer::analysis::loader;
//!
//! let table = loader::load_sequences("data/sample_sequences.csv")?;
//! println!("{} sequences", table.sequences.len());
//! ```

use crate::config::defaults::{HEADER_REMNANT_ROWS, REQUIRED_COLUMNS};
use crate::types::Sequence;
use std::cmp::Ordering;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort a load
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("line {line} (interaction {interaction_id}): {field} = {value:?} is not a finite number")]
    Parse {
        line: u64,
        interaction_id: String,
        field: String,
        value: String,
    },

    #[error("no sequences in {0} after discarding the header remnant")]
    Empty(String),
}

/// Summary of one load, for logging and reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadInfo {
    pub source: String,
    pub sequences: usize,
    pub header_remnant_rows: usize,
    pub conversations: usize,
    /// Rows whose end precedes their start (kept, not re-validated)
    pub inverted_spans: usize,
}

/// A normalized, sorted sequence table
#[derive(Debug, Clone)]
pub struct SequenceTable {
    pub sequences: Vec<Sequence>,
    pub info: LoadInfo,
}

/// Column positions of the required fields
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    interaction_id: usize,
    sequence_start: usize,
    sequence_end: usize,
    sequence_duration: usize,
    sequence_type: usize,
    initiating_speaker: usize,
}

impl ColumnMap {
    fn from_header(header: &csv::StringRecord) -> Result<Self, LoadError> {
        let find = |name: &str| {
            header
                .iter()
                .position(|col| col.trim() == name)
                .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
        };

        let [id, start, end, duration, kind, speaker] = REQUIRED_COLUMNS;
        Ok(Self {
            interaction_id: find(id)?,
            sequence_start: find(start)?,
            sequence_end: find(end)?,
            sequence_duration: find(duration)?,
            sequence_type: find(kind)?,
            initiating_speaker: find(speaker)?,
        })
    }
}

/// Load and normalize a sequence table from disk.
pub fn load_sequences(path: impl AsRef<Path>) -> Result<SequenceTable, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_sequences(file, &path.display().to_string())
}

/// Load and normalize a sequence table from any reader.
///
/// `source` only labels log lines and errors.
pub fn read_sequences<R: Read>(reader: R, source: &str) -> Result<SequenceTable, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let columns = ColumnMap::from_header(rdr.headers()?)?;

    let mut records = rdr.records();
    let header_remnant_rows = discard_header_remnant(&mut records);

    let mut sequences = Vec::new();
    for record in records {
        sequences.push(parse_record(&record?, &columns)?);
    }

    if sequences.is_empty() {
        return Err(LoadError::Empty(source.to_string()));
    }

    let inverted_spans = sequences
        .iter()
        .filter(|s| s.sequence_end < s.sequence_start)
        .count();
    if inverted_spans > 0 {
        tracing::warn!(source, rows = inverted_spans, "Sequences ending before they start");
    }

    let sequences = normalize_order(sequences);
    let conversations = count_conversations(&sequences);

    let info = LoadInfo {
        source: source.to_string(),
        sequences: sequences.len(),
        header_remnant_rows,
        conversations,
        inverted_spans,
    };

    tracing::info!(
        source,
        sequences = info.sequences,
        conversations = info.conversations,
        discarded = info.header_remnant_rows,
        "Sequence table loaded"
    );

    Ok(SequenceTable { sequences, info })
}

/// Drop the invalid row that sits directly below the header.
///
/// The row is skipped unconditionally, without looking at its contents.
/// Returns how many rows were actually dropped (0 for a header-only file).
pub fn discard_header_remnant<I: Iterator>(records: &mut I) -> usize {
    records.by_ref().take(HEADER_REMNANT_ROWS).count()
}

/// Stable sort by `(interaction_id, sequence_start)`.
///
/// Interaction ids compare numerically when every id is an integer and
/// lexically otherwise. Rows with equal keys keep their file order.
pub fn normalize_order(mut sequences: Vec<Sequence>) -> Vec<Sequence> {
    let numeric_ids = sequences
        .iter()
        .all(|s| s.interaction_id.trim().parse::<i64>().is_ok());

    sequences.sort_by(|a, b| {
        compare_ids(&a.interaction_id, &b.interaction_id, numeric_ids)
            .then_with(|| a.sequence_start.total_cmp(&b.sequence_start))
    });
    sequences
}

fn compare_ids(a: &str, b: &str, numeric: bool) -> Ordering {
    if numeric {
        if let (Ok(x), Ok(y)) = (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
            return x.cmp(&y);
        }
    }
    a.cmp(b)
}

fn count_conversations(sorted: &[Sequence]) -> usize {
    let mut ids: Vec<&str> = sorted.iter().map(|s| s.interaction_id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    ids.len()
}

fn parse_record(record: &csv::StringRecord, columns: &ColumnMap) -> Result<Sequence, LoadError> {
    let line = record.position().map_or(0, csv::Position::line);
    let field = |idx: usize| record.get(idx).unwrap_or("");
    let interaction_id = field(columns.interaction_id).to_string();

    let numeric = |idx: usize, name: &str| -> Result<f64, LoadError> {
        let raw = field(idx);
        parse_numeric(raw).ok_or_else(|| LoadError::Parse {
            line,
            interaction_id: interaction_id.clone(),
            field: name.to_string(),
            value: raw.to_string(),
        })
    };

    Ok(Sequence {
        sequence_start: numeric(columns.sequence_start, "sequence_start")?,
        sequence_end: numeric(columns.sequence_end, "sequence_end")?,
        sequence_duration: numeric(columns.sequence_duration, "sequence_duration")?,
        sequence_type: field(columns.sequence_type).trim().to_string(),
        initiating_speaker: field(columns.initiating_speaker).to_string(),
        interaction_id: interaction_id.clone(),
        source_line: line,
    })
}

/// Parse a trimmed, finite number
fn parse_numeric(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "interaction_id,sequence_start,sequence_end,sequence_duration,sequence_type,initiating_speaker\n";

    fn load(body: &str) -> Result<SequenceTable, LoadError> {
        let csv = format!("{HEADER}{body}");
        read_sequences(csv.as_bytes(), "inline")
    }

    #[test]
    fn test_header_remnant_is_dropped() {
        let table = load("junk,,,,,\nC1,0,1,1,question,left\n").unwrap();
        assert_eq!(table.info.header_remnant_rows, 1);
        assert_eq!(table.sequences.len(), 1);
        assert_eq!(table.sequences[0].interaction_id, "C1");
    }

    #[test]
    fn test_discard_header_remnant_counts_rows() {
        let mut rows = vec![1, 2, 3].into_iter();
        assert_eq!(discard_header_remnant(&mut rows), 1);
        assert_eq!(rows.next(), Some(2));

        let mut empty = std::iter::empty::<u8>();
        assert_eq!(discard_header_remnant(&mut empty), 0);
    }

    #[test]
    fn test_sequence_type_is_trimmed_and_numbers_parse_after_trim() {
        let table = load("x,,,,,\nC1, 2.5 ,3.0, 0.5 ,  disclosure ,right\n").unwrap();
        let s = &table.sequences[0];
        assert_eq!(s.sequence_type, "disclosure");
        assert_eq!(s.sequence_start, 2.5);
        assert_eq!(s.sequence_duration, 0.5);
        assert!(s.is_disclosure());
    }

    #[test]
    fn test_non_numeric_start_aborts_with_row_identifier() {
        let err = load("x,,,,,\nC1,0,1,1,question,left\nC2,abc,1,1,question,left\n").unwrap_err();
        match err {
            LoadError::Parse {
                line,
                interaction_id,
                field,
                value,
            } => {
                assert_eq!(line, 4);
                assert_eq!(interaction_id, "C2");
                assert_eq!(field, "sequence_start");
                assert_eq!(value, "abc");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let err = load("x,,,,,\nC1,0,NaN,1,question,left\n").unwrap_err();
        assert!(matches!(err, LoadError::Parse { ref field, .. } if field == "sequence_end"));
    }

    #[test]
    fn test_empty_field_is_a_parse_error() {
        let err = load("x,,,,,\nC1,0,1,,question,left\n").unwrap_err();
        assert!(matches!(err, LoadError::Parse { ref field, .. } if field == "sequence_duration"));
    }

    #[test]
    fn test_missing_column_is_reported() {
        let csv = "interaction_id,sequence_start,sequence_end,sequence_type,initiating_speaker\nx,,,,\n";
        let err = read_sequences(csv.as_bytes(), "inline").unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(ref c) if c == "sequence_duration"));
    }

    #[test]
    fn test_only_remnant_row_is_empty_error() {
        let err = load("x,,,,,\n").unwrap_err();
        assert!(matches!(err, LoadError::Empty(_)));
    }

    #[test]
    fn test_sort_by_interaction_then_start_is_stable() {
        let table = load(
            "x,,,,,\n\
             B,5,6,1,question,left\n\
             A,3,4,1,question,left\n\
             A,1,2,1,disclosure,right\n\
             A,1,3,2,question,left\n",
        )
        .unwrap();

        let order: Vec<(&str, f64, &str)> = table
            .sequences
            .iter()
            .map(|s| (s.interaction_id.as_str(), s.sequence_start, s.sequence_type.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("A", 1.0, "disclosure"),
                ("A", 1.0, "question"),
                ("A", 3.0, "question"),
                ("B", 5.0, "question"),
            ]
        );
        assert_eq!(table.info.conversations, 2);
    }

    #[test]
    fn test_integer_ids_sort_numerically() {
        let table = load("x,,,,,\n10,0,1,1,question,left\n9,0,1,1,question,left\n").unwrap();
        assert_eq!(table.sequences[0].interaction_id, "9");
        assert_eq!(table.sequences[1].interaction_id, "10");
    }

    #[test]
    fn test_columns_found_in_any_order() {
        let csv = "initiating_speaker,sequence_type,extra,interaction_id,sequence_duration,sequence_end,sequence_start\n\
                   x,x,x,x,x,x,x\n\
                   left,question,foo,C1,1,1,0\n";
        let table = read_sequences(csv.as_bytes(), "inline").unwrap();
        let s = &table.sequences[0];
        assert_eq!(s.initiating_speaker, "left");
        assert_eq!(s.sequence_start, 0.0);
        assert_eq!(s.sequence_end, 1.0);
    }
}
