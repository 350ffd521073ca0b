//! Sequence table loading from disk
//!
//! Covers the shipped sample table plus malformed files written to temp
//! files: header remnant handling, numeric parse failures, missing columns.

use convo_analyzer::analysis::loader::{self, LoadError};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn sample_csv_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/sample_sequences.csv")
}

fn write_temp_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const HEADER: &str =
    "interaction_id,sequence_start,sequence_end,sequence_duration,sequence_type,initiating_speaker\n";

#[test]
fn sample_table_loads_and_normalizes() {
    let table = loader::load_sequences(sample_csv_path()).expect("sample loads");

    assert_eq!(table.info.header_remnant_rows, 1);
    assert_eq!(table.info.sequences, 21);
    assert_eq!(table.info.conversations, 4);
    assert_eq!(table.info.inverted_spans, 0);

    // The padded type value is trimmed
    let padded = table
        .sequences
        .iter()
        .find(|s| s.interaction_id == "101" && s.sequence_start == 41.0)
        .unwrap();
    assert_eq!(padded.sequence_type, "disclosure");
    assert!(padded.is_disclosure());

    // Conversation 102 was stored out of order
    let starts: Vec<f64> = table
        .sequences
        .iter()
        .filter(|s| s.interaction_id == "102")
        .map(|s| s.sequence_start)
        .collect();
    assert_eq!(starts, vec![5.0, 20.0, 40.0, 45.0, 60.0, 70.0]);
}

#[test]
fn remnant_row_is_dropped_whatever_it_contains() {
    let file = write_temp_csv(&format!(
        "{HEADER}X1,0,1,1,question,left\nX1,1,2,1,disclosure,right\n"
    ));
    let table = loader::load_sequences(file.path()).unwrap();

    // The first data row was a real sequence and is still discarded
    assert_eq!(table.sequences.len(), 1);
    assert_eq!(table.sequences[0].sequence_type, "disclosure");
}

#[test]
fn non_numeric_start_fails_with_line() {
    let file = write_temp_csv(&format!(
        "{HEADER}ID,Start,End,Duration,Type,Speaker\nA,0,1,1,question,left\nA,soon,2,1,disclosure,right\n"
    ));
    match loader::load_sequences(file.path()) {
        Err(LoadError::Parse { line, interaction_id, field, value }) => {
            assert_eq!(line, 4);
            assert_eq!(interaction_id, "A");
            assert_eq!(field, "sequence_start");
            assert_eq!(value, "soon");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn missing_column_is_reported_by_name() {
    let file = write_temp_csv(
        "interaction_id,sequence_start,sequence_end,sequence_type,initiating_speaker\n\
         remnant,,,,\n\
         A,0,1,question,left\n",
    );
    match loader::load_sequences(file.path()) {
        Err(LoadError::MissingColumn(name)) => assert_eq!(name, "sequence_duration"),
        other => panic!("expected missing column, got {other:?}"),
    }
}

#[test]
fn header_only_table_is_empty() {
    let file = write_temp_csv(&format!("{HEADER}ID,Start,End,Duration,Type,Speaker\n"));
    assert!(matches!(
        loader::load_sequences(file.path()),
        Err(LoadError::Empty(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let path = sample_csv_path().with_file_name("does_not_exist.csv");
    match loader::load_sequences(&path) {
        Err(LoadError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected io error, got {other:?}"),
    }
}
