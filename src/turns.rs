//! Conversational turn segmentation
//!
//! Merges diarized speech segments into conversational turns:
//! - Same-speaker segments separated by a short pause are merged
//! - A different speaker that only backchannels ("yeah", "mhm") does not
//!   take the floor; the segment is kept as secondary speech of the
//!   current turn
//! - Any other speaker change closes the current turn
//!
//! Each finished turn is scored with the VADER compound valence of its text.
//!
//! Follows the NaturalTurn procedure (Cooney & Reece, Sci Rep 15, 39155, 2025).

use crate::config::defaults::BACKCHANNEL_CUE_RATIO;
use crate::config::TurnConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use vader_sentiment::SentimentIntensityAnalyzer;

/// Words that mark listener feedback
const BACKCHANNEL_CUES: &[&str] = &[
    "a", "ah", "alright", "awesome", "cool", "dope", "e", "exactly", "god", "gotcha", "huh", "hmm",
    "mhm", "mm", "mmm", "nice", "oh", "okay", "really", "right", "sick", "sucks", "sure", "uh",
    "um", "wow", "yeah", "yep", "yes", "yup",
];

/// Words that mean the listener is starting real content
const NOT_BACKCHANNEL_CUES: &[&str] = &[
    "and", "but", "i", "i'm", "it", "it's", "like", "so", "that", "that's", "we", "we're", "well",
    "you", "you're",
];

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One diarized speech segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerSegment {
    pub speaker: String,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub text: String,
}

/// A merged conversational turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: String,
    pub start: f64,
    pub end: f64,
    pub text: String,
    /// Backchannels from other speakers absorbed into this turn
    pub bc_count: usize,
    pub secondary_speech: Vec<String>,
    /// VADER compound valence of `text`, -1.0 to 1.0
    pub sentiment: f64,
}

impl Turn {
    fn open(segment: &SpeakerSegment, text: String) -> Self {
        Self {
            speaker: segment.speaker.clone(),
            start: segment.start,
            end: segment.end,
            text,
            bc_count: 0,
            secondary_speech: Vec::new(),
            sentiment: 0.0,
        }
    }
}

/// CSV shape of a turn; secondary speech is joined with "; "
#[derive(Debug, Serialize)]
struct TurnRow<'a> {
    speaker: &'a str,
    start: f64,
    end: f64,
    text: &'a str,
    bc_count: usize,
    secondary_speech: String,
    sentiment: f64,
}

fn non_letters() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z\s]").expect("letter filter pattern is valid"))
}

/// Lowercase, drop everything but ASCII letters and whitespace, split into words
pub fn clean_words(text: &str) -> Vec<String> {
    non_letters()
        .replace_all(&text.to_lowercase(), "")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Whether a segment is listener feedback rather than a bid for the floor
pub fn is_backchannel(text: &str, config: &TurnConfig) -> bool {
    let words = clean_words(text);

    if words.iter().any(|w| NOT_BACKCHANNEL_CUES.contains(&w.as_str())) {
        return false;
    }
    if words.is_empty() || words.len() > config.max_backchannel_words {
        return false;
    }

    let cues = words
        .iter()
        .filter(|w| BACKCHANNEL_CUES.contains(&w.as_str()))
        .count();
    cues as f64 / words.len() as f64 >= BACKCHANNEL_CUE_RATIO
}

/// Compound sentiment of a piece of text, rounded to 3 decimals.
///
/// Blank text scores 0.0.
pub fn sentiment(text: &str) -> f64 {
    score_sentiment(&SentimentIntensityAnalyzer::new(), text)
}

fn score_sentiment(analyzer: &SentimentIntensityAnalyzer, text: &str) -> f64 {
    if text.trim().is_empty() {
        return 0.0;
    }
    let compound = analyzer
        .polarity_scores(text)
        .get("compound")
        .copied()
        .unwrap_or(0.0);
    (compound * 1000.0).round() / 1000.0
}

/// Merge segments into turns.
///
/// Segments are stable-sorted by start time first. An empty input yields
/// no turns.
pub fn segment_turns(segments: &[SpeakerSegment], config: &TurnConfig) -> Vec<Turn> {
    let mut ordered: Vec<&SpeakerSegment> = segments.iter().collect();
    ordered.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut iter = ordered.into_iter();
    let Some(first) = iter.next() else {
        tracing::warn!("No speaker segments to segment");
        return Vec::new();
    };

    let mut turns = Vec::new();
    let mut current = Turn::open(first, first.text.trim().to_string());

    for seg in iter {
        let gap = seg.start - current.end;
        let text = seg.text.trim();

        if seg.speaker == current.speaker {
            if gap < config.max_pause_secs {
                current.end = seg.end;
                current.text.push(' ');
                current.text.push_str(text);
            } else {
                turns.push(std::mem::replace(&mut current, Turn::open(seg, text.to_string())));
            }
        } else if is_backchannel(text, config) {
            current.bc_count += 1;
            current
                .secondary_speech
                .push(format!("{}: [{:.2}-{:.2}]: {}", seg.speaker, seg.start, seg.end, text));
        } else {
            turns.push(std::mem::replace(&mut current, Turn::open(seg, text.to_string())));
        }
    }
    turns.push(current);

    let analyzer = SentimentIntensityAnalyzer::new();
    for turn in &mut turns {
        turn.sentiment = score_sentiment(&analyzer, &turn.text);
    }

    tracing::info!(segments = segments.len(), turns = turns.len(), "Turns segmented");
    turns
}

/// Read `speaker,start,end,text` segments from CSV
pub fn read_segments<R: Read>(reader: R) -> Result<Vec<SpeakerSegment>, TurnError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut segments = Vec::new();
    for row in rdr.deserialize() {
        segments.push(row?);
    }
    Ok(segments)
}

pub fn load_segments(path: &Path) -> Result<Vec<SpeakerSegment>, TurnError> {
    let file = File::open(path).map_err(|source| TurnError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_segments(file)
}

/// Write turns as CSV
pub fn write_turns<W: Write>(writer: W, turns: &[Turn]) -> Result<(), TurnError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for t in turns {
        wtr.serialize(TurnRow {
            speaker: &t.speaker,
            start: t.start,
            end: t.end,
            text: &t.text,
            bc_count: t.bc_count,
            secondary_speech: t.secondary_speech.join("; "),
            sentiment: t.sentiment,
        })?;
    }
    wtr.flush().map_err(|e| TurnError::Csv(e.into()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(speaker: &str, start: f64, end: f64, text: &str) -> SpeakerSegment {
        SpeakerSegment {
            speaker: speaker.to_string(),
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_clean_words_strips_punctuation() {
        assert_eq!(clean_words("Yeah, RIGHT!"), vec!["yeah", "right"]);
        assert_eq!(clean_words("I'm 42 fine"), vec!["im", "fine"]);
        assert!(clean_words("...").is_empty());
    }

    #[test]
    fn test_backchannel_detection() {
        let config = TurnConfig::default();
        assert!(is_backchannel("Yeah.", &config));
        assert!(is_backchannel("mhm okay", &config));
        assert!(is_backchannel("oh wow cool", &config));
        // half cue words is enough
        assert!(is_backchannel("oh really now", &config));
        assert!(is_backchannel("yeah totally", &config));
        assert!(!is_backchannel("totally agree there", &config));
        // content markers win
        assert!(!is_backchannel("yeah but", &config));
        assert!(!is_backchannel("so", &config));
        // too long
        assert!(!is_backchannel("yeah yeah yeah yeah", &config));
        assert!(!is_backchannel("", &config));
    }

    #[test]
    fn test_same_speaker_short_pause_merges() {
        let turns = segment_turns(
            &[seg("A", 0.0, 1.0, "hello"), seg("A", 2.0, 3.0, " there ")],
            &TurnConfig::default(),
        );
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].text, "hello there");
        assert_eq!(turns[0].end, 3.0);
    }

    #[test]
    fn test_same_speaker_long_pause_splits() {
        let turns = segment_turns(
            &[seg("A", 0.0, 1.0, "hello"), seg("A", 2.5, 3.0, "again")],
            &TurnConfig::default(),
        );
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].start, 2.5);
    }

    #[test]
    fn test_backchannel_keeps_the_floor() {
        let turns = segment_turns(
            &[
                seg("A", 0.0, 4.0, "so I went to the store"),
                seg("B", 2.0, 2.4, "mhm"),
                seg("A", 4.5, 6.0, "and bought milk"),
                seg("B", 6.5, 9.0, "what kind of milk"),
            ],
            &TurnConfig::default(),
        );
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].speaker, "A");
        assert_eq!(turns[0].text, "so I went to the store and bought milk");
        assert_eq!(turns[0].bc_count, 1);
        assert_eq!(turns[0].secondary_speech, vec!["B: [2.00-2.40]: mhm"]);
        assert_eq!(turns[1].speaker, "B");
    }

    #[test]
    fn test_segments_are_sorted_before_merging() {
        let turns = segment_turns(
            &[seg("B", 5.0, 6.0, "tell me more please"), seg("A", 0.0, 1.0, "hi")],
            &TurnConfig::default(),
        );
        assert_eq!(turns[0].speaker, "A");
        assert_eq!(turns[1].speaker, "B");
    }

    #[test]
    fn test_empty_input_yields_no_turns() {
        assert!(segment_turns(&[], &TurnConfig::default()).is_empty());
    }

    #[test]
    fn test_csv_round_trip_shape() {
        let input = "speaker,start,end,text\nA,0.0,1.0,hello\nB,0.5,0.8,yeah\n";
        let segments = read_segments(input.as_bytes()).unwrap();
        let turns = segment_turns(&segments, &TurnConfig::default());

        let mut out = Vec::new();
        write_turns(&mut out, &turns).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "speaker,start,end,text,bc_count,secondary_speech,sentiment");
        assert!(lines[1].starts_with("A,0.0,1.0,hello,1,B: [0.50-0.80]: yeah,"));
    }

    #[test]
    fn test_blank_text_has_neutral_sentiment() {
        assert_eq!(sentiment(""), 0.0);
        assert_eq!(sentiment("   "), 0.0);
    }

    #[test]
    fn test_sentiment_polarity_and_rounding() {
        let positive = sentiment("I love this, it is wonderful and great");
        let negative = sentiment("This is terrible and I hate it");
        assert!(positive > 0.5, "positive scored {positive}");
        assert!(negative < -0.5, "negative scored {negative}");

        for score in [positive, negative] {
            assert!((-1.0..=1.0).contains(&score));
            let scaled = score * 1000.0;
            assert!((scaled - scaled.round()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_turn_sentiment_covers_merged_text() {
        let turns = segment_turns(
            &[
                seg("A", 0.0, 1.0, "this trip was"),
                seg("A", 1.2, 2.0, "absolutely wonderful"),
                seg("B", 3.0, 4.0, ""),
            ],
            &TurnConfig::default(),
        );
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].sentiment, sentiment("this trip was absolutely wonderful"));
        assert!(turns[0].sentiment > 0.0);
        assert_eq!(turns[1].sentiment, 0.0);
    }
}
