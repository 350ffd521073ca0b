//! Shared data structures for conversational sequence analysis
//!
//! This module defines the records that flow through the analysis stages:
//! - Stage 1: Sequence (one normalized input row)
//! - Stage 2: Successor, AnnotatedSequence (lookahead within a conversation)
//! - Stage 3: ConversationCounts, CorpusSummary, TransitionProbability
//! - Stage 4: PhasePosition, PhaseDisclosure, SpeakerPhaseDisclosure, EscalationSlope
//!
//! Conditions that are recovered per conversation rather than aborting the
//! run are recorded as [`ConversationIssue`] values.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `sequence_type` label counted as a question
pub const QUESTION: &str = "question";

/// `sequence_type` label counted as a disclosure
pub const DISCLOSURE: &str = "disclosure";

// ============================================================================
// Stage 1: Input rows
// ============================================================================

/// One labeled span of conversational time.
///
/// `sequence_type` and `initiating_speaker` are kept as free text: labels
/// other than question/disclosure or left/right pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub interaction_id: String,
    pub sequence_start: f64,
    pub sequence_end: f64,
    pub sequence_duration: f64,
    pub sequence_type: String,
    pub initiating_speaker: String,
    /// Line number in the source file (1-based, header is line 1)
    #[serde(skip)]
    pub source_line: u64,
}

impl Sequence {
    pub fn is_question(&self) -> bool {
        self.sequence_type == QUESTION
    }

    pub fn is_disclosure(&self) -> bool {
        self.sequence_type == DISCLOSURE
    }
}

// ============================================================================
// Stage 2: Lookahead
// ============================================================================

/// Whether the next sequence is initiated by the same speaker
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpeakerChange {
    #[serde(rename = "Same Speaker")]
    Same,
    #[serde(rename = "Switch Speaker")]
    Switch,
}

impl SpeakerChange {
    /// Classify the hand-over from `current` to `next`
    pub fn between(current: &str, next: &str) -> Self {
        if current == next {
            SpeakerChange::Same
        } else {
            SpeakerChange::Switch
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpeakerChange::Same => "Same Speaker",
            SpeakerChange::Switch => "Switch Speaker",
        }
    }
}

impl std::fmt::Display for SpeakerChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The sequence that immediately follows another within one conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Successor {
    pub next_type: String,
    pub next_speaker: String,
    pub speaker_change: SpeakerChange,
}

/// Relative position of a sequence inside its conversation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhasePosition {
    /// (start - min_start) / (max_end - min_start)
    pub progress: f64,
    /// 1..=5
    pub phase: u8,
}

/// A sequence with every derived field attached.
///
/// `next` is `None` for the last sequence of a conversation. `position` is
/// `None` when the conversation has a zero time span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedSequence {
    pub sequence: Sequence,
    pub next: Option<Successor>,
    pub position: Option<PhasePosition>,
}

impl AnnotatedSequence {
    pub fn next_type(&self) -> Option<&str> {
        self.next.as_ref().map(|n| n.next_type.as_str())
    }

    pub fn next_speaker(&self) -> Option<&str> {
        self.next.as_ref().map(|n| n.next_speaker.as_str())
    }

    pub fn speaker_change(&self) -> Option<SpeakerChange> {
        self.next.as_ref().map(|n| n.speaker_change)
    }

    pub fn phase(&self) -> Option<u8> {
        self.position.map(|p| p.phase)
    }
}

// ============================================================================
// Stage 3: Aggregates
// ============================================================================

/// Question / disclosure totals for one conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationCounts {
    pub interaction_id: String,
    pub total_q: usize,
    pub total_d: usize,
}

/// Mean and sample standard deviation of one per-conversation count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub metric: String,
    pub mean: f64,
    /// N-1 denominator; NaN with fewer than two conversations
    pub std_dev: f64,
    pub conversations: usize,
}

/// Corpus-level question and disclosure summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusSummary {
    pub total_q: MetricSummary,
    pub total_d: MetricSummary,
}

/// One row of the transition table.
///
/// `speaker_change` and `next_type` are only `None` for terminal
/// transitions, which are counted when
/// `transitions.count_terminal_transitions` is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionProbability {
    pub sequence_type: String,
    pub speaker_change: Option<SpeakerChange>,
    pub next_type: Option<String>,
    pub count: usize,
    pub prob: f64,
}

// ============================================================================
// Stage 4: Temporal phases
// ============================================================================

/// Share of disclosures within one phase of one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDisclosure {
    pub interaction_id: String,
    pub phase: u8,
    pub sequences: usize,
    pub disclosure_ratio: f64,
}

/// Share of disclosures within one phase, for one speaker of one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerPhaseDisclosure {
    pub interaction_id: String,
    pub initiating_speaker: String,
    pub phase: u8,
    pub sequences: usize,
    pub disclosure_ratio: f64,
}

/// Linear trend of disclosure ratio over phase for one speaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationSlope {
    pub interaction_id: String,
    pub initiating_speaker: String,
    /// OLS slope of disclosure_ratio on phase; NaN below two phases
    pub slope: f64,
    pub avg_disclosure: f64,
    /// Number of phase buckets the fit used
    pub phases: usize,
}

// ============================================================================
// Recovered conditions
// ============================================================================

/// A per-conversation or per-aggregate condition that was recovered locally.
///
/// These never abort a run; they are logged and written to `issues.json`
/// so every excluded or undefined value can be traced back to its cause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationIssue {
    #[error(
        "conversation {interaction_id} has zero time span at t={instant} \
         ({sequences} sequences); excluded from phase aggregates"
    )]
    DegenerateConversation {
        interaction_id: String,
        instant: f64,
        sequences: usize,
    },

    #[error("insufficient data for {aggregate} ({scope}): have {available}, need {needed}; reported as NaN")]
    InsufficientData {
        aggregate: String,
        scope: String,
        available: usize,
        needed: usize,
    },
}
