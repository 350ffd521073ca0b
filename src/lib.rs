//! Conversational Sequence Analyzer
//!
//! Descriptive analysis of annotated dialogue: questions and disclosures
//! inside timed conversational turns.
//!
//! ## Architecture
//!
//! - **Loader**: CSV sequence table → normalized, sorted `Sequence` rows
//! - **Lookahead**: per-conversation successor type, speaker and speaker change
//! - **Aggregator**: Q/D counts, corpus mean/sd, transition probabilities
//! - **Phase Binner**: five relative-time phases, disclosure ratios, escalation slopes
//! - **Turns**: upstream NaturalTurn segmentation of diarized speech segments

pub mod config;
pub mod types;
pub mod analysis;
pub mod report;
pub mod turns;

// Re-export configuration
pub use config::{AnalysisConfig, ConfigError, PhaseScale};

// Re-export commonly used types
pub use types::{
    AnnotatedSequence, ConversationCounts, ConversationIssue, CorpusSummary, EscalationSlope,
    PhaseDisclosure, PhasePosition, Sequence, SpeakerChange, SpeakerPhaseDisclosure, Successor,
    TransitionProbability,
};

// Re-export the analysis entry points
pub use analysis::{load_sequences, run, AnalysisReport, LoadError, SequenceTable};
pub use report::{print_summary, write_artifacts, ReportError};
