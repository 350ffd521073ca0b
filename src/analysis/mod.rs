//! Conversational Sequence Analysis
//!
//! Four stages over one in-memory table of annotated sequences.
//!
//! ## Architecture
//! - `loader`: Read the CSV, drop the header remnant, parse, trim, sort
//! - `lookahead`: Group by conversation and attach each sequence's successor
//! - `aggregator`: Q/D counts, corpus mean/sd (statrs), transition probabilities
//! - `phases`: Relative-time phases, disclosure ratios, escalation slopes
//! - `pipeline`: Runs the stages in order and collects an `AnalysisReport`

pub mod loader;
pub mod lookahead;
pub mod aggregator;
pub mod phases;
pub mod pipeline;

// Re-export public types
pub use loader::{load_sequences, read_sequences, LoadError, LoadInfo, SequenceTable};
pub use lookahead::{AnnotatedConversation, Conversation};
pub use phases::{bin_edges, PhaseEdges};
pub use pipeline::{run, AnalysisReport};
