//! Lookahead Annotator
//!
//! Partitions the sequence table into conversations and attaches each
//! sequence's successor (type, speaker, speaker change) from inside its own
//! conversation only.
//!
//! Grouping is explicit: rows are bucketed by `interaction_id` and each
//! bucket is ordered by `sequence_start` on its own, so a successor can never
//! come from a neighbouring conversation even if the input order is off.

use crate::types::{AnnotatedSequence, Sequence, SpeakerChange, Successor};
use std::collections::HashMap;

/// All sequences sharing one `interaction_id`, ordered by start time
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub interaction_id: String,
    pub sequences: Vec<Sequence>,
}

/// A conversation after lookahead (and later phase) annotation
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedConversation {
    pub interaction_id: String,
    pub sequences: Vec<AnnotatedSequence>,
}

impl AnnotatedConversation {
    /// True when phase positions could not be computed for this conversation
    pub fn is_degenerate(&self) -> bool {
        self.sequences.iter().all(|s| s.position.is_none())
    }
}

/// Split rows into conversations.
///
/// Conversations appear in order of first occurrence; within each, rows are
/// stable-sorted by `sequence_start` so ties keep their input order.
pub fn group_by_conversation(sequences: &[Sequence]) -> Vec<Conversation> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Conversation> = Vec::new();

    for seq in sequences {
        let slot = *index.entry(seq.interaction_id.as_str()).or_insert_with(|| {
            groups.push(Conversation {
                interaction_id: seq.interaction_id.clone(),
                sequences: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].sequences.push(seq.clone());
    }

    for group in &mut groups {
        group
            .sequences
            .sort_by(|a, b| a.sequence_start.total_cmp(&b.sequence_start));
    }

    groups
}

/// Attach the successor of every sequence in one conversation.
///
/// The last sequence gets no successor. Phase positions are left empty.
pub fn annotate(conversation: &Conversation) -> AnnotatedConversation {
    let seqs = &conversation.sequences;

    let sequences = seqs
        .iter()
        .enumerate()
        .map(|(i, current)| AnnotatedSequence {
            sequence: current.clone(),
            next: seqs.get(i + 1).map(|next| successor(current, next)),
            position: None,
        })
        .collect();

    AnnotatedConversation {
        interaction_id: conversation.interaction_id.clone(),
        sequences,
    }
}

fn successor(current: &Sequence, next: &Sequence) -> Successor {
    Successor {
        next_type: next.sequence_type.clone(),
        next_speaker: next.initiating_speaker.clone(),
        speaker_change: SpeakerChange::between(
            &current.initiating_speaker,
            &next.initiating_speaker,
        ),
    }
}
