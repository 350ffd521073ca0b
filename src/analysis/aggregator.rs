//! Sequence Aggregator
//!
//! Builds the corpus-level views over annotated conversations:
//! - Per-conversation question / disclosure counts
//! - Corpus mean and sample standard deviation of those counts (statrs)
//! - Transition probabilities keyed by `(sequence_type, speaker_change, next_type)`
//!
//! All grouping goes through ordered maps, so the output order is a pure
//! function of the keys.

use super::lookahead::AnnotatedConversation;
use crate::config::defaults::MIN_CONVERSATIONS_FOR_STD_DEV;
use crate::types::{
    ConversationCounts, ConversationIssue, CorpusSummary, MetricSummary, SpeakerChange,
    TransitionProbability,
};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Count questions and disclosures in each conversation
pub fn conversation_counts(conversations: &[AnnotatedConversation]) -> Vec<ConversationCounts> {
    conversations
        .iter()
        .map(|c| ConversationCounts {
            interaction_id: c.interaction_id.clone(),
            total_q: c.sequences.iter().filter(|s| s.sequence.is_question()).count(),
            total_d: c.sequences.iter().filter(|s| s.sequence.is_disclosure()).count(),
        })
        .collect()
}

/// Mean and sample standard deviation of `total_q` and `total_d`.
///
/// With fewer than two conversations the standard deviations are NaN and an
/// `InsufficientData` issue is returned for each.
pub fn corpus_summary(counts: &[ConversationCounts]) -> (CorpusSummary, Vec<ConversationIssue>) {
    let q: Vec<f64> = counts.iter().map(|c| c.total_q as f64).collect();
    let d: Vec<f64> = counts.iter().map(|c| c.total_d as f64).collect();

    let mut issues = Vec::new();
    if counts.len() < MIN_CONVERSATIONS_FOR_STD_DEV {
        for metric in ["total_q", "total_d"] {
            issues.push(ConversationIssue::InsufficientData {
                aggregate: format!("std_dev({metric})"),
                scope: "corpus".to_string(),
                available: counts.len(),
                needed: MIN_CONVERSATIONS_FOR_STD_DEV,
            });
        }
    }

    let summary = CorpusSummary {
        total_q: summarize("total_q", &q),
        total_d: summarize("total_d", &d),
    };
    (summary, issues)
}

fn summarize(metric: &str, values: &[f64]) -> MetricSummary {
    MetricSummary {
        metric: metric.to_string(),
        mean: values.iter().mean(),
        // statrs returns NaN below two samples
        std_dev: values.iter().std_dev(),
        conversations: values.len(),
    }
}

type TransitionKey = (String, Option<SpeakerChange>, Option<String>);

/// Transition probabilities within each `sequence_type`.
///
/// Only rows with a successor are counted unless `count_terminal` is set, in
/// which case each conversation's last row adds a transition with no
/// speaker change and no next type.
pub fn transition_probabilities(
    conversations: &[AnnotatedConversation],
    count_terminal: bool,
) -> Vec<TransitionProbability> {
    let mut counts: BTreeMap<TransitionKey, usize> = BTreeMap::new();

    for seq in conversations.iter().flat_map(|c| &c.sequences) {
        if seq.next.is_none() && !count_terminal {
            continue;
        }
        let key = (
            seq.sequence.sequence_type.clone(),
            seq.speaker_change(),
            seq.next_type().map(str::to_string),
        );
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut totals: BTreeMap<&str, usize> = BTreeMap::new();
    for ((kind, _, _), n) in &counts {
        *totals.entry(kind.as_str()).or_insert(0) += n;
    }

    counts
        .iter()
        .map(|((kind, change, next), &count)| {
            let total = totals.get(kind.as_str()).copied().unwrap_or(count);
            TransitionProbability {
                sequence_type: kind.clone(),
                speaker_change: *change,
                next_type: next.clone(),
                count,
                prob: count as f64 / total as f64,
            }
        })
        .collect()
}
