//! Analysis pipeline orchestrator
//!
//! Runs the stages in order over a loaded sequence table:
//! lookahead annotation and phase positioning per conversation (in
//! parallel, collected in conversation order), then the corpus aggregates
//! and the phase aggregates.

use super::{aggregator, lookahead, phases};
use crate::config::AnalysisConfig;
use crate::types::{
    ConversationCounts, ConversationIssue, CorpusSummary, EscalationSlope, PhaseDisclosure,
    Sequence, SpeakerPhaseDisclosure, TransitionProbability,
};
use lookahead::AnnotatedConversation;
use rayon::prelude::*;
use serde::Serialize;

/// Every table produced by one analysis run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    #[serde(skip)]
    pub conversations: Vec<AnnotatedConversation>,
    pub counts: Vec<ConversationCounts>,
    pub summary: CorpusSummary,
    pub transitions: Vec<TransitionProbability>,
    pub phase_disclosure: Vec<PhaseDisclosure>,
    pub speaker_phase_disclosure: Vec<SpeakerPhaseDisclosure>,
    pub escalation_slopes: Vec<EscalationSlope>,
    /// Recovered conditions, in the order they were found
    pub issues: Vec<ConversationIssue>,
}

impl AnalysisReport {
    pub fn sequence_count(&self) -> usize {
        self.conversations.iter().map(|c| c.sequences.len()).sum()
    }

    pub fn degenerate_conversations(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| matches!(i, ConversationIssue::DegenerateConversation { .. }))
            .count()
    }
}

/// Run the full analysis over normalized sequences.
pub fn run(sequences: &[Sequence], config: &AnalysisConfig) -> AnalysisReport {
    let groups = lookahead::group_by_conversation(sequences);
    tracing::info!(
        sequences = sequences.len(),
        conversations = groups.len(),
        scale = ?config.phases.scale,
        "Annotating conversations"
    );

    let annotated: Vec<(AnnotatedConversation, Option<ConversationIssue>)> = groups
        .par_iter()
        .map(|group| {
            let mut conv = lookahead::annotate(group);
            match phases::position_conversation(group, config.phases.scale) {
                Ok(positions) => {
                    tracing::debug!(
                        interaction = %group.interaction_id,
                        sequences = positions.len(),
                        "Conversation positioned"
                    );
                    for (seq, position) in conv.sequences.iter_mut().zip(positions) {
                        seq.position = Some(position);
                    }
                    (conv, None)
                }
                Err(issue) => (conv, Some(issue)),
            }
        })
        .collect();

    let mut issues = Vec::new();
    let mut conversations = Vec::with_capacity(annotated.len());
    for (conv, issue) in annotated {
        if let Some(issue) = issue {
            tracing::warn!(interaction = %conv.interaction_id, "{}", issue);
            issues.push(issue);
        }
        conversations.push(conv);
    }

    let counts = aggregator::conversation_counts(&conversations);
    let (summary, summary_issues) = aggregator::corpus_summary(&counts);
    let transitions = aggregator::transition_probabilities(
        &conversations,
        config.transitions.count_terminal_transitions,
    );

    let phase_disclosure = phases::phase_disclosure(&conversations);
    let speaker_phase_disclosure = phases::speaker_phase_disclosure(&conversations);
    let (escalation_slopes, slope_issues) = phases::escalation_slopes(&speaker_phase_disclosure);

    for issue in summary_issues.iter().chain(&slope_issues) {
        tracing::warn!("{}", issue);
    }
    issues.extend(summary_issues);
    issues.extend(slope_issues);

    tracing::info!(
        transitions = transitions.len(),
        phase_rows = phase_disclosure.len(),
        slopes = escalation_slopes.len(),
        issues = issues.len(),
        "Analysis complete"
    );

    AnalysisReport {
        conversations,
        counts,
        summary,
        transitions,
        phase_disclosure,
        speaker_phase_disclosure,
        escalation_slopes,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(id: &str, start: f64, end: f64, kind: &str, speaker: &str) -> Sequence {
        Sequence {
            interaction_id: id.to_string(),
            sequence_start: start,
            sequence_end: end,
            sequence_duration: end - start,
            sequence_type: kind.to_string(),
            initiating_speaker: speaker.to_string(),
            source_line: 0,
        }
    }

    #[test]
    fn test_degenerate_conversation_is_recorded_not_dropped() {
        let rows = vec![
            seq("A", 0.0, 1.0, "question", "left"),
            seq("A", 1.0, 2.0, "disclosure", "right"),
            seq("Z", 5.0, 5.0, "question", "left"),
            seq("Z", 5.0, 5.0, "disclosure", "left"),
        ];
        let report = run(&rows, &AnalysisConfig::default());

        assert_eq!(report.degenerate_conversations(), 1);
        assert_eq!(report.sequence_count(), 4);
        // Still counted and still part of the transition table
        assert_eq!(report.counts.len(), 2);
        let question_to_disclosure: usize = report
            .transitions
            .iter()
            .filter(|t| {
                t.sequence_type == "question" && t.next_type.as_deref() == Some("disclosure")
            })
            .map(|t| t.count)
            .sum();
        assert_eq!(question_to_disclosure, 2);
        // But absent from phase tables
        assert!(report.phase_disclosure.iter().all(|r| r.interaction_id == "A"));
        assert!(report.escalation_slopes.iter().all(|r| r.interaction_id == "A"));
    }

    #[test]
    fn test_run_is_deterministic() {
        let rows: Vec<Sequence> = (0..40)
            .map(|i| {
                let id = format!("C{}", i % 4);
                let kind = if i % 3 == 0 { "disclosure" } else { "question" };
                let speaker = if i % 2 == 0 { "left" } else { "right" };
                seq(&id, i as f64, i as f64 + 0.5, kind, speaker)
            })
            .collect();
        let config = AnalysisConfig::default();
        let first = run(&rows, &config);
        let second = run(&rows, &config);

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first.conversations, second.conversations);
    }
}
