//! Temporal Phase Binner
//!
//! Places every sequence on its conversation's relative timeline and tracks
//! how disclosure develops across five equal-width phases.
//!
//! ## Steps
//! 1. `progress = (start - min_start) / (max_end - min_start)` per conversation
//! 2. [`bin_edges`] lays five equal-width bins over the progress values
//! 3. [`PhaseEdges::phase_of`] maps progress to a phase in 1..=5
//!    (right-closed bins; the first bin also holds the minimum)
//! 4. Disclosure ratios per (interaction, phase) and per
//!    (interaction, speaker, phase)
//! 5. Escalation slope: OLS fit of disclosure ratio on phase per speaker
//!
//! A conversation with zero time span has no defined progress. It is
//! reported as a [`ConversationIssue::DegenerateConversation`] and left out
//! of every phase aggregate.

use super::lookahead::{AnnotatedConversation, Conversation};
use crate::config::defaults::{BIN_EDGE_ADJUSTMENT, MIN_PHASES_FOR_SLOPE, PHASE_COUNT};
use crate::config::PhaseScale;
use crate::types::{
    ConversationIssue, EscalationSlope, PhaseDisclosure, PhasePosition, SpeakerPhaseDisclosure,
};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Boundaries of the five phase bins, ascending
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseEdges(pub [f64; PHASE_COUNT + 1]);

impl PhaseEdges {
    /// Phase (1-based) of a progress value.
    ///
    /// Bins are `(edge[i-1], edge[i]]`. Values at or below the first edge
    /// fall in phase 1 and values above the last edge in the last phase.
    pub fn phase_of(&self, progress: f64) -> u8 {
        let idx = self.0.iter().position(|&edge| edge >= progress).unwrap_or(PHASE_COUNT);
        idx.clamp(1, PHASE_COUNT) as u8
    }
}

/// Compute the phase bin edges for a set of progress values.
///
/// `Realized` spans the observed min/max and lowers the first edge by 0.1%
/// of the range so the minimum lands in phase 1. When every value is equal
/// the range is widened by 0.1% of the value on each side (0.001 at zero).
/// `Unit` applies the same rule to the fixed range [0, 1].
///
/// Returns `None` for an empty slice.
pub fn bin_edges(progress: &[f64], scale: PhaseScale) -> Option<PhaseEdges> {
    let (mut lo, mut hi) = match scale {
        PhaseScale::Unit => (0.0, 1.0),
        PhaseScale::Realized => {
            if progress.is_empty() {
                return None;
            }
            progress
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &p| (lo.min(p), hi.max(p)))
        }
    };

    let widen_flat = lo == hi;
    if widen_flat {
        lo -= if lo == 0.0 { BIN_EDGE_ADJUSTMENT } else { BIN_EDGE_ADJUSTMENT * lo.abs() };
        hi += if hi == 0.0 { BIN_EDGE_ADJUSTMENT } else { BIN_EDGE_ADJUSTMENT * hi.abs() };
    }

    let mut edges = linspace(lo, hi);
    if !widen_flat {
        edges[0] -= (hi - lo) * BIN_EDGE_ADJUSTMENT;
    }
    Some(PhaseEdges(edges))
}

/// Evenly spaced edges from `lo` to `hi`, with the last edge exactly `hi`
fn linspace(lo: f64, hi: f64) -> [f64; PHASE_COUNT + 1] {
    let step = (hi - lo) / PHASE_COUNT as f64;
    let mut edges = [0.0; PHASE_COUNT + 1];
    for (i, edge) in edges.iter_mut().enumerate() {
        *edge = lo + i as f64 * step;
    }
    edges[PHASE_COUNT] = hi;
    edges
}

/// Progress and phase for every sequence of one conversation, in order.
pub fn position_conversation(
    conversation: &Conversation,
    scale: PhaseScale,
) -> Result<Vec<PhasePosition>, ConversationIssue> {
    let seqs = &conversation.sequences;
    let min_start = seqs.iter().map(|s| s.sequence_start).fold(f64::INFINITY, f64::min);
    let max_end = seqs.iter().map(|s| s.sequence_end).fold(f64::NEG_INFINITY, f64::max);
    let span = max_end - min_start;

    // Empty, zero or inverted span: progress is undefined
    if seqs.is_empty() || span.is_nan() || span <= 0.0 {
        return Err(ConversationIssue::DegenerateConversation {
            interaction_id: conversation.interaction_id.clone(),
            instant: min_start,
            sequences: seqs.len(),
        });
    }

    let progress: Vec<f64> = seqs
        .iter()
        .map(|s| (s.sequence_start - min_start) / span)
        .collect();
    let edges =
        bin_edges(&progress, scale).ok_or_else(|| ConversationIssue::DegenerateConversation {
            interaction_id: conversation.interaction_id.clone(),
            instant: min_start,
            sequences: seqs.len(),
        })?;

    Ok(progress
        .into_iter()
        .map(|p| PhasePosition {
            progress: p,
            phase: edges.phase_of(p),
        })
        .collect())
}

/// Running tally for one bucket
#[derive(Default, Clone, Copy)]
struct Tally {
    sequences: usize,
    disclosures: usize,
}

impl Tally {
    fn ratio(self) -> f64 {
        self.disclosures as f64 / self.sequences as f64
    }
}

/// Disclosure share per (interaction, phase), for phases that have rows.
///
/// Conversations are kept in input order; phases ascend within each.
pub fn phase_disclosure(conversations: &[AnnotatedConversation]) -> Vec<PhaseDisclosure> {
    let mut rows = Vec::new();
    for conv in conversations {
        let mut buckets: BTreeMap<u8, Tally> = BTreeMap::new();
        for seq in &conv.sequences {
            let Some(phase) = seq.phase() else { continue };
            let tally = buckets.entry(phase).or_default();
            tally.sequences += 1;
            tally.disclosures += usize::from(seq.sequence.is_disclosure());
        }
        rows.extend(buckets.into_iter().map(|(phase, tally)| PhaseDisclosure {
            interaction_id: conv.interaction_id.clone(),
            phase,
            sequences: tally.sequences,
            disclosure_ratio: tally.ratio(),
        }));
    }
    rows
}

/// Disclosure share per (interaction, speaker, phase), for buckets that have rows.
pub fn speaker_phase_disclosure(
    conversations: &[AnnotatedConversation],
) -> Vec<SpeakerPhaseDisclosure> {
    let mut rows = Vec::new();
    for conv in conversations {
        let mut buckets: BTreeMap<(&str, u8), Tally> = BTreeMap::new();
        for seq in &conv.sequences {
            let Some(phase) = seq.phase() else { continue };
            let tally = buckets
                .entry((seq.sequence.initiating_speaker.as_str(), phase))
                .or_default();
            tally.sequences += 1;
            tally.disclosures += usize::from(seq.sequence.is_disclosure());
        }
        rows.extend(buckets.into_iter().map(|((speaker, phase), tally)| SpeakerPhaseDisclosure {
            interaction_id: conv.interaction_id.clone(),
            initiating_speaker: speaker.to_string(),
            phase,
            sequences: tally.sequences,
            disclosure_ratio: tally.ratio(),
        }));
    }
    rows
}

/// Escalation slope and mean disclosure per (interaction, speaker).
///
/// Expects the rows of [`speaker_phase_disclosure`], which are grouped by
/// interaction and then speaker. A speaker observed in fewer than two phases
/// gets a NaN slope and an `InsufficientData` issue.
pub fn escalation_slopes(
    rows: &[SpeakerPhaseDisclosure],
) -> (Vec<EscalationSlope>, Vec<ConversationIssue>) {
    let mut slopes = Vec::new();
    let mut issues = Vec::new();

    for group in rows.chunk_by(|a, b| {
        a.interaction_id == b.interaction_id && a.initiating_speaker == b.initiating_speaker
    }) {
        let first = &group[0];
        let x: Vec<f64> = group.iter().map(|r| f64::from(r.phase)).collect();
        let y: Vec<f64> = group.iter().map(|r| r.disclosure_ratio).collect();

        let slope = ols_slope(&x, &y).unwrap_or_else(|| {
            issues.push(ConversationIssue::InsufficientData {
                aggregate: "escalation_slope".to_string(),
                scope: format!(
                    "interaction {} / speaker {}",
                    first.interaction_id, first.initiating_speaker
                ),
                available: distinct_count(&x),
                needed: MIN_PHASES_FOR_SLOPE,
            });
            f64::NAN
        });

        slopes.push(EscalationSlope {
            interaction_id: first.interaction_id.clone(),
            initiating_speaker: first.initiating_speaker.clone(),
            slope,
            avg_disclosure: y.iter().mean(),
            phases: group.len(),
        });
    }

    (slopes, issues)
}

/// Ordinary least squares slope of `y` on `x`.
///
/// Returns `None` unless `x` holds at least two distinct values.
pub fn ols_slope(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || distinct_count(x) < MIN_PHASES_FOR_SLOPE {
        return None;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mean_x) * (b - mean_y)).sum();
    let sxx: f64 = x.iter().map(|a| (a - mean_x).powi(2)).sum();

    if sxx == 0.0 {
        None
    } else {
        Some(sxy / sxx)
    }
}

fn distinct_count(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}
