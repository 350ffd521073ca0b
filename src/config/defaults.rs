//! System-wide default constants.
//!
//! Centralises the fixed numbers of the analysis so they are discoverable in
//! one place. Values that operators may tune live in `AnalysisConfig`; the
//! defaults for those fields are defined here.

// ============================================================================
// Loader
// ============================================================================

/// Data rows discarded after the header of every sequence table.
///
/// Exported annotation tables carry one invalid row directly under the
/// header. It is dropped without inspecting its contents.
pub const HEADER_REMNANT_ROWS: usize = 1;

/// Columns every sequence table must provide.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "interaction_id",
    "sequence_start",
    "sequence_end",
    "sequence_duration",
    "sequence_type",
    "initiating_speaker",
];

// ============================================================================
// Temporal Phases
// ============================================================================

/// Number of equal-width relative-time phases per conversation.
pub const PHASE_COUNT: usize = 5;

/// Fraction of the observed range used to widen bin edges, matching the
/// interval-cut convention (first edge lowered so the minimum is included).
pub const BIN_EDGE_ADJUSTMENT: f64 = 0.001;

/// Minimum distinct phases needed to fit an escalation slope.
pub const MIN_PHASES_FOR_SLOPE: usize = 2;

/// Minimum conversations needed for a sample standard deviation.
pub const MIN_CONVERSATIONS_FOR_STD_DEV: usize = 2;

// ============================================================================
// Turn Segmentation
// ============================================================================

/// Same-speaker pauses shorter than this are merged into one turn (seconds).
pub const MAX_PAUSE_SECS: f64 = 1.5;

/// Segments longer than this many words are never backchannels.
pub const MAX_BACKCHANNEL_WORDS: usize = 3;

/// Minimum share of backchannel cue words for a segment to count as one.
pub const BACKCHANNEL_CUE_RATIO: f64 = 0.5;

// ============================================================================
// Output
// ============================================================================

/// Default directory for written artifacts.
pub const OUTPUT_DIR: &str = "output";

/// Environment variable pointing at an analysis config TOML file.
pub const CONFIG_ENV_VAR: &str = "CONVO_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "analysis_config.toml";
