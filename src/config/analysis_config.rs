//! Analysis Configuration - tunable settings as TOML values
//!
//! Each struct implements `Default` with the values the analysis uses when
//! no config file is present.

use super::defaults;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for an analysis run.
///
/// Load with `AnalysisConfig::load()` which searches:
/// 1. an explicit path
/// 2. `$CONVO_CONFIG` env var
/// 3. `./analysis_config.toml`
/// 4. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub transitions: TransitionConfig,

    #[serde(default)]
    pub phases: PhaseConfig,

    #[serde(default)]
    pub turns: TurnConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl AnalysisConfig {
    /// Resolve the configuration for this run.
    ///
    /// An explicit path must load; env var and working-directory files fall
    /// back to the next source with a warning.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load_from_file(path)?;
            info!(path = %path.display(), "Loaded analysis config");
            return Ok(config);
        }

        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(
                            path = %p.display(),
                            "Loaded analysis config from {}",
                            defaults::CONFIG_ENV_VAR
                        );
                        return Ok(config);
                    }
                    Err(e) => {
                        warn!(
                            path = %p.display(),
                            error = %e,
                            "Failed to load config from {}, falling back",
                            defaults::CONFIG_ENV_VAR
                        );
                    }
                }
            } else {
                warn!(
                    path = %path,
                    "{} points to non-existent file, falling back",
                    defaults::CONFIG_ENV_VAR
                );
            }
        }

        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded analysis config from ./{}", defaults::LOCAL_CONFIG_FILE);
                    return Ok(config);
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        "Failed to load ./{}, using defaults",
                        defaults::LOCAL_CONFIG_FILE
                    );
                }
            }
        }

        info!("No analysis config found, using built-in defaults");
        Ok(Self::default())
    }

    /// Load and validate a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every tunable value, collecting all problems before failing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let pause = self.turns.max_pause_secs;
        if !pause.is_finite() || pause < 0.0 {
            errors.push(format!(
                "turns.max_pause_secs ({pause}) must be a finite, non-negative number of seconds"
            ));
        }

        if self.turns.max_backchannel_words == 0 {
            errors.push("turns.max_backchannel_words must be at least 1".to_string());
        }

        if self.output.dir.as_os_str().is_empty() {
            errors.push("output.dir must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Transitions
// ============================================================================

/// Transition table settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionConfig {
    /// Count each conversation's last sequence as a transition to an absent
    /// successor. Off by default: terminal rows have no `next_type` and are
    /// left out of the probabilities.
    #[serde(default)]
    pub count_terminal_transitions: bool,
}

// ============================================================================
// Phases
// ============================================================================

/// Scale the five phase bins are laid over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseScale {
    /// Bins span the observed progress range of each conversation
    #[default]
    Realized,
    /// Bins span the fixed interval [0, 1]
    Unit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseConfig {
    #[serde(default)]
    pub scale: PhaseScale,
}

// ============================================================================
// Turn Segmentation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Same-speaker gaps below this are merged (seconds)
    #[serde(default = "default_max_pause_secs")]
    pub max_pause_secs: f64,

    /// Longest segment (in words) that can still be a backchannel
    #[serde(default = "default_max_backchannel_words")]
    pub max_backchannel_words: usize,
}

fn default_max_pause_secs() -> f64 {
    defaults::MAX_PAUSE_SECS
}
fn default_max_backchannel_words() -> usize {
    defaults::MAX_BACKCHANNEL_WORDS
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            max_pause_secs: default_max_pause_secs(),
            max_backchannel_words: default_max_backchannel_words(),
        }
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the artifacts are written into
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(defaults::OUTPUT_DIR)
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_validates() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: AnalysisConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.turns.max_pause_secs, 1.5);
        assert_eq!(config.turns.max_backchannel_words, 3);
        assert_eq!(config.phases.scale, PhaseScale::Realized);
        assert!(!config.transitions.count_terminal_transitions);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[transitions]
count_terminal_transitions = true

[phases]
scale = "unit"
"#;
        let config: AnalysisConfig = toml::from_str(toml_str).expect("partial TOML should parse");
        assert!(config.transitions.count_terminal_transitions);
        assert_eq!(config.phases.scale, PhaseScale::Unit);
        // Non-overridden values retain defaults
        assert_eq!(config.turns.max_pause_secs, 1.5);
        assert_eq!(config.output.dir, PathBuf::from("output"));
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let mut config = AnalysisConfig::default();
        config.turns.max_pause_secs = -1.0;
        config.turns.max_backchannel_words = 0;

        match config.validate() {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_path_loads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[turns]\nmax_pause_secs = 2.0").unwrap();

        let config = AnalysisConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.turns.max_pause_secs, 2.0);
    }

    #[test]
    fn test_explicit_path_with_invalid_toml_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[turns\nmax_pause_secs = ").unwrap();

        let err = AnalysisConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_, _)));
    }
}
