//! Analysis Configuration Module
//!
//! Provides the operator-tunable settings of the analysis, loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. An explicit path (the `--config` CLI flag)
//! 2. `CONVO_CONFIG` environment variable (path to TOML file)
//! 3. `analysis_config.toml` in the current working directory
//! 4. Built-in defaults
//!
//! ## Usage
//!
//! ```ignore
//! let config = AnalysisConfig::load(None);
//! let report = pipeline::run(&sequences, &config);
//! ```

mod analysis_config;
pub mod defaults;

pub use analysis_config::*;
