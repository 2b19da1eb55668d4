//! Pipeline Configuration Module
//!
//! Provides per-deployment configuration loaded from TOML files, replacing
//! hardcoded stage constants with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `HARMONIC_CONFIG` environment variable (path to TOML file)
//! 2. `harmonic_config.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])
//!
//! ## Usage
//!
//! ```ignore
//! let config = PipelineConfig::load();
//! let pipeline = AnalysisPipeline::from_config(&config)?;
//! ```

mod pipeline_config;
pub mod defaults;
pub mod validation;

pub use pipeline_config::*;
