//! System-wide default constants.
//!
//! Centralises the numeric tuning values used by the three pipeline stages.
//! Grouped by stage for easy discovery.

// ============================================================================
// Decoder
// ============================================================================

/// Minimum number of consecutive timestamp differences required to decode.
pub const MIN_DELTAS_FOR_DECODE: usize = 16;

/// Additive constant in the cosine-similarity denominator.
pub const SIMILARITY_EPSILON: f64 = 1e-8;

// ============================================================================
// Reconstruction
// ============================================================================

/// Default field height (cells).
pub const FIELD_ROWS: usize = 256;

/// Default field width (cells).
pub const FIELD_COLS: usize = 256;

/// Gaussian smoothing standard deviation (cells).
pub const SMOOTHING_SIGMA: f64 = 1.5;

/// Kernel half-width in standard deviations.
///
/// `radius = floor(truncate * sigma + 0.5)`, so 4.0 × 1.5 gives a 6-cell radius.
pub const SMOOTHING_TRUNCATE: f64 = 4.0;

/// Additive constant in the min/max normalisation denominator.
pub const NORMALIZATION_EPSILON: f64 = 1e-9;

// ============================================================================
// Classifier
// ============================================================================

/// Number of groups the clustering model is configured with.
pub const CLUSTER_COUNT: usize = 4;

// ============================================================================
// Config discovery
// ============================================================================

/// Environment variable pointing at a pipeline config file.
pub const CONFIG_ENV_VAR: &str = "HARMONIC_CONFIG";

/// Config file looked up in the working directory when the env var is unset.
pub const LOCAL_CONFIG_FILE: &str = "harmonic_config.toml";
