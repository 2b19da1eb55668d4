//! Pipeline Configuration - stage tuning as operator-editable TOML values
//!
//! Each section struct implements `Default` with the values from
//! [`super::defaults`], so a missing file or a missing section behaves
//! exactly like the built-in pipeline.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::decoder::FingerprintLibrary;
use crate::pipeline::RetentionPolicy;

// ============================================================================
// Config Provenance
// ============================================================================

/// Tracks which configuration keys were explicitly present in the user's TOML file.
#[derive(Debug, Clone, Default)]
pub struct ConfigProvenance {
    /// Dotted key paths explicitly present in the user's TOML file
    pub explicit_keys: HashSet<String>,
}

impl ConfigProvenance {
    /// Check whether a dotted key path was explicitly set by the user.
    ///
    /// Example: `provenance.is_user_set("reconstruction.smoothing_sigma")`
    pub fn is_user_set(&self, dotted_key: &str) -> bool {
        self.explicit_keys.contains(dotted_key)
    }
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one analysis pipeline.
///
/// Load with `PipelineConfig::load()` which searches:
/// 1. `$HARMONIC_CONFIG` env var
/// 2. `./harmonic_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fingerprint decoder tuning
    #[serde(default)]
    pub decoder: DecoderConfig,

    /// Field reconstruction geometry and smoothing
    #[serde(default)]
    pub reconstruction: ReconstructionConfig,

    /// Clustering model shape
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// History log retention
    #[serde(default)]
    pub history: HistoryConfig,

    /// Reference fingerprints, `name = [magnitudes...]`
    #[serde(default)]
    pub fingerprints: BTreeMap<String, Vec<f64>>,
}

impl PipelineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$HARMONIC_CONFIG` environment variable
    /// 2. `./harmonic_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        Self::load_with_provenance().0
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let (config, _provenance) = Self::load_from_file_with_provenance(path)?;
        Ok(config)
    }

    /// Load from a specific TOML file path, also returning provenance
    /// so callers can distinguish user-set values from defaults.
    pub fn load_from_file_with_provenance(
        path: &Path,
    ) -> Result<(Self, ConfigProvenance), ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::parse_with_provenance(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse a TOML document held in memory.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(Self::parse_with_provenance(contents)?.0)
    }

    fn parse_with_provenance(contents: &str) -> Result<(Self, ConfigProvenance), ConfigError> {
        // Two-pass: unknown keys first (warnings only)
        for w in &super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let provenance = ConfigProvenance {
            explicit_keys: super::validation::walk_toml_keys(
                &contents
                    .parse::<toml::Value>()
                    .unwrap_or(toml::Value::Table(Default::default())),
                "",
            )
            .into_iter()
            .collect(),
        };

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok((config, provenance))
    }

    /// Load configuration using standard search order, returning provenance.
    pub fn load_with_provenance() -> (Self, ConfigProvenance) {
        // 1. Check env var
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file_with_provenance(&p) {
                    Ok((config, provenance)) => {
                        info!(path = %p.display(), fingerprints = config.fingerprints.len(), "Loaded pipeline config from HARMONIC_CONFIG");
                        return (config, provenance);
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from HARMONIC_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "HARMONIC_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./harmonic_config.toml
        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file_with_provenance(&local) {
                Ok((config, provenance)) => {
                    info!(fingerprints = config.fingerprints.len(), "Loaded pipeline config from ./harmonic_config.toml");
                    return (config, provenance);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./harmonic_config.toml, using defaults");
                }
            }
        }

        // 3. Defaults, nothing is user-set
        info!("No harmonic_config.toml found, using built-in defaults");
        (Self::default(), ConfigProvenance::default())
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Pipeline config saved");
        Ok(())
    }

    /// Validate every section; all problems are reported together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors = super::validation::validate_ranges(self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Reference fingerprint library built from the `[fingerprints]` table.
    pub fn fingerprint_library(&self) -> FingerprintLibrary {
        self.fingerprints
            .iter()
            .map(|(name, reference)| (name.clone(), reference.clone()))
            .collect()
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Decoder
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Minimum consecutive timestamp differences before a spectrum is computed
    #[serde(default = "default_min_deltas")]
    pub min_deltas: usize,

    /// Cosine-similarity denominator guard
    #[serde(default = "default_similarity_epsilon")]
    pub similarity_epsilon: f64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            min_deltas: default_min_deltas(),
            similarity_epsilon: default_similarity_epsilon(),
        }
    }
}

fn default_min_deltas() -> usize {
    defaults::MIN_DELTAS_FOR_DECODE
}
fn default_similarity_epsilon() -> f64 {
    defaults::SIMILARITY_EPSILON
}

// ============================================================================
// Reconstruction
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructionConfig {
    /// Field height in cells
    #[serde(default = "default_rows")]
    pub rows: usize,

    /// Field width in cells
    #[serde(default = "default_cols")]
    pub cols: usize,

    /// Gaussian standard deviation in cells
    #[serde(default = "default_smoothing_sigma")]
    pub smoothing_sigma: f64,

    /// Kernel half-width in standard deviations
    #[serde(default = "default_truncate")]
    pub truncate: f64,

    /// Min/max normalisation denominator guard
    #[serde(default = "default_normalization_epsilon")]
    pub normalization_epsilon: f64,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            cols: default_cols(),
            smoothing_sigma: default_smoothing_sigma(),
            truncate: default_truncate(),
            normalization_epsilon: default_normalization_epsilon(),
        }
    }
}

impl ReconstructionConfig {
    /// Number of cells in the flattened field.
    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }
}

fn default_rows() -> usize {
    defaults::FIELD_ROWS
}
fn default_cols() -> usize {
    defaults::FIELD_COLS
}
fn default_smoothing_sigma() -> f64 {
    defaults::SMOOTHING_SIGMA
}
fn default_truncate() -> f64 {
    defaults::SMOOTHING_TRUNCATE
}
fn default_normalization_epsilon() -> f64 {
    defaults::NORMALIZATION_EPSILON
}

// ============================================================================
// Classifier
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Number of groups; fixed for the model's lifetime
    #[serde(default = "default_cluster_count")]
    pub cluster_count: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            cluster_count: default_cluster_count(),
        }
    }
}

fn default_cluster_count() -> usize {
    defaults::CLUSTER_COUNT
}

// ============================================================================
// History
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Keep at most this many entries; absent means unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
}

impl HistoryConfig {
    pub fn retention(&self) -> RetentionPolicy {
        match self.max_entries {
            Some(n) => RetentionPolicy::MaxEntries(n),
            None => RetentionPolicy::Unbounded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.decoder.min_deltas, 16);
        assert_eq!(config.reconstruction.rows, 256);
        assert_eq!(config.reconstruction.cols, 256);
        assert!((config.reconstruction.smoothing_sigma - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.classifier.cluster_count, 4);
        assert!(config.history.max_entries.is_none());
        assert!(config.fingerprints.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
[reconstruction]
rows = 32
cols = 16
"#,
        )
        .unwrap();
        assert_eq!(config.reconstruction.cell_count(), 512);
        assert!((config.reconstruction.truncate - 4.0).abs() < f64::EPSILON);
        assert_eq!(config.classifier.cluster_count, 4);
    }

    #[test]
    fn test_history_retention_mapping() {
        let mut history = HistoryConfig::default();
        assert_eq!(history.retention(), RetentionPolicy::Unbounded);
        history.max_entries = Some(10);
        assert_eq!(history.retention(), RetentionPolicy::MaxEntries(10));
    }

    #[test]
    fn test_fingerprint_table_builds_library() {
        let config = PipelineConfig::from_toml_str(
            r#"
[fingerprints]
pulse = [1.0, 0.0, 0.5]
drift = [0.2, 0.2]
"#,
        )
        .unwrap();
        let library = config.fingerprint_library();
        assert_eq!(library.len(), 2);
        assert_eq!(library.get("pulse"), Some(&[1.0, 0.0, 0.5][..]));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = PipelineConfig::from_toml_str(
            r#"
[classifier]
cluster_count = 0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));
    }
}
