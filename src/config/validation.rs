//! Config validation: unknown-key detection with Levenshtein suggestions
//! and numeric range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// Section whose keys are user-chosen fingerprint names.
const FINGERPRINTS_SECTION: &str = "fingerprints";

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for PipelineConfig.
///
/// Maintained by hand to match the struct hierarchy in pipeline_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [decoder]
        "decoder",
        "decoder.min_deltas",
        "decoder.similarity_epsilon",
        // [reconstruction]
        "reconstruction",
        "reconstruction.rows",
        "reconstruction.cols",
        "reconstruction.smoothing_sigma",
        "reconstruction.truncate",
        "reconstruction.normalization_epsilon",
        // [classifier]
        "classifier",
        "classifier.cluster_count",
        // [history]
        "history",
        "history.max_entries",
        // [fingerprints] (entries are free-form)
        FINGERPRINTS_SECTION,
    ];
    keys.iter().copied().collect()
}

/// Recursively collect dotted key paths from a TOML value tree.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Equal distances resolve to the lexicographically smaller key so the
/// suggestion does not depend on hash iteration order.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist > 3 {
            continue;
        }
        match best {
            Some((best_key, best_dist)) if dist > best_dist || (dist == best_dist && k > best_key) => {}
            _ => best = Some((k, dist)),
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let fingerprint_prefix = format!("{FINGERPRINTS_SECTION}.");
    let mut warnings = Vec::new();

    for key in walk_toml_keys(&value, "") {
        if known.contains(key.as_str()) || key.starts_with(&fingerprint_prefix) {
            continue;
        }
        let suggestion = suggest_correction(&key, &known);
        warnings.push(ValidationWarning {
            message: format!("Unknown config key '{key}'"),
            field: key,
            suggestion,
        });
    }

    warnings
}

// ============================================================================
// Range Validation
// ============================================================================

/// Check every numeric setting for values the pipeline cannot run with.
///
/// Returns one message per problem; an empty vector means the config is usable.
pub fn validate_ranges(config: &super::PipelineConfig) -> Vec<String> {
    let mut errors = Vec::new();

    let d = &config.decoder;
    if d.min_deltas == 0 {
        errors.push("decoder.min_deltas: must be >= 1".to_string());
    }
    check_positive(d.similarity_epsilon, "decoder.similarity_epsilon", &mut errors);

    let r = &config.reconstruction;
    if r.rows == 0 || r.cols == 0 {
        errors.push(format!(
            "reconstruction: resolution must be non-zero (got {}x{})",
            r.rows, r.cols
        ));
    }
    check_positive(r.smoothing_sigma, "reconstruction.smoothing_sigma", &mut errors);
    check_positive(r.truncate, "reconstruction.truncate", &mut errors);
    check_positive(
        r.normalization_epsilon,
        "reconstruction.normalization_epsilon",
        &mut errors,
    );

    if config.classifier.cluster_count == 0 {
        errors.push("classifier.cluster_count: must be >= 1".to_string());
    }

    if config.history.max_entries == Some(0) {
        errors.push("history.max_entries: must be >= 1 when set".to_string());
    }

    for (name, reference) in &config.fingerprints {
        if reference.is_empty() {
            errors.push(format!("fingerprints.{name}: reference vector is empty"));
        } else if reference.iter().any(|v| !v.is_finite()) {
            errors.push(format!("fingerprints.{name}: values must be finite"));
        }
    }

    errors
}

fn check_positive(value: f64, name: &str, errors: &mut Vec<String>) {
    if !value.is_finite() || value <= 0.0 {
        errors.push(format!("{name}: must be finite and > 0 (got {value})"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("rows", "rows"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("rows", "row"), 1);
        assert_eq!(levenshtein("cols", "coles"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_flat() {
        let value: toml::Value = "[classifier]\ncluster_count = 3\n".parse().unwrap();
        let keys = walk_toml_keys(&value, "");
        assert!(keys.contains(&"classifier".to_string()));
        assert!(keys.contains(&"classifier.cluster_count".to_string()));
    }

    #[test]
    fn test_fingerprint_names_are_not_flagged() {
        let warnings = validate_unknown_keys("[fingerprints]\nanything_goes = [1.0]\n");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_range_errors_accumulate() {
        let mut config = super::super::PipelineConfig::default();
        config.reconstruction.rows = 0;
        config.reconstruction.smoothing_sigma = f64::NAN;
        config.history.max_entries = Some(0);
        let errors = validate_ranges(&config);
        assert_eq!(errors.len(), 3, "{errors:?}");
    }
}
