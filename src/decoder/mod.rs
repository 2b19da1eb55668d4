//! Fingerprint Decoder
//!
//! Converts a stream of event timestamps into the magnitude spectrum of its
//! inter-event intervals and names the closest reference fingerprint.
//!
//! ## Outcomes
//!
//! - `Err(InsufficientData)`: fewer than `min_deltas` intervals, nothing computed
//! - `Ok(None)`: spectrum computed, but no reference scored above zero
//! - `Ok(Some(match))`: best-scoring reference, first registered wins ties
//!
//! Reversed timestamps give negative intervals and decode normally. A single
//! non-finite timestamp turns the whole spectrum into NaN, which scores no
//! match and reconstructs to an all-NaN field.
//!
//! The decoder keeps the last spectrum and match for inspection. Both are
//! replaced on every call, including calls that fail for lack of data.

mod library;

pub use library::FingerprintLibrary;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::DecoderConfig;
use crate::processing::{consecutive_deltas, cosine_similarity, ProcessingError, SpectrumAnalyzer};

/// Best reference fingerprint for one decode call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintMatch {
    /// Name the reference was registered under
    pub tag: String,
    /// Cosine similarity in (0, 1]
    pub score: f64,
}

/// Spectral fingerprint decoder bound to one reference library.
#[derive(Debug)]
pub struct FingerprintDecoder {
    library: FingerprintLibrary,
    analyzer: SpectrumAnalyzer,
    min_deltas: usize,
    similarity_epsilon: f64,
    last_spectrum: Option<Vec<f64>>,
    last_match: Option<FingerprintMatch>,
}

impl FingerprintDecoder {
    /// Decoder with default thresholds.
    pub fn new(library: FingerprintLibrary) -> Self {
        Self::with_config(library, &DecoderConfig::default())
    }

    pub fn with_config(library: FingerprintLibrary, config: &DecoderConfig) -> Self {
        Self {
            library,
            analyzer: SpectrumAnalyzer::new(),
            min_deltas: config.min_deltas.max(1),
            similarity_epsilon: config.similarity_epsilon,
            last_spectrum: None,
            last_match: None,
        }
    }

    /// Decode one event stream.
    ///
    /// Malformed-but-long-enough input never fails: constant intervals or
    /// an all-zero reference simply score 0 and produce `Ok(None)`.
    pub fn decode(&mut self, timestamps: &[f64]) -> Result<Option<FingerprintMatch>, ProcessingError> {
        self.last_spectrum = None;
        self.last_match = None;

        let deltas = consecutive_deltas(timestamps);
        if deltas.len() < self.min_deltas {
            debug!(
                events = timestamps.len(),
                deltas = deltas.len(),
                needed = self.min_deltas,
                "Not enough events for harmonic inference"
            );
            return Err(ProcessingError::InsufficientData {
                needed: self.min_deltas,
                available: deltas.len(),
            });
        }

        let spectrum = self.analyzer.interval_spectrum(&deltas);

        let mut best: Option<FingerprintMatch> = None;
        let mut best_score = 0.0;
        for (tag, reference) in self.library.iter() {
            let score = cosine_similarity(&spectrum, reference, self.similarity_epsilon);
            trace!(tag, score, "Fingerprint score");
            if score > best_score {
                best_score = score;
                best = Some(FingerprintMatch {
                    tag: tag.to_string(),
                    score,
                });
            }
        }

        debug!(
            bins = spectrum.len(),
            tag = best.as_ref().map_or("none", |m| m.tag.as_str()),
            score = best_score,
            "Decoded event stream"
        );

        self.last_spectrum = Some(spectrum);
        self.last_match = best.clone();
        Ok(best)
    }

    /// Feature vector from the most recent successful decode.
    pub fn last_spectrum(&self) -> Option<&[f64]> {
        self.last_spectrum.as_deref()
    }

    pub fn last_match(&self) -> Option<&FingerprintMatch> {
        self.last_match.as_ref()
    }

    /// Score of the most recent match, if any.
    pub fn last_score(&self) -> Option<f64> {
        self.last_match.as_ref().map(|m| m.score)
    }

    /// Tag of the most recent match, if any.
    pub fn last_tag(&self) -> Option<&str> {
        self.last_match.as_ref().map(|m| m.tag.as_str())
    }

    /// One-line description of the last decode result.
    pub fn last_result_summary(&self) -> String {
        match (&self.last_match, &self.last_spectrum) {
            (Some(m), _) => format!("Last harmonic match: {} (score {:.3})", m.tag, m.score),
            (None, Some(s)) => format!("Last harmonic match: none ({} bins)", s.len()),
            (None, None) => "Last harmonic match: no decode".to_string(),
        }
    }

    pub fn library(&self) -> &FingerprintLibrary {
        &self.library
    }
}
