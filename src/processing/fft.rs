//! FFT computation using rustfft
//!
//! Turns event arrival times into a magnitude spectrum of their inter-event
//! intervals, and scores spectra against reference fingerprints.
//!
//! # Features
//!
//! - Cached FFT plans, reused across calls of the same length
//! - DC removal before the transform so a perfectly regular stream is silent
//! - Prefix-restricted cosine similarity for references of any length
//!
//! # Example
//!
//! ```ignore
//! use harmonic_pipeline::processing::{consecutive_deltas, SpectrumAnalyzer};
//!
//! let deltas = consecutive_deltas(&timestamps);
//! let mut analyzer = SpectrumAnalyzer::new();
//! let spectrum = analyzer.interval_spectrum(&deltas);
//! ```

use num_complex::Complex;
use rustfft::FftPlanner;

// ============================================================================
// Standalone Functions
// ============================================================================

/// Differences between consecutive timestamps.
///
/// Ordering is not enforced: a timestamp that goes backwards yields a
/// negative delta rather than an error. Fewer than two timestamps give an
/// empty vector.
pub fn consecutive_deltas(timestamps: &[f64]) -> Vec<f64> {
    timestamps.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Arithmetic mean, `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Cosine similarity over the overlapping prefix of two vectors.
///
/// Only the first `min(a.len(), b.len())` elements take part. `epsilon` is
/// added to the norm product so all-zero inputs score `0.0` instead of NaN.
pub fn cosine_similarity(a: &[f64], b: &[f64], epsilon: f64) -> f64 {
    let n = a.len().min(b.len());
    let (a, b) = (&a[..n], &b[..n]);

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    dot / (norm_a * norm_b + epsilon)
}

// ============================================================================
// Spectrum Analyzer
// ============================================================================

/// FFT front end with a plan cache.
///
/// Event streams arrive with varying lengths, so rather than pre-planning a
/// single size the analyzer keeps a planner that memoises plans per length.
pub struct SpectrumAnalyzer {
    planner: FftPlanner<f64>,
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Unscaled magnitude spectrum of a real-valued signal.
    ///
    /// Full-length forward transform with no zero padding, so the output has
    /// exactly `signal.len()` bins (both halves of the symmetric spectrum).
    pub fn magnitude_spectrum(&mut self, signal: &[f64]) -> Vec<f64> {
        if signal.is_empty() {
            return Vec::new();
        }

        let fft = self.planner.plan_fft_forward(signal.len());
        let mut buffer: Vec<Complex<f64>> =
            signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
        fft.process(&mut buffer);

        buffer.iter().map(|c| c.norm()).collect()
    }

    /// Magnitude spectrum of interval deltas after removing their mean.
    pub fn interval_spectrum(&mut self, deltas: &[f64]) -> Vec<f64> {
        let dc = mean(deltas);
        let centred: Vec<f64> = deltas.iter().map(|d| d - dc).collect();
        self.magnitude_spectrum(&centred)
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
