//! Signal processing module - FFT magnitude spectra and spectral matching

mod fft;

pub use fft::*;

use thiserror::Error;

/// Errors in signal processing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessingError {
    /// Not enough timestamp differences to infer any harmonic structure.
    /// Recoverable: retry once more events have been captured.
    #[error("Insufficient data: need {needed} timestamp deltas, have {available}")]
    InsufficientData { needed: usize, available: usize },
}
