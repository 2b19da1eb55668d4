//! Field Reconstructor
//!
//! Renders a feature vector into a fixed-size, smoothed 2-D intensity field.
//!
//! ## Steps
//!
//! 1. Min/max normalise the vector into [0, 1]
//! 2. Copy it row-major into a zeroed `rows x cols` grid, truncating or
//!    leaving trailing cells at zero
//! 3. Gaussian-smooth the grid to soften the hard truncation boundary
//!
//! Only the most recent field is retained.

mod render;
mod smoothing;

pub use render::{AsciiRenderer, FieldRenderer, LogRenderer};
pub use smoothing::{gaussian_kernel, gaussian_smooth};

use ndarray::Array2;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ReconstructionConfig;

/// Errors in field reconstruction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconstructionError {
    /// No feature values to render. Recoverable: no field is produced.
    #[error("Empty feature vector: nothing to reconstruct")]
    EmptyFeature,

    /// A field needs at least one row and one column.
    #[error("Invalid field resolution {rows}x{cols}: both dimensions must be non-zero")]
    InvalidResolution { rows: usize, cols: usize },

    /// Smoothing parameters must be finite and positive.
    #[error("Invalid smoothing: sigma {sigma} and truncate {truncate} must be finite and > 0")]
    InvalidSmoothing { sigma: f64, truncate: f64 },
}

// ============================================================================
// Reconstructed Field
// ============================================================================

/// Smoothed 2-D intensity grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedField {
    values: Array2<f64>,
}

impl ReconstructedField {
    pub fn new(values: Array2<f64>) -> Self {
        Self { values }
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Row-major copy of every cell, the classifier's observation layout.
    pub fn flatten(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().reduce(f64::min).unwrap_or(0.0)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().reduce(f64::max).unwrap_or(0.0)
    }

    pub fn mean(&self) -> f64 {
        self.values.mean().unwrap_or(0.0)
    }
}

// ============================================================================
// Reconstructor
// ============================================================================

/// Min/max normalisation into [0, 1].
///
/// A constant vector maps to all zeros: `epsilon` keeps the denominator
/// positive when max == min.
pub fn normalize(vector: &[f64], epsilon: f64) -> Vec<f64> {
    let lo = vector.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = vector.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = hi - lo + epsilon;
    vector.iter().map(|v| (v - lo) / range).collect()
}

/// Converts feature vectors into smoothed fields of a fixed resolution.
#[derive(Debug, Clone)]
pub struct FieldReconstructor {
    rows: usize,
    cols: usize,
    smoothing_sigma: f64,
    truncate: f64,
    normalization_epsilon: f64,
    last_field: Option<ReconstructedField>,
}

impl FieldReconstructor {
    /// Reconstructor with default smoothing at the given resolution.
    pub fn new(rows: usize, cols: usize) -> Result<Self, ReconstructionError> {
        Self::with_config(&ReconstructionConfig {
            rows,
            cols,
            ..ReconstructionConfig::default()
        })
    }

    /// Rejects a zero resolution and a kernel that would not be a finite Gaussian.
    pub fn with_config(config: &ReconstructionConfig) -> Result<Self, ReconstructionError> {
        if config.rows == 0 || config.cols == 0 {
            return Err(ReconstructionError::InvalidResolution {
                rows: config.rows,
                cols: config.cols,
            });
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(config.smoothing_sigma) || !positive(config.truncate) {
            return Err(ReconstructionError::InvalidSmoothing {
                sigma: config.smoothing_sigma,
                truncate: config.truncate,
            });
        }

        Ok(Self {
            rows: config.rows,
            cols: config.cols,
            smoothing_sigma: config.smoothing_sigma,
            truncate: config.truncate,
            normalization_epsilon: config.normalization_epsilon,
            last_field: None,
        })
    }

    /// Normalised, zero-padded grid before smoothing.
    pub fn layout(&self, vector: &[f64]) -> Array2<f64> {
        let normalized = normalize(vector, self.normalization_epsilon);
        let mut grid = Array2::zeros((self.rows, self.cols));
        // Row-major storage: flat order matches `flatten()`
        for (cell, v) in grid.iter_mut().zip(normalized) {
            *cell = v;
        }
        grid
    }

    /// Render `vector` into a new field and retain it.
    pub fn generate_image(&mut self, vector: &[f64]) -> Result<&ReconstructedField, ReconstructionError> {
        if vector.is_empty() {
            return Err(ReconstructionError::EmptyFeature);
        }

        let cells = self.rows * self.cols;
        if vector.len() > cells {
            debug!(
                values = vector.len(),
                cells,
                "Feature vector longer than field, truncating"
            );
        }

        let grid = self.layout(vector);
        let smoothed = gaussian_smooth(&grid, self.smoothing_sigma, self.truncate);
        Ok(self.last_field.insert(ReconstructedField::new(smoothed)))
    }

    pub fn last_field(&self) -> Option<&ReconstructedField> {
        self.last_field.as_ref()
    }

    /// Hand the latest field to `renderer`; logs instead when there is none.
    pub fn display_last(&self, renderer: &mut dyn FieldRenderer) {
        match &self.last_field {
            Some(field) => renderer.render(field, "Harmonic Field Representation"),
            None => info!("[FieldReconstructor] No field to display"),
        }
    }

    /// `(rows, cols)`
    pub fn resolution(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingRenderer {
        calls: usize,
    }

    impl FieldRenderer for CountingRenderer {
        fn render(&mut self, _field: &ReconstructedField, _title: &str) {
            self.calls += 1;
        }
    }

    #[test]
    fn test_zero_resolution_is_rejected() {
        assert_eq!(
            FieldReconstructor::new(0, 8).unwrap_err(),
            ReconstructionError::InvalidResolution { rows: 0, cols: 8 }
        );
        assert!(FieldReconstructor::new(4, 0).is_err());
    }

    #[test]
    fn test_non_positive_smoothing_is_rejected() {
        for sigma in [0.0, -1.5, f64::NAN, f64::INFINITY] {
            let config = ReconstructionConfig {
                smoothing_sigma: sigma,
                ..ReconstructionConfig::default()
            };
            assert!(
                matches!(
                    FieldReconstructor::with_config(&config),
                    Err(ReconstructionError::InvalidSmoothing { .. })
                ),
                "sigma {sigma} accepted"
            );
        }
        let config = ReconstructionConfig {
            truncate: 0.0,
            ..ReconstructionConfig::default()
        };
        assert!(FieldReconstructor::with_config(&config).is_err());
    }

    #[test]
    fn test_empty_vector_is_rejected() {
        let mut recon = FieldReconstructor::new(8, 8).unwrap();
        assert_eq!(recon.generate_image(&[]), Err(ReconstructionError::EmptyFeature));
        assert!(recon.last_field().is_none());
    }

    #[test]
    fn test_normalized_layout_in_unit_range() {
        let recon = FieldReconstructor::new(4, 4).unwrap();
        let grid = recon.layout(&[-3.0, 7.5, 0.0, 100.0, -50.0]);
        for &v in &grid {
            assert!((0.0..=1.0).contains(&v), "{v}");
        }
        // Extremes land on ~0 and ~1
        assert!(grid[[0, 0]] > 0.0);
        assert!((grid[[0, 3]] - 1.0).abs() < 1e-9);
        assert!(grid[[1, 0]].abs() < 1e-12);
    }

    #[test]
    fn test_constant_vector_gives_flat_zero_field() {
        let mut recon = FieldReconstructor::new(6, 6).unwrap();
        let field = recon.generate_image(&[3.0; 10]).unwrap();
        assert!(field.max().abs() < 1e-12);
    }

    #[test]
    fn test_short_vector_pads_with_zeros() {
        let recon = FieldReconstructor::new(3, 3).unwrap();
        let grid = recon.layout(&[0.0, 1.0]);
        assert!((grid[[0, 1]] - 1.0).abs() < 1e-6);
        assert_eq!(grid.iter().filter(|v| **v == 0.0).count(), 8);
    }

    #[test]
    fn test_long_vector_is_truncated() {
        let recon = FieldReconstructor::new(2, 2).unwrap();
        let grid = recon.layout(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        // Normalised over the whole vector, then only the first 4 kept
        assert!((grid[[1, 1]] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_field_shape_fixed_and_replaced() {
        let mut recon = FieldReconstructor::new(5, 7).unwrap();
        let first = recon.generate_image(&[1.0, 2.0, 3.0]).unwrap().clone();
        assert_eq!(first.shape(), (5, 7));
        assert_eq!(first.flatten().len(), 35);

        recon.generate_image(&[9.0, 0.0]).unwrap();
        assert_ne!(recon.last_field(), Some(&first));
    }

    #[test]
    fn test_smoothed_field_stays_in_unit_range() {
        let mut recon = FieldReconstructor::new(16, 16).unwrap();
        let vector: Vec<f64> = (0..200).map(|i| ((i * 37) % 11) as f64).collect();
        let field = recon.generate_image(&vector).unwrap();
        assert!(field.min() > -1e-12);
        assert!(field.max() < 1.0 + 1e-12);
    }

    #[test]
    fn test_display_last_only_with_field() {
        let mut recon = FieldReconstructor::new(4, 4).unwrap();
        let mut renderer = CountingRenderer::default();
        recon.display_last(&mut renderer);
        assert_eq!(renderer.calls, 0);

        recon.generate_image(&[1.0, 2.0]).unwrap();
        recon.display_last(&mut renderer);
        assert_eq!(renderer.calls, 1);
    }
}
