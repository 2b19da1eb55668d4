//! Display hooks for reconstructed fields.
//!
//! The pipeline never draws anything itself; it hands the latest field to a
//! [`FieldRenderer`] supplied by the caller.

use std::io::Write;
use tracing::{info, warn};

use super::ReconstructedField;

/// Display collaborator for reconstructed fields.
pub trait FieldRenderer {
    fn render(&mut self, field: &ReconstructedField, title: &str);
}

/// Emits summary statistics of the field through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRenderer;

impl FieldRenderer for LogRenderer {
    fn render(&mut self, field: &ReconstructedField, title: &str) {
        let (rows, cols) = field.shape();
        info!(
            title,
            rows,
            cols,
            min = field.min(),
            max = field.max(),
            mean = field.mean(),
            "Field snapshot"
        );
    }
}

/// Intensity ramp, darkest first.
const RAMP: &[u8] = b" .:-=+*#%@";

/// Draws a block-averaged character heat map.
#[derive(Debug)]
pub struct AsciiRenderer<W: Write> {
    out: W,
    max_rows: usize,
    max_cols: usize,
}

impl<W: Write> AsciiRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            max_rows: 24,
            max_cols: 64,
        }
    }

    /// Limit the drawing to at most `rows` x `cols` characters.
    pub fn with_size(mut self, rows: usize, cols: usize) -> Self {
        self.max_rows = rows.max(1);
        self.max_cols = cols.max(1);
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, field: &ReconstructedField, title: &str) -> std::io::Result<()> {
        let (rows, cols) = field.shape();
        let out_rows = rows.min(self.max_rows);
        let out_cols = cols.min(self.max_cols);
        let (lo, hi) = (field.min(), field.max());
        let span = hi - lo;

        writeln!(self.out, "{title} [{rows}x{cols}, min {lo:.3}, max {hi:.3}]")?;
        for r in 0..out_rows {
            // out_rows <= rows, so every block spans at least one cell
            let (r0, r1) = (r * rows / out_rows, (r + 1) * rows / out_rows);
            let mut line = String::with_capacity(out_cols);
            for c in 0..out_cols {
                let (c0, c1) = (c * cols / out_cols, (c + 1) * cols / out_cols);
                let block = field.values().slice(ndarray::s![r0..r1, c0..c1]);
                let avg = block.mean().unwrap_or(0.0);
                let level = if span > 0.0 { (avg - lo) / span } else { 0.0 };
                let idx = ((level * (RAMP.len() - 1) as f64).round() as usize).min(RAMP.len() - 1);
                line.push(RAMP[idx] as char);
            }
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()
    }
}

impl<W: Write> FieldRenderer for AsciiRenderer<W> {
    fn render(&mut self, field: &ReconstructedField, title: &str) {
        if let Err(e) = self.draw(field, title) {
            warn!(error = %e, "Failed to draw field");
        }
    }
}
