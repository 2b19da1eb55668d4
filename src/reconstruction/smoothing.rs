//! Separable Gaussian smoothing with half-sample symmetric boundaries.
//!
//! Boundary handling mirrors the grid about its outer edge, repeating the
//! edge cell (`d c b a | a b c d | d c b a`). Weights are normalised and
//! non-negative, so every output cell is a convex combination of inputs and
//! the input value range is preserved.

use ndarray::{Array2, ArrayView1, ArrayViewMut1, Axis};

/// Normalised 1-D Gaussian weights, `2 * radius + 1` long.
///
/// `radius = floor(truncate * sigma + 0.5)`.
pub fn gaussian_kernel(sigma: f64, truncate: f64) -> Vec<f64> {
    let radius = (truncate * sigma + 0.5).floor().max(0.0) as i64;
    let denom = 2.0 * sigma * sigma;
    let mut weights: Vec<f64> = (-radius..=radius)
        .map(|x| {
            let x = x as f64;
            (-(x * x) / denom).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

/// Map an out-of-range index back into `0..len` by mirroring.
fn reflect_index(i: i64, len: usize) -> usize {
    let n = len as i64;
    let period = 2 * n;
    let m = i.rem_euclid(period);
    if m < n {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

fn correlate_line(input: ArrayView1<'_, f64>, mut output: ArrayViewMut1<'_, f64>, kernel: &[f64]) {
    let len = input.len();
    if len == 0 {
        return;
    }
    let radius = (kernel.len() / 2) as i64;
    for (i, out) in output.iter_mut().enumerate() {
        let centre = i as i64;
        *out = kernel
            .iter()
            .enumerate()
            .map(|(k, w)| w * input[reflect_index(centre + k as i64 - radius, len)])
            .sum();
    }
}

/// Smooth a 2-D grid along rows, then along columns.
pub fn gaussian_smooth(grid: &Array2<f64>, sigma: f64, truncate: f64) -> Array2<f64> {
    let kernel = gaussian_kernel(sigma, truncate);

    let mut along_cols = Array2::zeros(grid.raw_dim());
    for (src, dst) in grid.lanes(Axis(1)).into_iter().zip(along_cols.lanes_mut(Axis(1))) {
        correlate_line(src, dst, &kernel);
    }

    let mut smoothed = Array2::zeros(grid.raw_dim());
    for (src, dst) in along_cols.lanes(Axis(0)).into_iter().zip(smoothed.lanes_mut(Axis(0))) {
        correlate_line(src, dst, &kernel);
    }
    smoothed
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_kernel_radius_and_normalisation() {
        let kernel = gaussian_kernel(1.5, 4.0);
        assert_eq!(kernel.len(), 13);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        // Symmetric, peaked at the centre
        assert!((kernel[0] - kernel[12]).abs() < 1e-15);
        assert!(kernel[6] > kernel[5]);
    }

    #[test]
    fn test_reflect_index() {
        // d c b a | a b c d | d c b a
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        assert_eq!(reflect_index(8, 4), 0);
        assert_eq!(reflect_index(7, 1), 0);
    }

    #[test]
    fn test_constant_grid_is_unchanged() {
        let grid = Array2::from_elem((5, 7), 0.25);
        let smoothed = gaussian_smooth(&grid, 1.5, 4.0);
        for &v in &smoothed {
            assert!((v - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn test_mass_is_preserved_away_from_edges() {
        let mut grid = Array2::zeros((31, 31));
        grid[[15, 15]] = 1.0;
        let smoothed = gaussian_smooth(&grid, 1.5, 4.0);
        assert!((smoothed.sum() - 1.0).abs() < 1e-9);
        assert!(smoothed[[15, 15]] < 1.0);
        assert!(smoothed[[15, 16]] > 0.0);
    }

    #[test]
    fn test_range_preserved() {
        let grid = array![[0.0, 1.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.5, 0.0]];
        let smoothed = gaussian_smooth(&grid, 1.5, 4.0);
        for &v in &smoothed {
            assert!(v > -1e-12 && v < 1.0 + 1e-12, "out of range: {v}");
        }
    }
}
