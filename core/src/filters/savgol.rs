//! Savitzky-Golay polynomial smoothing.
//!
//! Interior samples use the centred least-squares kernel; the first and last
//! `window / 2` samples are taken from a polynomial fitted to the first and
//! last full windows, so the newest sample is smoothed without look-ahead.

use crate::prelude::{StageError, StageResult};

#[derive(Debug, Clone)]
pub struct SavitzkyGolay {
    window: usize,
    order: usize,
    /// Rows: polynomial coefficient k; columns: window position.
    projection: Vec<Vec<f64>>,
}

impl SavitzkyGolay {
    pub fn new(window: usize, order: usize) -> StageResult<Self> {
        if window % 2 == 0 || window < 3 {
            return Err(StageError::InvalidConfig(format!(
                "Savitzky-Golay window must be odd and at least 3, got {}",
                window
            )));
        }
        if order >= window {
            return Err(StageError::InvalidConfig(format!(
                "polynomial order {} >= window {}",
                order, window
            )));
        }

        let half = (window / 2) as f64;
        let p = order + 1;
        // Positions normalised to [-1, 1] keep the normal equations well conditioned.
        let vander: Vec<Vec<f64>> = (0..window)
            .map(|i| {
                let x = (i as f64 - half) / half;
                (0..p).map(|k| x.powi(k as i32)).collect()
            })
            .collect();

        let mut normal = vec![vec![0.0; p]; p];
        for (r, row) in normal.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = vander.iter().map(|v| v[r] * v[c]).sum();
            }
        }
        let inverse = invert(normal)?;

        let projection = (0..p)
            .map(|k| {
                (0..window)
                    .map(|i| (0..p).map(|j| inverse[k][j] * vander[i][j]).sum())
                    .collect()
            })
            .collect();

        Ok(Self {
            window,
            order,
            projection,
        })
    }

    /// Largest odd window not above `max_window` that fits `len` samples with
    /// two to spare; `None` when that leaves no more than five points.
    pub fn fitted_window(max_window: usize, len: usize) -> Option<usize> {
        let mut window = max_window.min(len.saturating_sub(2));
        if window % 2 == 0 {
            window = window.saturating_sub(1);
        }
        (window > 5).then_some(window)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Kernel that evaluates the local fit at `offset` samples from the window centre.
    fn kernel(&self, offset: isize) -> Vec<f64> {
        let half = (self.window / 2) as f64;
        let t = offset as f64 / half;
        (0..self.window)
            .map(|i| {
                self.projection
                    .iter()
                    .enumerate()
                    .map(|(k, row)| row[i] * t.powi(k as i32))
                    .sum()
            })
            .collect()
    }

    /// Smooth `data`; inputs shorter than the window are returned unchanged.
    pub fn smooth(&self, data: &[f64]) -> Vec<f64> {
        let n = data.len();
        let w = self.window;
        if n < w {
            return data.to_vec();
        }
        let half = w / 2;
        let dot = |kernel: &[f64], segment: &[f64]| -> f64 {
            kernel.iter().zip(segment).map(|(c, x)| c * x).sum()
        };

        let mut output = vec![0.0; n];
        let centre = self.kernel(0);
        for i in half..n - half {
            output[i] = dot(&centre, &data[i - half..i + half + 1]);
        }

        let head = &data[..w];
        let tail = &data[n - w..];
        for i in 0..half {
            output[i] = dot(&self.kernel(i as isize - half as isize), head);
            let offset = (i + 1) as isize;
            output[n - half + i] = dot(&self.kernel(offset), tail);
        }
        output
    }
}

/// Gauss-Jordan inversion with partial pivoting.
fn invert(mut matrix: Vec<Vec<f64>>) -> StageResult<Vec<Vec<f64>>> {
    let p = matrix.len();
    for (i, row) in matrix.iter_mut().enumerate() {
        row.extend((0..p).map(|j| if i == j { 1.0 } else { 0.0 }));
    }

    for col in 0..p {
        let pivot_row = (col..p)
            .max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))
            .unwrap_or(col);
        matrix.swap(col, pivot_row);

        let pivot = matrix[col][col];
        if pivot.abs() < 1e-12 {
            return Err(StageError::Internal("singular normal matrix".into()));
        }
        matrix[col].iter_mut().for_each(|v| *v /= pivot);

        for row in 0..p {
            if row != col {
                let factor = matrix[row][col];
                if factor != 0.0 {
                    for j in 0..2 * p {
                        matrix[row][j] -= factor * matrix[col][j];
                    }
                }
            }
        }
    }

    Ok(matrix.into_iter().map(|row| row[p..].to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cubic_is_reproduced_exactly_including_edges() {
        let sg = SavitzkyGolay::new(7, 3).unwrap();
        let data: Vec<f64> = (0..20)
            .map(|i| {
                let x = i as f64 * 0.1;
                0.5 * x * x * x - x + 2.0
            })
            .collect();
        let smoothed = sg.smooth(&data);
        for (a, b) in smoothed.iter().zip(data.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn classic_five_point_quadratic_kernel() {
        let sg = SavitzkyGolay::new(5, 2).unwrap();
        let kernel = sg.kernel(0);
        let expected = [-3.0, 12.0, 17.0, 12.0, -3.0].map(|v| v / 35.0);
        for (a, b) in kernel.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn fitted_window_follows_length_limits() {
        assert_eq!(SavitzkyGolay::fitted_window(51, 400), Some(51));
        assert_eq!(SavitzkyGolay::fitted_window(31, 20), Some(17));
        assert_eq!(SavitzkyGolay::fitted_window(31, 8), None);
    }

    #[test]
    fn even_window_is_rejected() {
        assert!(SavitzkyGolay::new(6, 2).is_err());
        assert!(SavitzkyGolay::new(5, 5).is_err());
    }
}
