use crate::prelude::{StageError, StageResult};

pub struct MatrixHelper;

impl MatrixHelper {
    /// Solve `A x = rhs` for a symmetric positive-definite pentadiagonal `A`
    /// given by its main diagonal and its first and second super-diagonals.
    ///
    /// Uses a banded Cholesky factorisation, O(n) time and memory.
    pub fn solve_symmetric_pentadiagonal(
        diag: &[f64],
        upper1: &[f64],
        upper2: &[f64],
        rhs: &[f64],
    ) -> StageResult<Vec<f64>> {
        let n = diag.len();
        if rhs.len() != n
            || upper1.len() != n.saturating_sub(1)
            || upper2.len() != n.saturating_sub(2)
        {
            return Err(StageError::InvalidInput(
                "pentadiagonal band lengths do not match".into(),
            ));
        }

        // L has unit bandwidth 2: d on the diagonal, l1/l2 below it.
        let mut d = vec![0.0; n];
        let mut l1 = vec![0.0; n];
        let mut l2 = vec![0.0; n];
        for i in 0..n {
            if i >= 2 {
                l2[i] = upper2[i - 2] / d[i - 2];
            }
            if i >= 1 {
                let coupling = if i >= 2 { l2[i] * l1[i - 1] } else { 0.0 };
                l1[i] = (upper1[i - 1] - coupling) / d[i - 1];
            }
            let pivot = diag[i] - l1[i] * l1[i] - l2[i] * l2[i];
            if pivot <= 0.0 || !pivot.is_finite() {
                return Err(StageError::Internal(format!(
                    "matrix not positive definite at row {}",
                    i
                )));
            }
            d[i] = pivot.sqrt();
        }

        let mut z = vec![0.0; n];
        for i in 0..n {
            let mut acc = rhs[i];
            if i >= 1 {
                acc -= l1[i] * z[i - 1];
            }
            if i >= 2 {
                acc -= l2[i] * z[i - 2];
            }
            z[i] = acc / d[i];
        }

        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let mut acc = z[i];
            if i + 1 < n {
                acc -= l1[i + 1] * x[i + 1];
            }
            if i + 2 < n {
                acc -= l2[i + 2] * x[i + 2];
            }
            x[i] = acc / d[i];
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    #[test]
    fn pentadiagonal_solution_satisfies_dense_system() {
        let n = 7;
        let diag = vec![6.0; n];
        let upper1 = vec![-2.0; n - 1];
        let upper2 = vec![0.5; n - 2];
        let rhs: Vec<f64> = (0..n).map(|i| (i as f64).sin() + 1.0).collect();

        let x = MatrixHelper::solve_symmetric_pentadiagonal(&diag, &upper1, &upper2, &rhs)
            .unwrap();

        let mut dense = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            dense[[i, i]] = diag[i];
            if i + 1 < n {
                dense[[i, i + 1]] = upper1[i];
                dense[[i + 1, i]] = upper1[i];
            }
            if i + 2 < n {
                dense[[i, i + 2]] = upper2[i];
                dense[[i + 2, i]] = upper2[i];
            }
        }
        let product = dense.dot(&Array1::from(x));
        for (lhs, rhs) in product.iter().zip(rhs.iter()) {
            assert!((lhs - rhs).abs() < 1e-9);
        }
    }

    #[test]
    fn mismatched_bands_are_rejected() {
        let result = MatrixHelper::solve_symmetric_pentadiagonal(&[1.0; 3], &[0.0; 1], &[], &[1.0; 3]);
        assert!(result.is_err());
    }
}
