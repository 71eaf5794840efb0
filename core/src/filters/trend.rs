//! Hodrick-Prescott trend/cycle decomposition.

use crate::math::MatrixHelper;
use crate::prelude::StageResult;

/// Slow trend and oscillatory residual of a signal; `trend + cycle == input`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendCycle {
    pub trend: Vec<f64>,
    pub cycle: Vec<f64>,
}

/// Minimises `Σ(y - τ)² + λ Σ(Δ²τ)²`, i.e. solves `(I + λ DᵀD) τ = y` where
/// `D` is the second-difference operator.
pub fn hp_filter(data: &[f64], lambda: f64) -> StageResult<TrendCycle> {
    let n = data.len();
    if n < 3 || lambda <= 0.0 {
        return Ok(TrendCycle {
            trend: data.to_vec(),
            cycle: vec![0.0; n],
        });
    }

    let mut diag = vec![1.0; n];
    let mut upper1 = vec![0.0; n - 1];
    let mut upper2 = vec![0.0; n - 2];
    let stencil = [1.0, -2.0, 1.0];
    for row in 0..n - 2 {
        for a in 0..3 {
            diag[row + a] += lambda * stencil[a] * stencil[a];
        }
        for a in 0..2 {
            upper1[row + a] += lambda * stencil[a] * stencil[a + 1];
        }
        upper2[row] += lambda * stencil[0] * stencil[2];
    }

    let trend = MatrixHelper::solve_symmetric_pentadiagonal(&diag, &upper1, &upper2, data)?;
    let cycle = data.iter().zip(&trend).map(|(y, t)| y - t).collect();
    Ok(TrendCycle { trend, cycle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn linear_signal_is_pure_trend() {
        let data: Vec<f64> = (0..50).map(|i| 0.3 * i as f64 - 2.0).collect();
        let split = hp_filter(&data, 60.0).unwrap();
        assert!(split.cycle.iter().all(|c| c.abs() < 1e-8));
    }

    #[test]
    fn fast_oscillation_lands_in_cycle() {
        let fs = 20.0;
        let data: Vec<f64> = (0..400)
            .map(|i| {
                let t = i as f64 / fs;
                0.05 * t + 0.1 * (2.0 * PI * 1.2 * t).sin()
            })
            .collect();
        let split = hp_filter(&data, 3.0 * fs).unwrap();
        let reconstructed: Vec<f64> = split
            .trend
            .iter()
            .zip(&split.cycle)
            .map(|(t, c)| t + c)
            .collect();
        for (a, b) in reconstructed.iter().zip(&data) {
            assert!((a - b).abs() < 1e-12);
        }
        // away from the edges the trend should be close to the ramp
        for i in 50..350 {
            let ramp = 0.05 * i as f64 / fs;
            assert!((split.trend[i] - ramp).abs() < 0.06);
        }
    }
}
