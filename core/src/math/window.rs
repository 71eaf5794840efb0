//! Symmetric window functions used by the range and vital-sign spectra and by
//! the FIR designer.

use std::f64::consts::PI;

/// 4-term Blackman-Harris window (-92 dB sidelobes).
pub fn blackman_harris(length: usize) -> Vec<f64> {
    if length == 0 {
        return Vec::new();
    }
    if length == 1 {
        return vec![1.0];
    }

    let n_minus_1 = (length - 1) as f64;
    let (a0, a1, a2, a3) = (0.35875, 0.48829, 0.14128, 0.01168);

    (0..length)
        .map(|n| {
            let x = 2.0 * PI * n as f64 / n_minus_1;
            a0 - a1 * x.cos() + a2 * (2.0 * x).cos() - a3 * (3.0 * x).cos()
        })
        .collect()
}

pub fn hamming(length: usize) -> Vec<f64> {
    if length == 0 {
        return Vec::new();
    }
    if length == 1 {
        return vec![1.0];
    }

    let n_minus_1 = (length - 1) as f64;
    (0..length)
        .map(|n| 0.54 - 0.46 * (2.0 * PI * n as f64 / n_minus_1).cos())
        .collect()
}
