//! Windowed-sinc band-pass FIR design and causal filtering.

use crate::math::window::hamming;
use crate::prelude::{Band, StageError, StageResult};
use std::f64::consts::PI;

/// Band-pass FIR filter with the DC term excluded from the pass-band.
#[derive(Debug, Clone, PartialEq)]
pub struct FirFilter {
    taps: Vec<f64>,
    band: Band,
}

impl FirFilter {
    /// Design a Hamming-windowed band-pass filter with `num_taps` coefficients,
    /// scaled to unit gain at the centre of the pass-band.
    pub fn bandpass(band: Band, sample_rate: f64, num_taps: usize) -> StageResult<Self> {
        band.validate(sample_rate)?;
        if num_taps == 0 {
            return Err(StageError::InvalidConfig("FIR needs at least one tap".into()));
        }

        let nyquist = sample_rate / 2.0;
        let low = band.low_hz / nyquist;
        let high = band.high_hz / nyquist;
        let alpha = 0.5 * (num_taps - 1) as f64;
        let window = hamming(num_taps);

        let mut taps: Vec<f64> = (0..num_taps)
            .map(|n| {
                let m = n as f64 - alpha;
                (high * sinc(high * m) - low * sinc(low * m)) * window[n]
            })
            .collect();

        let center = 0.5 * (low + high);
        let gain: f64 = taps
            .iter()
            .enumerate()
            .map(|(n, &h)| h * (PI * (n as f64 - alpha) * center).cos())
            .sum();
        if gain.abs() < f64::EPSILON {
            return Err(StageError::Internal(
                "band-pass design has no gain at its centre".into(),
            ));
        }
        taps.iter_mut().for_each(|h| *h /= gain);

        Ok(Self { taps, band })
    }

    pub fn taps(&self) -> &[f64] {
        &self.taps
    }

    pub fn band(&self) -> Band {
        self.band
    }

    /// Causal filtering with zero initial state; output length equals input length.
    pub fn apply(&self, input: &[f64]) -> Vec<f64> {
        (0..input.len())
            .map(|n| {
                self.taps
                    .iter()
                    .take(n + 1)
                    .enumerate()
                    .map(|(k, &b)| b * input[n - k])
                    .sum()
            })
            .collect()
    }
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(taps: &[f64], freq_hz: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * freq_hz / sample_rate;
        let (re, im) = taps.iter().enumerate().fold((0.0, 0.0), |(re, im), (n, &h)| {
            (re + h * (w * n as f64).cos(), im - h * (w * n as f64).sin())
        });
        (re * re + im * im).sqrt()
    }

    #[test]
    fn bandpass_has_unit_gain_at_band_centre() {
        let filter = FirFilter::bandpass(Band::new(0.85, 2.4), 20.0, 21).unwrap();
        assert_eq!(filter.taps().len(), 21);
        assert!((response(filter.taps(), 1.625, 20.0) - 1.0).abs() < 1e-9);
        assert!(response(filter.taps(), 9.0, 20.0) < 0.05);
    }

    #[test]
    fn taps_are_symmetric() {
        let filter = FirFilter::bandpass(Band::new(0.15, 0.6), 20.0, 21).unwrap();
        let taps = filter.taps();
        for i in 0..taps.len() {
            assert!((taps[i] - taps[taps.len() - 1 - i]).abs() < 1e-12);
        }
    }

    #[test]
    fn invalid_band_is_rejected() {
        assert!(FirFilter::bandpass(Band::new(2.0, 1.0), 20.0, 21).is_err());
    }

    #[test]
    fn apply_is_causal_convolution() {
        let filter = FirFilter {
            taps: vec![0.5, 0.5],
            band: Band::new(0.1, 0.2),
        };
        assert_eq!(filter.apply(&[2.0, 4.0, 6.0]), vec![1.0, 3.0, 5.0]);
    }
}
