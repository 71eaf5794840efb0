use num_complex::Complex64;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::sync::Arc;

/// Helper that wraps the `rustfft` planner for reuse.
///
/// Inputs shorter than the planned size are zero-padded, longer inputs are
/// truncated.
pub struct FftHelper {
    fft: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex64>,
    size: usize,
}

impl FftHelper {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex64::zero(); fft.get_inplace_scratch_len()];
        Self { fft, scratch, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn forward(&mut self, input: &[f64]) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = input
            .iter()
            .take(self.size)
            .map(|&value| Complex64::new(value, 0.0))
            .collect();
        buffer.resize(self.size, Complex64::zero());
        self.fft.process_with_scratch(&mut buffer, &mut self.scratch);
        buffer
    }

    pub fn forward_complex(&mut self, input: &[Complex64]) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = input.iter().take(self.size).copied().collect();
        buffer.resize(self.size, Complex64::zero());
        self.fft.process_with_scratch(&mut buffer, &mut self.scratch);
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fft_helper_returns_same_length() {
        let mut helper = FftHelper::new(4);
        let output = helper.forward(&[1.0, 0.0, -1.0, 0.0]);
        assert_eq!(output.len(), 4);
    }

    #[test]
    fn fft_helper_zero_pads_short_input() {
        let mut helper = FftHelper::new(8);
        let output = helper.forward_complex(&[Complex64::new(1.0, 0.0)]);
        assert_eq!(output.len(), 8);
        for bin in output {
            assert!((bin.re - 1.0).abs() < 1e-12);
            assert!(bin.im.abs() < 1e-12);
        }
    }
}
