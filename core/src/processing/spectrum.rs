use crate::math::fft::FftHelper;
use crate::math::stats::StatsHelper;
use crate::math::window::blackman_harris;
use crate::prelude::{ProcessingStage, StageError, StageResult, VitalConfig};
use crate::telemetry::log::LogManager;
use num_complex::Complex64;

/// Trailing windows of the four slow-time signals analysed each pass.
#[derive(Debug, Clone, Default)]
pub struct SpectrumInput {
    pub raw_iq: Vec<Complex64>,
    pub unwrapped_phase: Vec<f64>,
    pub breathing: Vec<f64>,
    pub heart: Vec<f64>,
}

/// Magnitude spectra, each `fft_size_vital` bins long.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VitalSpectra {
    pub raw_iq: Vec<f64>,
    pub unwrapped_phase: Vec<f64>,
    pub breathing: Vec<f64>,
    pub heart: Vec<f64>,
}

/// Windowed, zero-padded magnitude spectra recomputed in full every pass.
pub struct SpectralEstimator {
    fft: Option<FftHelper>,
    window: Vec<f64>,
    epsilon: f64,
    logger: LogManager,
}

impl SpectralEstimator {
    pub fn new() -> Self {
        Self {
            fft: None,
            window: Vec::new(),
            epsilon: 0.0,
            logger: LogManager::new("spectrum"),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft.as_ref().map(FftHelper::size).unwrap_or(0)
    }

    fn check_len(&self, name: &str, len: usize) -> StageResult<()> {
        if len != self.window.len() {
            return Err(StageError::InvalidInput(format!(
                "{} window has {} samples, expected {}",
                name,
                len,
                self.window.len()
            )));
        }
        Ok(())
    }

    fn magnitude(&mut self, windowed: Vec<Complex64>) -> StageResult<Vec<f64>> {
        let fft = self
            .fft
            .as_mut()
            .ok_or_else(|| StageError::Internal("FFT not configured".into()))?;
        let scale = 1.0 / fft.size() as f64;
        let epsilon = self.epsilon;
        Ok(fft
            .forward_complex(&windowed)
            .iter()
            .map(|bin| bin.norm() * scale + epsilon)
            .collect())
    }

    fn real_spectrum(&mut self, name: &str, signal: &[f64]) -> StageResult<Vec<f64>> {
        self.check_len(name, signal.len())?;
        let windowed = signal
            .iter()
            .zip(&self.window)
            .map(|(&x, &w)| Complex64::new(x * w, 0.0))
            .collect();
        self.magnitude(windowed)
    }
}

impl Default for SpectralEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for SpectralEstimator {
    type Input = SpectrumInput;
    type Output = VitalSpectra;

    fn initialize(&mut self, config: &VitalConfig) -> StageResult<()> {
        self.fft = Some(FftHelper::new(config.fft_size_vital()));
        self.window = blackman_harris(config.processing_samples());
        self.epsilon = config.processing.epsilon;
        Ok(())
    }

    fn execute(&mut self, input: SpectrumInput) -> StageResult<VitalSpectra> {
        self.check_len("raw IQ", input.raw_iq.len())?;
        let windowed_iq = input
            .raw_iq
            .iter()
            .zip(&self.window)
            .map(|(&x, &w)| x * w)
            .collect();

        let spectra = VitalSpectra {
            raw_iq: self.magnitude(windowed_iq)?,
            unwrapped_phase: self.real_spectrum("unwrapped phase", &input.unwrapped_phase)?,
            breathing: self.real_spectrum("breathing", &input.breathing)?,
            heart: self.real_spectrum("heart", &input.heart)?,
        };

        self.logger.record(&format!(
            "breathing spectrum RMS {:.3e}",
            StatsHelper::rms(&spectra.breathing)
        ));
        Ok(spectra)
    }

    fn cleanup(&mut self) {
        self.fft = None;
        self.window.clear();
    }
}
