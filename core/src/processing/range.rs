use crate::interface::RadarFrame;
use crate::math::fft::FftHelper;
use crate::math::window::blackman_harris;
use crate::prelude::{
    ProcessingStage, RadarConfig, StageError, StageResult, VitalConfig,
};
use crate::telemetry::log::LogManager;
use num_complex::Complex64;
use rustfft::num_traits::Zero;

/// Antenna-combined complex range profile of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeProfile {
    pub bins: Vec<Complex64>,
    pub timestamp: f64,
}

impl RangeProfile {
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn magnitudes(&self) -> Vec<f64> {
        self.bins.iter().map(|c| c.norm()).collect()
    }
}

/// Range-FFT front end: DC removal, Blackman-Harris window, 2x zero-padded
/// FFT per chirp, coherent sum over chirps and mean over antennas.
pub struct RangeStage {
    config: Option<RadarConfig>,
    fft: Option<FftHelper>,
    window: Vec<f64>,
    logger: LogManager,
}

impl RangeStage {
    pub fn new() -> Self {
        Self {
            config: None,
            fft: None,
            window: Vec::new(),
            logger: LogManager::new("range"),
        }
    }
}

impl Default for RangeStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for RangeStage {
    type Input = RadarFrame;
    type Output = RangeProfile;

    fn initialize(&mut self, config: &VitalConfig) -> StageResult<()> {
        let radar = config.radar.clone();
        self.fft = Some(FftHelper::new(radar.fft_size_range_profile()));
        self.window = blackman_harris(radar.samples_per_chirp);
        self.config = Some(radar);
        Ok(())
    }

    fn execute(&mut self, input: RadarFrame) -> StageResult<RangeProfile> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| StageError::Internal("stage not initialized".into()))?;
        let fft = self
            .fft
            .as_mut()
            .ok_or_else(|| StageError::Internal("FFT not configured".into()))?;

        let expected = (
            config.num_rx_antennas,
            config.chirps_per_frame,
            config.samples_per_chirp,
        );
        if input.shape() != expected {
            return Err(StageError::InvalidInput(format!(
                "frame shape {:?} does not match session shape {:?}",
                input.shape(),
                expected
            )));
        }

        let samples_per_chirp = config.samples_per_chirp as f64;
        let scale = 2.0 / samples_per_chirp;
        let range_bins = config.range_bins();
        let mut combined = vec![Complex64::zero(); range_bins];
        let mut chirp_buffer = Vec::with_capacity(config.samples_per_chirp);

        for antenna in input.samples.outer_iter() {
            for chirp in antenna.outer_iter() {
                let mean = chirp.sum() / samples_per_chirp;
                chirp_buffer.clear();
                chirp_buffer.extend(
                    chirp
                        .iter()
                        .zip(self.window.iter())
                        .map(|(&sample, &w)| (sample - mean) * w),
                );
                let spectrum = fft.forward_complex(&chirp_buffer);
                for (acc, bin) in combined.iter_mut().zip(spectrum.iter().take(range_bins)) {
                    *acc += bin * scale;
                }
            }
        }

        let antennas = config.num_rx_antennas as f64;
        combined.iter_mut().for_each(|bin| *bin /= antennas);
        self.logger
            .record(&format!("range profile at t={:.3}s", input.timestamp));

        Ok(RangeProfile {
            bins: combined,
            timestamp: input.timestamp,
        })
    }

    fn cleanup(&mut self) {
        self.config = None;
        self.fft = None;
        self.window.clear();
    }
}
