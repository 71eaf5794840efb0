use serde::{Deserialize, Serialize};

/// Speed of light used for range-resolution calculations (m/s).
pub const SPEED_OF_LIGHT: f64 = 3e8;

/// Radar front-end parameters fixed for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    pub num_rx_antennas: usize,
    pub chirps_per_frame: usize,
    pub samples_per_chirp: usize,
    /// Frame repetition rate; one slow-time sample is produced per frame.
    pub frame_rate_hz: usize,
    pub chirp_bandwidth_hz: f64,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            num_rx_antennas: 3,
            chirps_per_frame: 1,
            samples_per_chirp: 64,
            frame_rate_hz: 20,
            chirp_bandwidth_hz: 5.5e9,
        }
    }
}

impl RadarConfig {
    pub fn fft_size_range_profile(&self) -> usize {
        2 * self.samples_per_chirp
    }

    /// Number of bins kept in a range profile (half of the zero-padded FFT).
    pub fn range_bins(&self) -> usize {
        self.fft_size_range_profile() / 2
    }

    pub fn range_resolution_m(&self) -> f64 {
        SPEED_OF_LIGHT / (2.0 * self.chirp_bandwidth_hz)
    }

    pub fn max_range_m(&self) -> f64 {
        self.range_resolution_m() * self.samples_per_chirp as f64 / 2.0
    }

    /// Maps a distance to the range-profile bin that covers it.
    pub fn range_to_bin(&self, range_m: f64) -> usize {
        let max_range = self.max_range_m();
        if max_range <= 0.0 || range_m <= 0.0 {
            return 0;
        }
        ((range_m / max_range) * self.range_bins() as f64).floor() as usize
    }

    pub fn bin_to_range(&self, bin: usize) -> f64 {
        bin as f64 * self.max_range_m() / self.range_bins().max(1) as f64
    }
}

/// Operator-selected distance window searched for the strongest reflector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeGate {
    pub start_m: f64,
    pub stop_m: f64,
}

impl Default for RangeGate {
    fn default() -> Self {
        Self {
            start_m: 0.5,
            stop_m: 0.6,
        }
    }
}

impl RangeGate {
    pub fn validate(&self, radar: &RadarConfig) -> StageResult<()> {
        let max_range = radar.max_range_m();
        if !(self.start_m.is_finite() && self.stop_m.is_finite()) {
            return Err(StageError::InvalidConfig("range gate must be finite".into()));
        }
        if self.start_m < 0.0 || self.stop_m <= self.start_m || self.stop_m > max_range {
            return Err(StageError::InvalidConfig(format!(
                "range gate [{:.3}, {:.3}] m outside [0, {:.3}] m or inverted",
                self.start_m, self.stop_m, max_range
            )));
        }
        Ok(())
    }

    /// Gate bounds as a half-open bin interval, always at least one bin wide.
    pub fn bins(&self, radar: &RadarConfig) -> (usize, usize) {
        let limit = radar.range_bins();
        let start = radar.range_to_bin(self.start_m).min(limit.saturating_sub(1));
        let stop = radar.range_to_bin(self.stop_m).clamp(start + 1, limit);
        (start, stop)
    }
}

/// Frequency band in Hz, used both for FIR design and spectral search bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub low_hz: f64,
    pub high_hz: f64,
}

impl Band {
    pub fn new(low_hz: f64, high_hz: f64) -> Self {
        Self { low_hz, high_hz }
    }

    pub fn validate(&self, sample_rate: f64) -> StageResult<()> {
        let nyquist = sample_rate / 2.0;
        if !(self.low_hz.is_finite() && self.high_hz.is_finite()) {
            return Err(StageError::InvalidConfig("band edges must be finite".into()));
        }
        if self.low_hz <= 0.0 || self.high_hz <= self.low_hz || self.high_hz >= nyquist {
            return Err(StageError::InvalidConfig(format!(
                "band [{:.3}, {:.3}] Hz outside (0, {:.3}) Hz or inverted",
                self.low_hz, self.high_hz, nyquist
            )));
        }
        Ok(())
    }

    pub fn center_hz(&self) -> f64 {
        0.5 * (self.low_hz + self.high_hz)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
    pub breathing: Band,
    pub heart: Band,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            breathing: Band::new(0.15, 0.6),
            heart: Band::new(0.85, 2.4),
        }
    }
}

/// Window lengths, smoothing parameters and estimator tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub processing_window_s: usize,
    pub buffer_s: usize,
    pub estimation_s: usize,
    pub range_gate: RangeGate,
    /// Extract the tracked bin (true) or the complex mean across the gate.
    pub use_tracked_bin: bool,
    pub tracker_smoothing_s: usize,
    /// Spectral zero-padding factor relative to the processing window.
    pub spectrum_padding: usize,
    pub peak_distance_hz: f64,
    /// Empirical per-minute offset added to every rate estimate.
    pub rate_bias_bpm: f64,
    pub breathing_savgol_window: usize,
    pub savgol_order: usize,
    pub breathing_box_size: usize,
    /// Trend smoothing parameter expressed per Hz of sample rate.
    pub heart_trend_lambda_per_hz: f64,
    pub epsilon: f64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            processing_window_s: 20,
            buffer_s: 100,
            estimation_s: 5,
            range_gate: RangeGate::default(),
            use_tracked_bin: true,
            tracker_smoothing_s: 2,
            spectrum_padding: 4,
            peak_distance_hz: 0.01,
            rate_bias_bpm: -2.0,
            breathing_savgol_window: 51,
            savgol_order: 3,
            breathing_box_size: 5,
            heart_trend_lambda_per_hz: 3.0,
            epsilon: 1e-8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreathCycleConfig {
    /// Run detection on every n-th processing pass.
    pub decimation: usize,
    pub window_s: usize,
    pub savgol_window: usize,
    pub savgol_order: usize,
    pub median_kernel: usize,
    pub threshold_fraction: f64,
    pub prominence_fraction: f64,
    pub lower_percentile: f64,
    pub upper_percentile: f64,
}

impl Default for BreathCycleConfig {
    fn default() -> Self {
        Self {
            decimation: 5,
            window_s: 10,
            savgol_window: 31,
            savgol_order: 3,
            median_kernel: 5,
            threshold_fraction: 0.2,
            prominence_fraction: 0.5,
            lower_percentile: 5.0,
            upper_percentile: 95.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub window_s: usize,
    pub min_variance: f64,
    pub min_envelope: f64,
    pub amplitude_floor: f64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            window_s: 5,
            min_variance: 1e-4,
            min_envelope: 1e-3,
            amplitude_floor: 1e-4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub queue_capacity: usize,
    /// Upper bound on frames folded into one processing pass.
    pub max_batch: usize,
    pub publish_interval_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            max_batch: 8,
            publish_interval_ms: 25,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalConfig {
    pub radar: RadarConfig,
    pub processing: ProcessingConfig,
    pub bands: BandConfig,
    pub breath_cycle: BreathCycleConfig,
    pub presence: PresenceConfig,
    pub runtime: RuntimeConfig,
}

impl VitalConfig {
    /// Slow-time sample rate: one sample per frame.
    pub fn sample_rate(&self) -> usize {
        self.radar.frame_rate_hz
    }

    pub fn buffer_samples(&self) -> usize {
        self.processing.buffer_s * self.sample_rate()
    }

    pub fn processing_samples(&self) -> usize {
        self.processing.processing_window_s * self.sample_rate()
    }

    pub fn fft_size_vital(&self) -> usize {
        self.processing.spectrum_padding * self.processing_samples()
    }

    pub fn estimation_samples(&self) -> usize {
        self.processing.estimation_s * self.sample_rate()
    }

    pub fn filter_taps(&self) -> usize {
        self.sample_rate() + 1
    }

    pub fn validate(&self) -> StageResult<()> {
        let radar = &self.radar;
        if radar.num_rx_antennas == 0 || radar.chirps_per_frame == 0 {
            return Err(StageError::InvalidConfig(
                "antenna and chirp counts must be positive".into(),
            ));
        }
        if radar.samples_per_chirp < 2 {
            return Err(StageError::InvalidConfig(
                "samples_per_chirp must be at least 2".into(),
            ));
        }
        if radar.frame_rate_hz == 0 || radar.chirp_bandwidth_hz <= 0.0 {
            return Err(StageError::InvalidConfig(
                "frame rate and chirp bandwidth must be positive".into(),
            ));
        }

        let buffer = self.buffer_samples();
        let window = self.processing_samples();
        if window < 8 || window > buffer {
            return Err(StageError::InvalidConfig(format!(
                "processing window of {} samples must lie within [8, {}]",
                window, buffer
            )));
        }
        if self.processing.spectrum_padding == 0 {
            return Err(StageError::InvalidConfig(
                "spectrum_padding must be positive".into(),
            ));
        }
        let estimation = self.estimation_samples();
        if estimation == 0 || estimation > buffer {
            return Err(StageError::InvalidConfig(format!(
                "estimation window of {} samples must lie within [1, {}]",
                estimation, buffer
            )));
        }
        let breath_window = self.breath_cycle.window_s * self.sample_rate();
        let presence_window = self.presence.window_s * self.sample_rate();
        if breath_window > buffer || presence_window < 2 || presence_window > buffer {
            return Err(StageError::InvalidConfig(
                "breath-cycle and presence windows must fit in the buffer".into(),
            ));
        }
        if self.breath_cycle.decimation == 0 || self.processing.tracker_smoothing_s == 0 {
            return Err(StageError::InvalidConfig(
                "decimation and tracker smoothing must be positive".into(),
            ));
        }

        let fs = self.sample_rate() as f64;
        self.bands.breathing.validate(fs)?;
        self.bands.heart.validate(fs)?;
        self.processing.range_gate.validate(radar)?;
        Ok(())
    }
}

/// Live configuration change, applied at the start of the next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigUpdate {
    RangeGate(RangeGate),
    BreathingBand(Band),
    HeartBand(Band),
}

impl ConfigUpdate {
    /// Checks the change against the session's fixed radar parameters.
    pub fn validate(&self, config: &VitalConfig) -> StageResult<()> {
        match self {
            ConfigUpdate::RangeGate(gate) => gate.validate(&config.radar),
            ConfigUpdate::BreathingBand(band) | ConfigUpdate::HeartBand(band) => {
                band.validate(config.sample_rate() as f64)
            }
        }
    }
}

/// Common error type for stage execution.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type StageResult<T> = Result<T, StageError>;

/// Trait describing stateful signal-processing stages.
pub trait ProcessingStage {
    type Input;
    type Output;

    fn initialize(&mut self, config: &VitalConfig) -> StageResult<()>;
    fn execute(&mut self, input: Self::Input) -> StageResult<Self::Output>;
    fn cleanup(&mut self);
}
