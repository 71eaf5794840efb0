use crate::prelude::{StageError, StageResult};
use crate::telemetry::metrics::MetricsSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreathPhase {
    Inhale,
    Exhale,
}

/// Inhalation peak or exhalation valley of the breathing waveform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreathCycleEvent {
    pub timestamp: f64,
    pub amplitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreathCycles {
    pub inhalations: Vec<BreathCycleEvent>,
    pub exhalations: Vec<BreathCycleEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresenceState {
    pub present: bool,
    /// Weaker of variance and envelope relative to their thresholds; above 1 when present.
    pub confidence: f64,
    pub variance: f64,
    pub mean_envelope: f64,
    /// Breathing amplitude relative to the recent baseline, roughly in [-1, 1].
    pub normalized_amplitude: f64,
    /// Amplitude mapped onto [0.1, 1.0] for display and telemetry scaling.
    pub amplitude_ratio: f64,
    pub phase: Option<BreathPhase>,
}

impl Default for PresenceState {
    fn default() -> Self {
        Self {
            present: false,
            confidence: 0.0,
            variance: 0.0,
            mean_envelope: 0.0,
            normalized_amplitude: 0.0,
            amplitude_ratio: TelemetryFrame::MIN_RATIO,
            phase: None,
        }
    }
}

/// Scalars handed to the telemetry collaborator once per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    pub breathing_hz: f64,
    /// Heart frequency halved, matching the receiving side's scale.
    pub heart_hz: f64,
    pub x_ratio: f64,
    pub y_ratio: f64,
    pub presence: u8,
}

impl TelemetryFrame {
    pub const MIN_RATIO: f64 = 0.1;

    pub fn absent() -> Self {
        Self {
            breathing_hz: 0.0,
            heart_hz: 0.0,
            x_ratio: Self::MIN_RATIO,
            y_ratio: Self::MIN_RATIO,
            presence: 0,
        }
    }
}

impl Default for TelemetryFrame {
    fn default() -> Self {
        Self::absent()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeView {
    pub magnitudes: Vec<f64>,
    pub tracked_bin: usize,
    pub tracked_range_m: f64,
    pub gate_bins: (usize, usize),
}

/// The seven slow-time traces plus their shared time axis, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlowTimeTraces {
    pub timestamps: Vec<f64>,
    pub in_phase: Vec<f64>,
    pub quadrature: Vec<f64>,
    pub envelope: Vec<f64>,
    pub wrapped_phase: Vec<f64>,
    pub unwrapped_phase: Vec<f64>,
    pub breathing: Vec<f64>,
    pub heart: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralPeak {
    pub bin: usize,
    pub frequency_hz: f64,
    pub magnitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectraView {
    /// Frequency step between adjacent bins.
    pub bin_hz: f64,
    pub raw_iq: Vec<f64>,
    pub unwrapped_phase: Vec<f64>,
    pub breathing: Vec<f64>,
    pub heart: Vec<f64>,
    pub breathing_peak: Option<SpectralPeak>,
    pub heart_peak: Option<SpectralPeak>,
}

/// Read-only copy of the pipeline state handed to presentation collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub cycle: u64,
    pub timestamp: f64,
    pub range: RangeView,
    pub traces: SlowTimeTraces,
    pub spectra: SpectraView,
    pub breathing_rates: Vec<f64>,
    pub heart_rates: Vec<f64>,
    pub breath_cycles: BreathCycles,
    pub presence: PresenceState,
    pub telemetry: TelemetryFrame,
    pub metrics: MetricsSnapshot,
}

impl PipelineSnapshot {
    pub fn to_json(&self) -> StageResult<String> {
        serde_json::to_string(self)
            .map_err(|err| StageError::Internal(format!("snapshot serialisation: {}", err)))
    }
}
