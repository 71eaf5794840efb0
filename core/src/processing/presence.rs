use crate::interface::{BreathPhase, PresenceState, TelemetryFrame};
use crate::math::stats::StatsHelper;
use crate::prelude::{PresenceConfig, VitalConfig};

/// Signal-quality gate deciding whether a breathing subject is in view.
#[derive(Debug, Clone)]
pub struct PresenceGate {
    config: PresenceConfig,
    window_len: usize,
}

impl PresenceGate {
    pub fn new(config: &VitalConfig) -> Self {
        Self {
            config: config.presence.clone(),
            window_len: config.presence.window_s * config.sample_rate(),
        }
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Present iff the breathing variance and the mean envelope over the
    /// window both exceed their thresholds.
    pub fn evaluate(&self, breathing: &[f64], envelope: &[f64]) -> PresenceState {
        let variance = StatsHelper::variance(breathing);
        let mean_envelope = StatsHelper::mean(envelope);
        let confidence = (variance / self.config.min_variance)
            .min(mean_envelope / self.config.min_envelope);
        let present = variance > self.config.min_variance
            && mean_envelope > self.config.min_envelope
            && breathing.len() >= 2;

        if !present {
            return PresenceState {
                confidence,
                variance,
                mean_envelope,
                ..PresenceState::default()
            };
        }

        let baseline = StatsHelper::mean(breathing);
        let amplitude = breathing
            .iter()
            .map(|v| (v - baseline).abs())
            .fold(0.0, f64::max)
            + self.config.amplitude_floor;
        let current = breathing[breathing.len() - 1];
        let normalized_amplitude = (current - baseline) / amplitude;

        let size = (50.0 + 40.0 * normalized_amplitude).clamp(30.0, 100.0);
        let amplitude_ratio = (0.1 + 0.9 * (size - 30.0) / 70.0).clamp(TelemetryFrame::MIN_RATIO, 1.0);

        let slope = current - breathing[breathing.len() - 2];
        let phase = if slope > 0.0 {
            BreathPhase::Inhale
        } else {
            BreathPhase::Exhale
        };

        PresenceState {
            present,
            confidence,
            variance,
            mean_envelope,
            normalized_amplitude,
            amplitude_ratio,
            phase: Some(phase),
        }
    }

    /// Telemetry scalars from the presence state and the recent mean rates.
    /// Non-positive rates are reported as zero.
    pub fn telemetry(
        &self,
        state: &PresenceState,
        breathing_bpm: f64,
        heart_bpm: f64,
    ) -> TelemetryFrame {
        if !state.present {
            return TelemetryFrame::absent();
        }
        let to_hz = |bpm: f64| if bpm.is_finite() && bpm > 0.0 { bpm / 60.0 } else { 0.0 };
        TelemetryFrame {
            breathing_hz: to_hz(breathing_bpm),
            heart_hz: to_hz(heart_bpm) / 2.0,
            x_ratio: state.amplitude_ratio,
            y_ratio: state.amplitude_ratio,
            presence: 1,
        }
    }
}
