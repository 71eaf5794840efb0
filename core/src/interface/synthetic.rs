//! Deterministic FMCW frames for a single reflector whose phase carries
//! breathing and heartbeat motion.

use crate::interface::frame::RadarFrame;
use crate::prelude::RadarConfig;
use ndarray::Array3;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Chest-wall motion expressed as phase modulation of the reflection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalMotion {
    pub breathing_hz: f64,
    pub breathing_rad: f64,
    pub heart_hz: f64,
    pub heart_rad: f64,
    /// Static phase of the reflector.
    pub phase_offset_rad: f64,
}

impl Default for VitalMotion {
    fn default() -> Self {
        Self {
            breathing_hz: 0.25,
            breathing_rad: 1.0,
            heart_hz: 1.2,
            heart_rad: 0.1,
            phase_offset_rad: 0.0,
        }
    }
}

impl VitalMotion {
    pub fn still() -> Self {
        Self {
            breathing_rad: 0.0,
            heart_rad: 0.0,
            ..Self::default()
        }
    }

    pub fn phase_at(&self, t: f64) -> f64 {
        self.phase_offset_rad
            + self.breathing_rad * (2.0 * PI * self.breathing_hz * t).sin()
            + self.heart_rad * (2.0 * PI * self.heart_hz * t).sin()
    }
}

/// Builds a frame whose reflector sits exactly on `target_bin` of the
/// zero-padded range profile with the given amplitude and phase.
pub fn reflector_frame(
    radar: &RadarConfig,
    target_bin: usize,
    amplitude: f64,
    phase: f64,
    timestamp: f64,
) -> RadarFrame {
    let fft_size = radar.fft_size_range_profile() as f64;
    let shape = (
        radar.num_rx_antennas,
        radar.chirps_per_frame,
        radar.samples_per_chirp,
    );
    let samples = Array3::from_shape_fn(shape, |(_, _, n)| {
        let beat = 2.0 * PI * target_bin as f64 * n as f64 / fft_size;
        Complex64::from_polar(amplitude, beat + phase)
    });
    RadarFrame::new(samples, timestamp)
}

/// `seconds` worth of frames at the configured frame rate.
pub fn vital_sign_frames(
    radar: &RadarConfig,
    target_bin: usize,
    amplitude: f64,
    motion: &VitalMotion,
    seconds: f64,
) -> Vec<RadarFrame> {
    let rate = radar.frame_rate_hz as f64;
    let count = (seconds * rate).round() as usize;
    (0..count)
        .map(|i| {
            let t = i as f64 / rate;
            reflector_frame(radar, target_bin, amplitude, motion.phase_at(t), t)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_have_session_shape_and_timestamps() {
        let radar = RadarConfig::default();
        let frames = vital_sign_frames(&radar, 40, 1.0, &VitalMotion::default(), 1.0);
        assert_eq!(frames.len(), 20);
        assert_eq!(frames[0].shape(), (3, 1, 64));
        assert!((frames[19].timestamp - 0.95).abs() < 1e-12);
    }

    #[test]
    fn still_motion_has_constant_phase() {
        let motion = VitalMotion {
            phase_offset_rad: 0.4,
            ..VitalMotion::still()
        };
        assert_eq!(motion.phase_at(0.0), motion.phase_at(3.7));
    }
}
