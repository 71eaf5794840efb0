use crate::math::stats::StatsHelper;
use crate::prelude::{RadarConfig, RangeGate, StageResult, VitalConfig};
use crate::processing::range::RangeProfile;
use crate::processing::ring_buffer::RingBuffer;
use num_complex::Complex64;
use rustfft::num_traits::Zero;

/// Follows the strongest reflector inside the range gate and extracts one
/// complex slow-time sample per frame.
///
/// The per-frame argmax is smoothed with the rounded mean of the recent
/// peak history, so a single spurious maximum does not move the tracked bin.
#[derive(Debug, Clone)]
pub struct TargetBinTracker {
    radar: RadarConfig,
    gate: RangeGate,
    gate_bins: (usize, usize),
    history: RingBuffer<usize>,
    seeded: bool,
    tracked_bin: usize,
    use_tracked_bin: bool,
}

impl TargetBinTracker {
    pub fn new(config: &VitalConfig) -> Self {
        let radar = config.radar.clone();
        let gate = config.processing.range_gate;
        let gate_bins = gate.bins(&radar);
        let history_len = config.processing.tracker_smoothing_s * config.sample_rate();
        Self {
            radar,
            gate,
            gate_bins,
            history: RingBuffer::filled(history_len, gate_bins.0),
            seeded: false,
            tracked_bin: gate_bins.0,
            use_tracked_bin: config.processing.use_tracked_bin,
        }
    }

    /// Moves the gate; the peak history restarts from the next frame.
    pub fn set_gate(&mut self, gate: RangeGate) -> StageResult<()> {
        gate.validate(&self.radar)?;
        self.gate = gate;
        self.gate_bins = gate.bins(&self.radar);
        self.seeded = false;
        self.tracked_bin = self.gate_bins.0;
        Ok(())
    }

    pub fn gate(&self) -> RangeGate {
        self.gate
    }

    pub fn gate_bins(&self) -> (usize, usize) {
        self.gate_bins
    }

    pub fn tracked_bin(&self) -> usize {
        self.tracked_bin
    }

    pub fn tracked_range_m(&self) -> f64 {
        self.radar.bin_to_range(self.tracked_bin)
    }

    /// Updates the tracked bin from `profile` and returns the extracted sample.
    pub fn track(&mut self, profile: &RangeProfile) -> Complex64 {
        if profile.is_empty() {
            return Complex64::zero();
        }
        let last = profile.len() - 1;
        let start = self.gate_bins.0.min(last);
        let stop = self.gate_bins.1.clamp(start + 1, profile.len());

        let magnitudes: Vec<f64> = profile.bins[start..stop].iter().map(|c| c.norm()).collect();
        let peak = start + StatsHelper::argmax(&magnitudes).unwrap_or(0);

        if self.seeded {
            self.history.push(peak);
        } else {
            self.history.fill(peak);
            self.seeded = true;
        }

        let mean = self.history.iter().sum::<usize>() as f64 / self.history.len() as f64;
        self.tracked_bin = (mean.round() as usize).min(last);

        if self.use_tracked_bin {
            profile.bins[self.tracked_bin]
        } else {
            let gate = &profile.bins[start..stop];
            gate.iter().sum::<Complex64>() / gate.len() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with_peak(bin: usize, len: usize) -> RangeProfile {
        let mut bins = vec![Complex64::new(0.01, 0.0); len];
        bins[bin] = Complex64::new(0.0, 1.0);
        RangeProfile { bins, timestamp: 0.0 }
    }

    #[test]
    fn locks_onto_peak_inside_gate() {
        let config = VitalConfig::default();
        let mut tracker = TargetBinTracker::new(&config);
        let (start, stop) = tracker.gate_bins();
        let target = start + 2;
        assert!(target < stop);

        let sample = tracker.track(&profile_with_peak(target, 64));
        assert_eq!(tracker.tracked_bin(), target);
        assert_eq!(sample, Complex64::new(0.0, 1.0));
    }

    #[test]
    fn ignores_stronger_reflector_outside_gate() {
        let config = VitalConfig::default();
        let mut tracker = TargetBinTracker::new(&config);
        let (start, _) = tracker.gate_bins();
        let mut profile = profile_with_peak(start + 1, 64);
        profile.bins[5] = Complex64::new(10.0, 0.0);
        tracker.track(&profile);
        assert_eq!(tracker.tracked_bin(), start + 1);
    }

    #[test]
    fn single_outlier_is_smoothed_away() {
        let config = VitalConfig::default();
        let mut tracker = TargetBinTracker::new(&config);
        let (start, stop) = tracker.gate_bins();
        for _ in 0..40 {
            tracker.track(&profile_with_peak(start, 64));
        }
        tracker.track(&profile_with_peak(stop - 1, 64));
        assert_eq!(tracker.tracked_bin(), start);
    }

    #[test]
    fn gate_mean_mode_averages_complex_bins() {
        let mut config = VitalConfig::default();
        config.processing.use_tracked_bin = false;
        let mut tracker = TargetBinTracker::new(&config);
        let (start, stop) = tracker.gate_bins();
        let bins = vec![Complex64::new(1.0, -1.0); 64];
        let sample = tracker.track(&RangeProfile { bins, timestamp: 0.0 });
        assert!((sample - Complex64::new(1.0, -1.0)).norm() < 1e-12);
        assert!(stop > start);
    }

    #[test]
    fn invalid_gate_is_rejected_and_previous_kept() {
        let config = VitalConfig::default();
        let mut tracker = TargetBinTracker::new(&config);
        let before = tracker.gate_bins();
        let result = tracker.set_gate(RangeGate {
            start_m: 0.6,
            stop_m: 0.5,
        });
        assert!(result.is_err());
        assert_eq!(tracker.gate_bins(), before);

        tracker
            .set_gate(RangeGate {
                start_m: 0.2,
                stop_m: 0.3,
            })
            .unwrap();
        assert!(tracker.gate_bins().0 < before.0);
    }
}
