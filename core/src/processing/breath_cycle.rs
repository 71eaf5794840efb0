use crate::filters::{median_filter, SavitzkyGolay};
use crate::interface::{BreathCycleEvent, BreathCycles};
use crate::math::peaks::{find_peaks, PeakCriteria};
use crate::math::stats::StatsHelper;
use crate::prelude::{BreathCycleConfig, StageResult, VitalConfig};

/// Periodic inhalation/exhalation extrema search over the recent breathing trace.
pub struct BreathCycleDetector {
    config: BreathCycleConfig,
    sample_rate: usize,
    passes: u64,
    latest: BreathCycles,
}

impl BreathCycleDetector {
    pub fn new(config: &VitalConfig) -> Self {
        Self {
            config: config.breath_cycle.clone(),
            sample_rate: config.sample_rate(),
            passes: 0,
            latest: BreathCycles::default(),
        }
    }

    /// Number of breathing samples examined per detection.
    pub fn window_len(&self) -> usize {
        self.config.window_s * self.sample_rate
    }

    /// Counts a processing pass and re-runs detection on every n-th one.
    /// Returns true when the stored events were replaced.
    pub fn on_pass(&mut self, breathing: &[f64], timestamps: &[f64]) -> StageResult<bool> {
        self.passes += 1;
        if self.passes % self.config.decimation as u64 != 0 {
            return Ok(false);
        }
        self.latest = self.detect(breathing, timestamps)?;
        Ok(true)
    }

    pub fn latest(&self) -> &BreathCycles {
        &self.latest
    }

    /// Peaks (inhalations) and valleys (exhalations) of a smoothed copy of
    /// `breathing`, reported with the unsmoothed amplitude at each index.
    pub fn detect(&self, breathing: &[f64], timestamps: &[f64]) -> StageResult<BreathCycles> {
        if breathing.is_empty() {
            return Ok(BreathCycles::default());
        }

        let smoothed = match SavitzkyGolay::fitted_window(self.config.savgol_window, breathing.len())
        {
            Some(window) => SavitzkyGolay::new(window, self.config.savgol_order)?.smooth(breathing),
            None => breathing.to_vec(),
        };
        let smoothed = median_filter(&smoothed, self.config.median_kernel);

        let spread = StatsHelper::percentile(&smoothed, self.config.upper_percentile)
            - StatsHelper::percentile(&smoothed, self.config.lower_percentile);
        let threshold = spread * self.config.threshold_fraction;
        let criteria = PeakCriteria {
            min_height: Some(threshold),
            min_distance: self.sample_rate / 2,
            min_prominence: Some(threshold * self.config.prominence_fraction),
        };

        let inverted: Vec<f64> = smoothed.iter().map(|v| -v).collect();
        let events = |indices: Vec<usize>| -> Vec<BreathCycleEvent> {
            indices
                .into_iter()
                .filter_map(|idx| {
                    let timestamp = *timestamps.get(idx)?;
                    Some(BreathCycleEvent {
                        timestamp,
                        amplitude: breathing[idx],
                    })
                })
                .collect()
        };

        Ok(BreathCycles {
            inhalations: events(find_peaks(&smoothed, &criteria)),
            exhalations: events(find_peaks(&inverted, &criteria)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn breathing_trace(freq: f64, seconds: usize) -> (Vec<f64>, Vec<f64>) {
        let n = seconds * 20;
        let t: Vec<f64> = (0..n).map(|i| i as f64 / 20.0).collect();
        let x = t.iter().map(|&t| (2.0 * PI * freq * t).sin()).collect();
        (x, t)
    }

    #[test]
    fn sine_yields_alternating_inhale_and_exhale() {
        let detector = BreathCycleDetector::new(&VitalConfig::default());
        let (x, t) = breathing_trace(0.3, 10);
        let cycles = detector.detect(&x, &t).unwrap();

        // 3 full periods in 10 s
        assert_eq!(cycles.inhalations.len(), 3);
        assert_eq!(cycles.exhalations.len(), 3);
        let first = cycles.inhalations[0];
        // sin peaks at t = 1 / (4 f)
        assert!((first.timestamp - 0.8333).abs() < 0.1);
        assert!(first.amplitude > 0.95);
        assert!(cycles.exhalations.iter().all(|e| e.amplitude < -0.95));
    }

    #[test]
    fn flat_trace_has_no_events() {
        let detector = BreathCycleDetector::new(&VitalConfig::default());
        let cycles = detector.detect(&[0.0; 200], &[0.0; 200]).unwrap();
        assert!(cycles.inhalations.is_empty() && cycles.exhalations.is_empty());
    }

    #[test]
    fn detection_runs_on_every_fifth_pass() {
        let mut detector = BreathCycleDetector::new(&VitalConfig::default());
        let (x, t) = breathing_trace(0.3, 10);
        let runs: Vec<bool> = (0..10)
            .map(|_| detector.on_pass(&x, &t).unwrap())
            .collect();
        assert_eq!(runs.iter().filter(|&&r| r).count(), 2);
        assert!(runs[4] && runs[9]);
        assert_eq!(detector.latest().inhalations.len(), 3);
        assert_eq!(detector.window_len(), 200);
    }
}
