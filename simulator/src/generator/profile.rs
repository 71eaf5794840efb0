use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use vitalcore::interface::synthetic::reflector_frame;
use vitalcore::interface::{FrameSource, RadarFrame, SourceError, VitalMotion};
use vitalcore::prelude::RadarConfig;

/// Scene parameters for the synthetic radar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub target_range_m: f64,
    pub amplitude: f64,
    pub motion: VitalMotion,
    /// Peak amplitude of the uniform noise added to I and Q.
    pub noise: f64,
    pub seed: u64,
    /// Stop after this many seconds; `None` runs until shut down.
    pub duration_s: Option<f64>,
    /// Pace frames at the radar frame rate instead of as fast as possible.
    pub realtime: bool,
    pub description: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            target_range_m: 0.55,
            amplitude: 1.0,
            motion: VitalMotion::default(),
            noise: 0.01,
            seed: 0,
            duration_s: Some(60.0),
            realtime: false,
            description: None,
        }
    }
}

/// Frame source standing in for the radar device: one reflector at a fixed
/// range whose phase follows the configured breathing and heartbeat.
pub struct SyntheticRadar {
    radar: RadarConfig,
    config: GeneratorConfig,
    target_bin: usize,
    rng: StdRng,
    frame_index: usize,
    frame_limit: Option<usize>,
    started: Option<Instant>,
}

impl SyntheticRadar {
    pub fn new(radar: RadarConfig, config: GeneratorConfig) -> Self {
        let target_bin = radar
            .range_to_bin(config.target_range_m)
            .min(radar.range_bins().saturating_sub(1));
        let frame_limit = config
            .duration_s
            .map(|seconds| (seconds * radar.frame_rate_hz as f64).round() as usize);
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            radar,
            config,
            target_bin,
            frame_index: 0,
            frame_limit,
            started: None,
        }
    }

    pub fn target_bin(&self) -> usize {
        self.target_bin
    }

    fn pace(&mut self, timestamp: f64) {
        let started = *self.started.get_or_insert_with(Instant::now);
        let due = started + Duration::from_secs_f64(timestamp);
        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        }
    }
}

impl FrameSource for SyntheticRadar {
    fn next_frame(&mut self) -> Result<Option<RadarFrame>, SourceError> {
        if self.frame_limit.is_some_and(|limit| self.frame_index >= limit) {
            return Ok(None);
        }
        let timestamp = self.frame_index as f64 / self.radar.frame_rate_hz as f64;
        self.frame_index += 1;
        if self.config.realtime {
            self.pace(timestamp);
        }

        let phase = self.config.motion.phase_at(timestamp);
        let mut frame = reflector_frame(
            &self.radar,
            self.target_bin,
            self.config.amplitude,
            phase,
            timestamp,
        );
        let noise = self.config.noise;
        if noise > 0.0 {
            for sample in frame.samples.iter_mut() {
                sample.re += self.rng.gen_range(-noise..noise);
                sample.im += self.rng.gen_range(-noise..noise);
            }
        }
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_stops_after_duration() {
        let config = GeneratorConfig {
            duration_s: Some(2.0),
            ..Default::default()
        };
        let mut radar = SyntheticRadar::new(RadarConfig::default(), config);
        let mut count = 0;
        while let Some(frame) = radar.next_frame().unwrap() {
            assert_eq!(frame.shape(), (3, 1, 64));
            count += 1;
        }
        assert_eq!(count, 40);
    }

    #[test]
    fn same_seed_repeats_noise() {
        let config = GeneratorConfig {
            noise: 0.1,
            seed: 13,
            ..Default::default()
        };
        let mut a = SyntheticRadar::new(RadarConfig::default(), config.clone());
        let mut b = SyntheticRadar::new(RadarConfig::default(), config);
        let fa = a.next_frame().unwrap().unwrap();
        let fb = b.next_frame().unwrap().unwrap();
        assert_eq!(fa.samples, fb.samples);
    }

    #[test]
    fn target_range_maps_into_default_gate() {
        let radar = SyntheticRadar::new(RadarConfig::default(), GeneratorConfig::default());
        let (start, stop) = vitalcore::prelude::RangeGate::default().bins(&RadarConfig::default());
        assert!((start..stop).contains(&radar.target_bin()));
    }
}
