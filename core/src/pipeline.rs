//! The processing context: every buffer and stage of one radar session,
//! owned by a single writer and advanced one pass at a time.

use crate::interface::{
    BreathCycles, PipelineSnapshot, PresenceState, RadarFrame, RangeView, SpectraView,
    TelemetryFrame,
};
use crate::prelude::{ConfigUpdate, ProcessingStage, StageResult, VitalConfig};
use crate::processing::{
    BreathCycleDetector, FilterBank, PresenceGate, RangeStage, RateEstimator, SlowTimeBuffers,
    SpectralEstimator, SpectrumInput, TargetBinTracker, VitalSpectra,
};
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::MetricsRecorder;
use std::sync::Arc;

/// Outcome of one processing pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassSummary {
    pub cycle: u64,
    /// Frames folded into this pass.
    pub frames: usize,
    pub breathing_bpm: f64,
    pub heart_bpm: f64,
    pub present: bool,
}

pub struct VitalPipeline {
    config: VitalConfig,
    range: RangeStage,
    tracker: TargetBinTracker,
    buffers: SlowTimeBuffers,
    filters: FilterBank,
    spectrum: SpectralEstimator,
    breathing_rate: RateEstimator,
    heart_rate: RateEstimator,
    breath_cycles: BreathCycleDetector,
    presence_gate: PresenceGate,
    range_magnitudes: Vec<f64>,
    spectra: VitalSpectra,
    presence: PresenceState,
    telemetry: TelemetryFrame,
    cycle: u64,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl VitalPipeline {
    pub fn new(config: VitalConfig) -> StageResult<Self> {
        Self::with_metrics(config, Arc::new(MetricsRecorder::new()))
    }

    /// Builds a pipeline that reports into a shared metrics recorder.
    pub fn with_metrics(config: VitalConfig, metrics: Arc<MetricsRecorder>) -> StageResult<Self> {
        config.validate()?;

        let mut range = RangeStage::new();
        range.initialize(&config)?;
        let mut spectrum = SpectralEstimator::new();
        spectrum.initialize(&config)?;

        let pipeline = Self {
            tracker: TargetBinTracker::new(&config),
            buffers: SlowTimeBuffers::new(config.buffer_samples()),
            filters: FilterBank::new(&config)?,
            breathing_rate: RateEstimator::new(config.bands.breathing, &config)?,
            heart_rate: RateEstimator::new(config.bands.heart, &config)?,
            breath_cycles: BreathCycleDetector::new(&config),
            presence_gate: PresenceGate::new(&config),
            range_magnitudes: vec![0.0; config.radar.range_bins()],
            spectra: VitalSpectra::default(),
            presence: PresenceState::default(),
            telemetry: TelemetryFrame::absent(),
            cycle: 0,
            range,
            spectrum,
            metrics,
            logger: LogManager::new("pipeline"),
            config,
        };
        pipeline.logger.notice(&format!(
            "pipeline ready: {} Hz slow time, {} sample window, {} sample buffer",
            pipeline.config.sample_rate(),
            pipeline.config.processing_samples(),
            pipeline.config.buffer_samples()
        ));
        Ok(pipeline)
    }

    /// Range-processes one frame and appends its slow-time sample.
    /// A rejected frame leaves every buffer untouched.
    pub fn ingest(&mut self, frame: RadarFrame) -> StageResult<()> {
        let timestamp = frame.timestamp;
        let profile = match self.range.execute(frame) {
            Ok(profile) => profile,
            Err(err) => {
                self.metrics.record_rejected();
                self.logger.warn(&format!("frame at t={:.3}s rejected: {}", timestamp, err));
                return Err(err);
            }
        };

        let sample = self.tracker.track(&profile);
        self.range_magnitudes = profile.magnitudes();
        self.buffers.push_sample(sample, timestamp);
        self.metrics.record_processed();
        Ok(())
    }

    /// Recomputes every derived trace over the frames ingested since the
    /// previous pass. Returns `None` when nothing new arrived.
    pub fn run_pass(&mut self) -> StageResult<Option<PassSummary>> {
        let batch = self.buffers.take_pending();
        if batch == 0 {
            return Ok(None);
        }
        let window = self.config.processing_samples();

        self.buffers.unwrap_recent(window, batch);
        let unwrapped = self.buffers.recent_unwrapped(window);
        let breathing = self.filters.breathing(&unwrapped)?;
        self.buffers.write_breathing(&breathing, batch);
        let heart = self.filters.heart(&unwrapped)?;
        self.buffers.write_heart(&heart, batch);

        self.spectra = self.spectrum.execute(SpectrumInput {
            raw_iq: self.buffers.recent_iq(window),
            unwrapped_phase: unwrapped,
            breathing: self.buffers.recent_breathing(window),
            heart: self.buffers.recent_heart(window),
        })?;

        self.breathing_rate.update(&self.spectra.breathing);
        self.heart_rate.update(&self.spectra.heart);

        let cycle_window = self.breath_cycles.window_len();
        self.breath_cycles.on_pass(
            &self.buffers.recent_breathing(cycle_window),
            &self.buffers.recent_timestamps(cycle_window),
        )?;

        let presence_window = self.presence_gate.window_len();
        self.presence = self.presence_gate.evaluate(
            &self.buffers.recent_breathing(presence_window),
            &self.buffers.recent_envelope(presence_window),
        );
        let estimation = self.config.estimation_samples();
        self.telemetry = self.presence_gate.telemetry(
            &self.presence,
            self.breathing_rate.recent_mean_rate(estimation),
            self.heart_rate.recent_mean_rate(estimation),
        );

        self.cycle += 1;
        self.metrics.record_pass();
        let breathing_bpm = self.breathing_rate_bpm();
        let heart_bpm = self.heart_rate_bpm();
        self.logger.record(&format!(
            "cycle {} ({} frames): breathing {:.0}/min heart {:.0}/min present={}",
            self.cycle, batch, breathing_bpm, heart_bpm, self.presence.present
        ));

        Ok(Some(PassSummary {
            cycle: self.cycle,
            frames: batch,
            breathing_bpm,
            heart_bpm,
            present: self.presence.present,
        }))
    }

    pub fn process_frame(&mut self, frame: RadarFrame) -> StageResult<Option<PassSummary>> {
        self.ingest(frame)?;
        self.run_pass()
    }

    /// Ingests a batch of frames and folds them into one pass. Rejected
    /// frames are skipped; the remaining ones are still processed.
    pub fn process_batch<I>(&mut self, frames: I) -> StageResult<Option<PassSummary>>
    where
        I: IntoIterator<Item = RadarFrame>,
    {
        for frame in frames {
            // already logged and counted by ingest
            let _ = self.ingest(frame);
        }
        self.run_pass()
    }

    /// Applies a live configuration change. Invalid changes are rejected and
    /// the previous settings stay in force.
    pub fn apply(&mut self, update: ConfigUpdate) -> StageResult<()> {
        let result = match update {
            ConfigUpdate::RangeGate(gate) => self.tracker.set_gate(gate).map(|_| {
                self.config.processing.range_gate = gate;
            }),
            ConfigUpdate::BreathingBand(band) => self
                .filters
                .set_breathing_band(band)
                .and_then(|_| self.breathing_rate.set_band(band))
                .map(|_| self.config.bands.breathing = band),
            ConfigUpdate::HeartBand(band) => self
                .filters
                .set_heart_band(band)
                .and_then(|_| self.heart_rate.set_band(band))
                .map(|_| self.config.bands.heart = band),
        };

        match &result {
            Ok(()) => self.logger.notice(&format!("applied {:?}", update)),
            Err(err) => {
                self.metrics.record_config_rejected();
                self.logger.warn(&format!("rejected {:?}: {}", update, err));
            }
        }
        result
    }

    /// Copy of the presentation state; the pipeline keeps no reference to it.
    pub fn snapshot(&self) -> PipelineSnapshot {
        let fft_size = self.config.fft_size_vital();
        PipelineSnapshot {
            cycle: self.cycle,
            timestamp: self.buffers.latest_timestamp(),
            range: RangeView {
                magnitudes: self.range_magnitudes.clone(),
                tracked_bin: self.tracker.tracked_bin(),
                tracked_range_m: self.tracker.tracked_range_m(),
                gate_bins: self.tracker.gate_bins(),
            },
            traces: self.buffers.traces(),
            spectra: SpectraView {
                bin_hz: self.config.sample_rate() as f64 / fft_size as f64,
                raw_iq: self.spectra.raw_iq.clone(),
                unwrapped_phase: self.spectra.unwrapped_phase.clone(),
                breathing: self.spectra.breathing.clone(),
                heart: self.spectra.heart.clone(),
                breathing_peak: self.breathing_rate.marker(&self.spectra.breathing),
                heart_peak: self.heart_rate.marker(&self.spectra.heart),
            },
            breathing_rates: self.breathing_rate.rates(),
            heart_rates: self.heart_rate.rates(),
            breath_cycles: self.breath_cycles.latest().clone(),
            presence: self.presence,
            telemetry: self.telemetry,
            metrics: self.metrics.snapshot(),
        }
    }

    pub fn telemetry(&self) -> TelemetryFrame {
        self.telemetry
    }

    pub fn presence(&self) -> &PresenceState {
        &self.presence
    }

    pub fn breath_cycles(&self) -> &BreathCycles {
        self.breath_cycles.latest()
    }

    /// Current breathing rate, zero while nobody is present. The estimator
    /// keeps holding its last value underneath.
    pub fn breathing_rate_bpm(&self) -> f64 {
        self.gated(self.breathing_rate.current_rate())
    }

    pub fn heart_rate_bpm(&self) -> f64 {
        self.gated(self.heart_rate.current_rate())
    }

    fn gated(&self, rate: f64) -> f64 {
        if self.presence.present {
            rate
        } else {
            0.0
        }
    }

    pub fn tracked_bin(&self) -> usize {
        self.tracker.tracked_bin()
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn config(&self) -> &VitalConfig {
        &self.config
    }

    pub fn filters(&self) -> &FilterBank {
        &self.filters
    }

    pub fn metrics(&self) -> Arc<MetricsRecorder> {
        Arc::clone(&self.metrics)
    }

    /// Capacity of the slow-time buffers; constant for the session.
    pub fn buffer_len(&self) -> usize {
        self.buffers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::synthetic::{reflector_frame, vital_sign_frames};
    use crate::interface::VitalMotion;
    use crate::prelude::{Band, RangeGate, StageError};
    use ndarray::Array3;
    use num_complex::Complex64;

    const TARGET_BIN: usize = 40;

    fn run(motion: VitalMotion, seconds: f64) -> VitalPipeline {
        let config = VitalConfig::default();
        let frames = vital_sign_frames(&config.radar, TARGET_BIN, 1.0, &motion, seconds);
        let mut pipeline = VitalPipeline::new(config).unwrap();
        for frame in frames {
            pipeline.process_frame(frame).unwrap();
        }
        pipeline
    }

    #[test]
    fn synthetic_subject_yields_expected_rates() {
        let pipeline = run(VitalMotion::default(), 45.0);

        assert_eq!(pipeline.tracked_bin(), TARGET_BIN);
        // 0.25 Hz and 1.2 Hz less the 2 per-minute bias
        assert!((pipeline.breathing_rate_bpm() - 13.0).abs() <= 2.0);
        assert!((pipeline.heart_rate_bpm() - 70.0).abs() <= 2.0);

        let snapshot = pipeline.snapshot();
        assert_eq!(snapshot.cycle, 900);
        assert_eq!(snapshot.spectra.breathing_peak.map(|p| p.bin), Some(20));
        assert_eq!(snapshot.spectra.heart_peak.map(|p| p.bin), Some(96));
        assert!(snapshot.presence.present);
        assert!(!snapshot.breath_cycles.inhalations.is_empty());
        assert!(!snapshot.breath_cycles.exhalations.is_empty());
        assert_eq!(snapshot.metrics.frames_processed, 900);
    }

    #[test]
    fn strong_breathing_is_reported_present() {
        let motion = VitalMotion {
            breathing_hz: 0.3,
            ..VitalMotion::default()
        };
        let pipeline = run(motion, 40.0);
        let telemetry = pipeline.telemetry();

        assert!(pipeline.presence().present);
        assert_eq!(telemetry.presence, 1);
        assert!((pipeline.breathing_rate_bpm() - 16.0).abs() <= 2.0);
        assert!((0.1..=1.0).contains(&telemetry.x_ratio));
        assert!(telemetry.breathing_hz > 0.0);
    }

    #[test]
    fn still_scene_is_absent_with_neutral_telemetry() {
        let pipeline = run(VitalMotion::still(), 30.0);
        assert!(!pipeline.presence().present);
        assert_eq!(pipeline.telemetry(), TelemetryFrame::absent());
        let t = pipeline.telemetry();
        assert_eq!(
            (t.breathing_hz, t.heart_hz, t.x_ratio, t.y_ratio, t.presence),
            (0.0, 0.0, 0.1, 0.1, 0)
        );
    }

    #[test]
    fn rates_read_zero_once_the_subject_leaves() {
        let config = VitalConfig::default();
        let mut pipeline = run(VitalMotion::default(), 30.0);
        assert!(pipeline.presence().present);
        assert!(pipeline.breathing_rate_bpm() > 0.0);

        let still = vital_sign_frames(&config.radar, TARGET_BIN, 1.0, &VitalMotion::still(), 30.0);
        let mut last = None;
        for mut frame in still {
            frame.timestamp += 30.0;
            last = pipeline.process_frame(frame).unwrap();
        }
        let summary = last.unwrap();

        assert!(!pipeline.presence().present);
        assert!(!summary.present);
        assert_eq!((summary.breathing_bpm, summary.heart_bpm), (0.0, 0.0));
        assert_eq!(pipeline.breathing_rate_bpm(), 0.0);
        assert_eq!(pipeline.heart_rate_bpm(), 0.0);
        // the estimators keep holding underneath
        assert!(pipeline.breathing_rate.current_rate() > 0.0);
    }

    #[test]
    fn buffer_lengths_never_change() {
        let config = VitalConfig::default();
        let motion = VitalMotion::default();
        let frames = vital_sign_frames(&config.radar, TARGET_BIN, 1.0, &motion, 3.0);
        let mut pipeline = VitalPipeline::new(config).unwrap();
        for chunk in frames.chunks(7) {
            pipeline.process_batch(chunk.to_vec()).unwrap();
            let snapshot = pipeline.snapshot();
            assert_eq!(snapshot.traces.timestamps.len(), 2000);
            assert_eq!(snapshot.traces.heart.len(), 2000);
            assert_eq!(snapshot.breathing_rates.len(), 2000);
            assert_eq!(snapshot.heart_rates.len(), 2000);
        }
        // 60 frames in batches of 7
        assert_eq!(pipeline.cycle(), 9);
        assert_eq!(pipeline.buffer_len(), 2000);
    }

    #[test]
    fn empty_pass_is_skipped() {
        let mut pipeline = VitalPipeline::new(VitalConfig::default()).unwrap();
        assert_eq!(pipeline.run_pass().unwrap(), None);
        assert_eq!(pipeline.cycle(), 0);
    }

    #[test]
    fn malformed_frame_is_rejected_without_touching_buffers() {
        let mut pipeline = VitalPipeline::new(VitalConfig::default()).unwrap();
        let bad = RadarFrame::new(Array3::from_elem((1, 1, 16), Complex64::new(1.0, 0.0)), 0.0);
        assert!(matches!(
            pipeline.process_frame(bad),
            Err(StageError::InvalidInput(_))
        ));
        assert_eq!(pipeline.run_pass().unwrap(), None);

        let config = pipeline.config().clone();
        let good = reflector_frame(&config.radar, TARGET_BIN, 1.0, 0.0, 0.05);
        let bad = RadarFrame::new(Array3::from_elem((3, 1, 8), Complex64::new(1.0, 0.0)), 0.1);
        let summary = pipeline.process_batch(vec![good, bad]).unwrap().unwrap();
        assert_eq!(summary.frames, 1);

        let metrics = pipeline.metrics().snapshot();
        assert_eq!(metrics.frames_rejected, 2);
        assert_eq!(metrics.frames_processed, 1);
    }

    #[test]
    fn live_band_change_rebuilds_filters_only() {
        let mut pipeline = run(VitalMotion::default(), 2.0);
        let taps_before = pipeline.filters().breathing_taps().to_vec();

        pipeline
            .apply(ConfigUpdate::BreathingBand(Band::new(0.1, 0.5)))
            .unwrap();
        assert_ne!(pipeline.filters().breathing_taps(), taps_before.as_slice());
        assert_eq!(pipeline.config().bands.breathing, Band::new(0.1, 0.5));
        assert_eq!(pipeline.buffer_len(), 2000);
        assert_eq!(pipeline.snapshot().traces.breathing.len(), 2000);

        let heart_before = pipeline.config().bands.heart;
        let rejected = pipeline.apply(ConfigUpdate::HeartBand(Band::new(3.0, 1.0)));
        assert!(rejected.is_err());
        assert_eq!(pipeline.config().bands.heart, heart_before);
        assert_eq!(pipeline.metrics().snapshot().config_rejected, 1);
    }

    #[test]
    fn range_gate_update_moves_gate_bins() {
        let mut pipeline = VitalPipeline::new(VitalConfig::default()).unwrap();
        let gate = RangeGate {
            start_m: 0.2,
            stop_m: 0.4,
        };
        pipeline.apply(ConfigUpdate::RangeGate(gate)).unwrap();
        let (start, stop) = pipeline.snapshot().range.gate_bins;
        assert_eq!(start, pipeline.config().radar.range_to_bin(0.2));
        assert!(stop > start);
        assert!(pipeline
            .apply(ConfigUpdate::RangeGate(RangeGate {
                start_m: 0.5,
                stop_m: 5.0,
            }))
            .is_err());
        assert_eq!(pipeline.config().processing.range_gate, gate);
    }
}
