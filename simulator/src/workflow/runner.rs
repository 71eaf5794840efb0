use crate::generator::profile::SyntheticRadar;
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use log::info;
use vitalcore::interface::{FrameSource, PipelineSnapshot, TelemetryFrame};
use vitalcore::runtime::{self, PipelineHandle};
use vitalcore::VitalPipeline;

pub struct WorkflowResult {
    pub frames: usize,
    pub cycles: u64,
    pub breathing_bpm: f64,
    pub heart_bpm: f64,
    pub present: bool,
    pub inhalations: usize,
    pub exhalations: usize,
    pub telemetry: TelemetryFrame,
    pub snapshot: PipelineSnapshot,
}

impl WorkflowResult {
    pub fn report_line(&self) -> String {
        format!(
            "frames={} cycles={} breathing_bpm={:.0} heart_bpm={:.0} present={} inhalations={} exhalations={} telemetry=({:.3}, {:.3}, {:.2}, {:.2}, {})\n",
            self.frames,
            self.cycles,
            self.breathing_bpm,
            self.heart_bpm,
            self.present,
            self.inhalations,
            self.exhalations,
            self.telemetry.breathing_hz,
            self.telemetry.heart_hz,
            self.telemetry.x_ratio,
            self.telemetry.y_ratio,
            self.telemetry.presence
        )
    }
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    /// Pushes the whole synthetic recording through a fresh pipeline, one
    /// pass per frame, as fast as possible.
    pub fn execute(&self) -> anyhow::Result<WorkflowResult> {
        let mut pipeline =
            VitalPipeline::new(self.config.pipeline.clone()).context("building pipeline")?;

        let mut generator = self.config.generator.clone();
        generator.realtime = false;
        if generator.duration_s.is_none() {
            anyhow::bail!("offline runs need a finite generator duration");
        }
        let mut source = SyntheticRadar::new(self.config.pipeline.radar.clone(), generator);

        let mut frames = 0;
        while let Some(frame) = source.next_frame().context("reading synthetic frame")? {
            pipeline
                .process_frame(frame)
                .with_context(|| format!("processing frame {}", frames))?;
            frames += 1;
        }

        let snapshot = pipeline.snapshot();
        Ok(WorkflowResult {
            frames,
            cycles: pipeline.cycle(),
            breathing_bpm: pipeline.breathing_rate_bpm(),
            heart_bpm: pipeline.heart_rate_bpm(),
            present: pipeline.presence().present,
            inhalations: snapshot.breath_cycles.inhalations.len(),
            exhalations: snapshot.breath_cycles.exhalations.len(),
            telemetry: pipeline.telemetry(),
            snapshot,
        })
    }

    /// Starts the synthetic radar and the processing runtime. Must be called
    /// from within a tokio runtime.
    pub fn start(&self) -> anyhow::Result<PipelineHandle> {
        let pipeline =
            VitalPipeline::new(self.config.pipeline.clone()).context("building pipeline")?;
        let source = SyntheticRadar::new(
            self.config.pipeline.radar.clone(),
            self.config.generator.clone(),
        );
        info!(
            "synthetic subject at range bin {} ({:.2} m)",
            source.target_bin(),
            self.config.generator.target_range_m
        );
        Ok(runtime::spawn(pipeline, source))
    }
}
