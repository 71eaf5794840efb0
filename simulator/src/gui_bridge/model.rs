use std::sync::Arc;
use vitalcore::interface::{PipelineSnapshot, TelemetryFrame};

/// What the HTTP bridge currently serves.
#[derive(Debug, Clone, Default)]
pub struct VisualizationModel {
    pub snapshot: Option<Arc<PipelineSnapshot>>,
    pub status: String,
}

impl VisualizationModel {
    pub fn telemetry(&self) -> TelemetryFrame {
        self.snapshot
            .as_ref()
            .map(|snapshot| snapshot.telemetry)
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn cycle(&self) -> Option<u64> {
        self.snapshot.as_ref().map(|snapshot| snapshot.cycle)
    }
}
