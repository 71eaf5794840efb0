use crate::interface::PipelineSnapshot;
use crate::runtime::SnapshotSink;
use log::{debug, info, warn};

/// Component-tagged wrapper over the `log` facade.
pub struct LogManager {
    component: &'static str,
}

impl LogManager {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    /// Per-cycle detail.
    pub fn record(&self, message: &str) {
        debug!("[{}] {}", self.component, message);
    }

    pub fn notice(&self, message: &str) {
        info!("[{}] {}", self.component, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.component, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("vitalcore")
    }
}

/// Snapshot sink that logs the telemetry scalars on the presentation cadence.
pub struct TelemetryLogger {
    logger: LogManager,
    last_cycle: Option<u64>,
}

impl TelemetryLogger {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("telemetry"),
            last_cycle: None,
        }
    }
}

impl Default for TelemetryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSink for TelemetryLogger {
    fn publish(&mut self, snapshot: &PipelineSnapshot) {
        if self.last_cycle == Some(snapshot.cycle) {
            return;
        }
        self.last_cycle = Some(snapshot.cycle);
        let t = &snapshot.telemetry;
        self.logger.notice(&format!(
            "xhz={:.3} yhz={:.3} xratio={:.3} yratio={:.3} presence={}",
            t.breathing_hz, t.heart_hz, t.x_ratio, t.y_ratio, t.presence
        ));
    }
}
