use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Counters shared between the producer and the processing task.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub frames_processed: usize,
    pub frames_rejected: usize,
    pub frames_dropped: usize,
    pub passes: usize,
    pub config_rejected: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_processed(&self) {
        self.update(|m| m.frames_processed += 1);
    }

    pub fn record_rejected(&self) {
        self.update(|m| m.frames_rejected += 1);
    }

    pub fn record_dropped(&self) {
        self.update(|m| m.frames_dropped += 1);
    }

    pub fn record_pass(&self) {
        self.update(|m| m.passes += 1);
    }

    pub fn record_config_rejected(&self) {
        self.update(|m| m.config_rejected += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().map(|m| *m).unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
