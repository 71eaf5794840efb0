pub mod log;
pub mod metrics;

pub use self::log::{LogManager, TelemetryLogger};
pub use self::metrics::{MetricsRecorder, MetricsSnapshot};
