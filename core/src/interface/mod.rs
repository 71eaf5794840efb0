pub mod frame;
pub mod snapshot;
pub mod synthetic;

pub use frame::{FrameReplay, FrameSource, RadarFrame, SourceError};
pub use snapshot::{
    BreathCycleEvent, BreathCycles, BreathPhase, PipelineSnapshot, PresenceState, RangeView,
    SlowTimeTraces, SpectralPeak, SpectraView, TelemetryFrame,
};
pub use synthetic::VitalMotion;
