//! Streaming vital-signs core for FMCW radar.
//!
//! Frames go through a range FFT, the strongest reflector inside a range gate
//! is tracked, and its phase over slow time is unwrapped, filtered into
//! breathing and heartbeat components and turned into per-minute rates, breath
//! cycle events and a presence decision. [`pipeline::VitalPipeline`] owns all
//! state; [`runtime`] wires it between a frame source and snapshot consumers.

pub mod filters;
pub mod interface;
pub mod math;
pub mod pipeline;
pub mod prelude;
pub mod processing;
pub mod runtime;
pub mod telemetry;

pub use interface::{FrameSource, PipelineSnapshot, RadarFrame, SourceError, TelemetryFrame};
pub use pipeline::{PassSummary, VitalPipeline};
pub use prelude::{ConfigUpdate, ProcessingStage, StageError, StageResult, VitalConfig};
pub use runtime::{spawn, spawn_publisher, PipelineHandle, RuntimeError, SnapshotSink};
