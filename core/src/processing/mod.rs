pub mod breath_cycle;
pub mod filter_bank;
pub mod presence;
pub mod range;
pub mod rate;
pub mod ring_buffer;
pub mod slow_time;
pub mod spectrum;
pub mod tracker;
pub mod unwrap;

pub use breath_cycle::BreathCycleDetector;
pub use filter_bank::FilterBank;
pub use presence::PresenceGate;
pub use range::{RangeProfile, RangeStage};
pub use rate::RateEstimator;
pub use ring_buffer::RingBuffer;
pub use slow_time::SlowTimeBuffers;
pub use spectrum::{SpectralEstimator, SpectrumInput, VitalSpectra};
pub use tracker::TargetBinTracker;
pub use unwrap::{unwrap_phase, wrap_phase};
