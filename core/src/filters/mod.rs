pub mod fir;
pub mod savgol;
pub mod smoothing;
pub mod trend;

pub use fir::FirFilter;
pub use savgol::SavitzkyGolay;
pub use smoothing::{box_filter, median_filter};
pub use trend::{hp_filter, TrendCycle};
