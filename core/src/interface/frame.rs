use ndarray::Array3;
use num_complex::Complex64;

/// One acquisition cycle of complex baseband samples,
/// indexed `[antenna][chirp][sample]`.
#[derive(Debug, Clone)]
pub struct RadarFrame {
    pub samples: Array3<Complex64>,
    /// Acquisition time in seconds.
    pub timestamp: f64,
}

impl RadarFrame {
    pub fn new(samples: Array3<Complex64>, timestamp: f64) -> Self {
        Self { samples, timestamp }
    }

    /// `(antennas, chirps, samples_per_chirp)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        self.samples.dim()
    }
}

/// Failure reported by a frame source. Fatal for the producer.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("device failure: {0}")]
    Device(String),
    #[error("frame source closed unexpectedly")]
    Disconnected,
}

/// Pull-style producer of radar frames.
pub trait FrameSource {
    /// Blocks until the next frame is available. `Ok(None)` ends the stream.
    fn next_frame(&mut self) -> Result<Option<RadarFrame>, SourceError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<RadarFrame>, SourceError> {
        (**self).next_frame()
    }
}

/// Replays a fixed list of frames; mostly useful in tests and offline runs.
#[derive(Debug, Default)]
pub struct FrameReplay {
    frames: std::collections::VecDeque<RadarFrame>,
}

impl FrameReplay {
    pub fn new(frames: impl IntoIterator<Item = RadarFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for FrameReplay {
    fn next_frame(&mut self) -> Result<Option<RadarFrame>, SourceError> {
        Ok(self.frames.pop_front())
    }
}
