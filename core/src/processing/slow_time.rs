use crate::interface::SlowTimeTraces;
use crate::processing::ring_buffer::RingBuffer;
use crate::processing::unwrap::unwrap_phase;
use num_complex::Complex64;
use rustfft::num_traits::Zero;

/// Lock-step slow-time history: one entry per frame in every ring.
///
/// Samples are appended frame by frame; `pending` counts the frames appended
/// since the last processing pass so that a batch of frames is folded into a
/// single recomputation of the derived traces.
#[derive(Debug, Clone)]
pub struct SlowTimeBuffers {
    iq: RingBuffer<Complex64>,
    envelope: RingBuffer<f64>,
    wrapped_phase: RingBuffer<f64>,
    unwrapped_phase: RingBuffer<f64>,
    breathing: RingBuffer<f64>,
    heart: RingBuffer<f64>,
    timestamps: RingBuffer<f64>,
    pending: usize,
}

impl SlowTimeBuffers {
    pub fn new(capacity: usize) -> Self {
        Self {
            iq: RingBuffer::filled(capacity, Complex64::zero()),
            envelope: RingBuffer::filled(capacity, 0.0),
            wrapped_phase: RingBuffer::filled(capacity, 0.0),
            unwrapped_phase: RingBuffer::filled(capacity, 0.0),
            breathing: RingBuffer::filled(capacity, 0.0),
            heart: RingBuffer::filled(capacity, 0.0),
            timestamps: RingBuffer::filled(capacity, 0.0),
            pending: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.iq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iq.is_empty()
    }

    /// Frames appended since the last [`take_pending`](Self::take_pending).
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn take_pending(&mut self) -> usize {
        std::mem::take(&mut self.pending)
    }

    /// Appends one extracted sample. The derived traces receive placeholders
    /// that the next processing pass overwrites.
    pub fn push_sample(&mut self, sample: Complex64, timestamp: f64) {
        let phase = sample.arg();
        self.iq.push(sample);
        self.envelope.push(sample.norm());
        self.wrapped_phase.push(phase);
        self.unwrapped_phase.push(phase);
        let breathing = *self.breathing.newest();
        self.breathing.push(breathing);
        let heart = *self.heart.newest();
        self.heart.push(heart);
        self.timestamps.push(timestamp);
        self.pending = (self.pending + 1).min(self.len());
    }

    /// Unwraps the trailing `window` of the phase trace against its already
    /// unwrapped history and writes back the newest `batch` values.
    pub fn unwrap_recent(&mut self, window: usize, batch: usize) -> Vec<f64> {
        let unwrapped = unwrap_phase(&self.unwrapped_phase.last_n(window));
        let batch = batch.min(unwrapped.len());
        self.unwrapped_phase
            .overwrite_last(&unwrapped[unwrapped.len() - batch..]);
        unwrapped
    }

    pub fn write_breathing(&mut self, filtered: &[f64], batch: usize) {
        let batch = batch.min(filtered.len());
        self.breathing.overwrite_last(&filtered[filtered.len() - batch..]);
    }

    pub fn write_heart(&mut self, filtered: &[f64], batch: usize) {
        let batch = batch.min(filtered.len());
        self.heart.overwrite_last(&filtered[filtered.len() - batch..]);
    }

    pub fn recent_iq(&self, count: usize) -> Vec<Complex64> {
        self.iq.last_n(count)
    }

    pub fn recent_envelope(&self, count: usize) -> Vec<f64> {
        self.envelope.last_n(count)
    }

    pub fn recent_unwrapped(&self, count: usize) -> Vec<f64> {
        self.unwrapped_phase.last_n(count)
    }

    pub fn recent_breathing(&self, count: usize) -> Vec<f64> {
        self.breathing.last_n(count)
    }

    pub fn recent_heart(&self, count: usize) -> Vec<f64> {
        self.heart.last_n(count)
    }

    pub fn recent_timestamps(&self, count: usize) -> Vec<f64> {
        self.timestamps.last_n(count)
    }

    pub fn latest_timestamp(&self) -> f64 {
        *self.timestamps.newest()
    }

    pub fn traces(&self) -> SlowTimeTraces {
        let iq = self.iq.to_vec();
        SlowTimeTraces {
            timestamps: self.timestamps.to_vec(),
            in_phase: iq.iter().map(|c| c.re).collect(),
            quadrature: iq.iter().map(|c| c.im).collect(),
            envelope: self.envelope.to_vec(),
            wrapped_phase: self.wrapped_phase.to_vec(),
            unwrapped_phase: self.unwrapped_phase.to_vec(),
            breathing: self.breathing.to_vec(),
            heart: self.heart.to_vec(),
        }
    }
}
