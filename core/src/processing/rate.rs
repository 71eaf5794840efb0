use crate::interface::SpectralPeak;
use crate::math::peaks::{find_peaks, PeakCriteria};
use crate::prelude::{Band, StageResult, VitalConfig};
use crate::processing::ring_buffer::RingBuffer;

/// Per-band peak picker with sample-and-hold and temporal smoothing.
///
/// Every processing pass pushes exactly one entry into both the index
/// history and the rate history, however many frames the pass folded in. When no
/// peak is found the previous index is repeated; until the estimation window
/// is filled with real peaks the previous rate is repeated.
#[derive(Debug, Clone)]
pub struct RateEstimator {
    band: Band,
    sample_rate: f64,
    fft_size: usize,
    search: (usize, usize),
    min_distance: usize,
    peak_distance_hz: f64,
    bias_bpm: f64,
    estimation_len: usize,
    indices: RingBuffer<usize>,
    rates: RingBuffer<f64>,
}

impl RateEstimator {
    pub fn new(band: Band, config: &VitalConfig) -> StageResult<Self> {
        let sample_rate = config.sample_rate() as f64;
        band.validate(sample_rate)?;
        let fft_size = config.fft_size_vital();
        let capacity = config.buffer_samples();
        let peak_distance_hz = config.processing.peak_distance_hz;
        Ok(Self {
            band,
            sample_rate,
            fft_size,
            search: search_bins(band, sample_rate, fft_size),
            min_distance: min_distance(peak_distance_hz, sample_rate, fft_size),
            peak_distance_hz,
            bias_bpm: config.processing.rate_bias_bpm,
            estimation_len: config.estimation_samples().min(capacity),
            indices: RingBuffer::filled(capacity, 0),
            rates: RingBuffer::filled(capacity, 0.0),
        })
    }

    /// Moves the search bounds; the histories are kept.
    pub fn set_band(&mut self, band: Band) -> StageResult<()> {
        band.validate(self.sample_rate)?;
        self.band = band;
        self.search = search_bins(band, self.sample_rate, self.fft_size);
        self.min_distance = min_distance(self.peak_distance_hz, self.sample_rate, self.fft_size);
        Ok(())
    }

    pub fn band(&self) -> Band {
        self.band
    }

    /// Half-open bin interval searched for peaks.
    pub fn search_bins(&self) -> (usize, usize) {
        self.search
    }

    pub fn bin_hz(&self) -> f64 {
        self.sample_rate / self.fft_size as f64
    }

    /// Strongest local maximum inside the band, as an absolute bin index.
    pub fn pick_peak(&self, spectrum: &[f64]) -> Option<usize> {
        let end = self.search.1.min(spectrum.len());
        if self.search.0 >= end {
            return None;
        }
        let region = &spectrum[self.search.0..end];
        let peaks = find_peaks(region, &PeakCriteria::with_distance(self.min_distance));
        peaks
            .into_iter()
            .fold(None, |best: Option<usize>, idx| match best {
                Some(current) if region[current] >= region[idx] => best,
                _ => Some(idx),
            })
            .map(|idx| idx + self.search.0)
    }

    /// Feeds one spectrum and returns the current per-minute rate.
    pub fn update(&mut self, spectrum: &[f64]) -> f64 {
        let previous = *self.indices.newest();
        let index = self.pick_peak(spectrum).unwrap_or(previous);
        self.indices.push(index);

        let rate = match self.smoothed_bin() {
            Some(bin) => (bin as f64 * self.bin_hz() * 60.0).round() + self.bias_bpm,
            None => *self.rates.newest(),
        };
        self.rates.push(rate);
        rate
    }

    /// Rounded mean of the recent indices, once the window holds real peaks.
    pub fn smoothed_bin(&self) -> Option<usize> {
        let start = self.indices.from_newest(self.estimation_len - 1).copied()?;
        if start == 0 {
            return None;
        }
        let recent = self.indices.last_n(self.estimation_len);
        let mean = recent.iter().sum::<usize>() as f64 / recent.len() as f64;
        Some(mean.round() as usize)
    }

    /// Spectrum value at the smoothed bin, for marking the estimate.
    pub fn marker(&self, spectrum: &[f64]) -> Option<SpectralPeak> {
        let bin = self.smoothed_bin()?;
        spectrum.get(bin).map(|&magnitude| SpectralPeak {
            bin,
            frequency_hz: bin as f64 * self.bin_hz(),
            magnitude,
        })
    }

    pub fn current_rate(&self) -> f64 {
        *self.rates.newest()
    }

    /// Mean of the newest `count` rates.
    pub fn recent_mean_rate(&self, count: usize) -> f64 {
        let recent = self.rates.last_n(count.max(1));
        recent.iter().sum::<f64>() / recent.len() as f64
    }

    pub fn indices(&self) -> Vec<usize> {
        self.indices.to_vec()
    }

    pub fn rates(&self) -> Vec<f64> {
        self.rates.to_vec()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

fn search_bins(band: Band, sample_rate: f64, fft_size: usize) -> (usize, usize) {
    let to_bin = |hz: f64| (hz * fft_size as f64 / sample_rate).floor() as usize;
    (to_bin(band.low_hz), to_bin(band.high_hz))
}

fn min_distance(distance_hz: f64, sample_rate: f64, fft_size: usize) -> usize {
    ((distance_hz * fft_size as f64 / sample_rate).floor() as usize).max(1)
}
