use crate::filters::{box_filter, hp_filter, FirFilter, SavitzkyGolay};
use crate::prelude::{Band, StageResult, VitalConfig};
use crate::telemetry::log::LogManager;

/// Breathing and heart extractors applied to the trailing unwrapped window.
///
/// Breathing: band-pass FIR, Savitzky-Golay, then a short box average.
/// Heart: Hodrick-Prescott trend removal, then band-pass FIR on the cycle.
pub struct FilterBank {
    sample_rate: f64,
    num_taps: usize,
    breathing_fir: FirFilter,
    heart_fir: FirFilter,
    savgol_max_window: usize,
    savgol_order: usize,
    smoother: Option<SavitzkyGolay>,
    box_size: usize,
    trend_lambda: f64,
    logger: LogManager,
}

impl FilterBank {
    pub fn new(config: &VitalConfig) -> StageResult<Self> {
        let sample_rate = config.sample_rate() as f64;
        let num_taps = config.filter_taps();
        let processing = &config.processing;
        Ok(Self {
            sample_rate,
            num_taps,
            breathing_fir: FirFilter::bandpass(config.bands.breathing, sample_rate, num_taps)?,
            heart_fir: FirFilter::bandpass(config.bands.heart, sample_rate, num_taps)?,
            savgol_max_window: processing.breathing_savgol_window,
            savgol_order: processing.savgol_order,
            smoother: None,
            box_size: processing.breathing_box_size,
            trend_lambda: processing.heart_trend_lambda_per_hz * sample_rate,
            logger: LogManager::new("filter-bank"),
        })
    }

    /// Redesigns the breathing filter; on error the current filter stays.
    pub fn set_breathing_band(&mut self, band: Band) -> StageResult<()> {
        self.breathing_fir = FirFilter::bandpass(band, self.sample_rate, self.num_taps)?;
        self.logger.notice(&format!(
            "breathing band now {:.2}-{:.2} Hz",
            band.low_hz, band.high_hz
        ));
        Ok(())
    }

    pub fn set_heart_band(&mut self, band: Band) -> StageResult<()> {
        self.heart_fir = FirFilter::bandpass(band, self.sample_rate, self.num_taps)?;
        self.logger.notice(&format!(
            "heart band now {:.2}-{:.2} Hz",
            band.low_hz, band.high_hz
        ));
        Ok(())
    }

    pub fn breathing_band(&self) -> Band {
        self.breathing_fir.band()
    }

    pub fn heart_band(&self) -> Band {
        self.heart_fir.band()
    }

    pub fn breathing_taps(&self) -> &[f64] {
        self.breathing_fir.taps()
    }

    pub fn heart_taps(&self) -> &[f64] {
        self.heart_fir.taps()
    }

    pub fn breathing(&mut self, unwrapped: &[f64]) -> StageResult<Vec<f64>> {
        let filtered = self.breathing_fir.apply(unwrapped);
        let smoothed = match SavitzkyGolay::fitted_window(self.savgol_max_window, filtered.len()) {
            Some(window) => {
                if self.smoother.as_ref().map(SavitzkyGolay::window) != Some(window) {
                    self.smoother = Some(SavitzkyGolay::new(window, self.savgol_order)?);
                }
                match &self.smoother {
                    Some(smoother) => smoother.smooth(&filtered),
                    None => filtered,
                }
            }
            None => filtered,
        };
        Ok(box_filter(&smoothed, self.box_size))
    }

    pub fn heart(&self, unwrapped: &[f64]) -> StageResult<Vec<f64>> {
        let decomposition = hp_filter(unwrapped, self.trend_lambda)?;
        Ok(self.heart_fir.apply(&decomposition.cycle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(freq: f64, fs: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|n| (2.0 * PI * freq * n as f64 / fs).sin())
            .collect()
    }

    fn tail_rms(signal: &[f64]) -> f64 {
        crate::math::StatsHelper::rms(&signal[signal.len() / 2..])
    }

    #[test]
    fn breathing_path_keeps_breathing_and_rejects_heart() {
        let config = VitalConfig::default();
        let mut bank = FilterBank::new(&config).unwrap();
        let breathing = bank.breathing(&tone(0.3, 20.0, 400)).unwrap();
        let heart = bank.breathing(&tone(1.6, 20.0, 400)).unwrap();
        assert_eq!(breathing.len(), 400);
        assert!(tail_rms(&breathing) > 0.4);
        assert!(tail_rms(&heart) < 0.1);
    }

    #[test]
    fn heart_path_keeps_heartbeat_and_rejects_breathing() {
        let config = VitalConfig::default();
        let bank = FilterBank::new(&config).unwrap();
        let heart = bank.heart(&tone(1.2, 20.0, 400)).unwrap();
        let breathing = bank.heart(&tone(0.25, 20.0, 400)).unwrap();
        assert!(tail_rms(&heart) > 0.2);
        assert!(tail_rms(&breathing) < 0.05);
    }

    #[test]
    fn band_change_rebuilds_taps_and_bad_band_keeps_old_filter() {
        let config = VitalConfig::default();
        let mut bank = FilterBank::new(&config).unwrap();
        let before = bank.breathing_taps().to_vec();

        bank.set_breathing_band(Band::new(0.2, 0.5)).unwrap();
        assert_ne!(bank.breathing_taps(), before.as_slice());
        assert_eq!(bank.breathing_taps().len(), 21);
        assert_eq!(bank.breathing_band(), Band::new(0.2, 0.5));

        let current = bank.heart_taps().to_vec();
        assert!(bank.set_heart_band(Band::new(2.0, 11.0)).is_err());
        assert_eq!(bank.heart_taps(), current.as_slice());
    }
}
