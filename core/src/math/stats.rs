pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f64).sqrt()
    }

    pub fn mean(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    /// Population variance.
    pub fn variance(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let mean = Self::mean(samples);
        samples.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / samples.len() as f64
    }

    /// Percentile in `[0, 100]` with linear interpolation between order statistics.
    pub fn percentile(samples: &[f64], percent: f64) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let rank = percent.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;
        let fraction = rank - lower as f64;
        sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
    }

    pub fn argmax(samples: &[f64]) -> Option<usize> {
        samples
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (idx, &value)| match best {
                Some((_, current)) if current >= value => best,
                _ => Some((idx, value)),
            })
            .map(|(idx, _)| idx)
    }
}
