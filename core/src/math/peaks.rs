//! Local-maximum search with height, spacing and prominence constraints.
//!
//! Flat-topped peaks report the (rounded-down) middle of the plateau. The
//! constraints are applied in order: height, distance, prominence. When two
//! peaks are closer than the distance, the higher one survives.

/// Optional constraints for [`find_peaks`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeakCriteria {
    pub min_height: Option<f64>,
    /// Minimum index separation between reported peaks.
    pub min_distance: usize,
    pub min_prominence: Option<f64>,
}

impl PeakCriteria {
    pub fn with_distance(min_distance: usize) -> Self {
        Self {
            min_distance,
            ..Default::default()
        }
    }
}

/// Indices of local maxima in `data` satisfying `criteria`, ascending.
pub fn find_peaks(data: &[f64], criteria: &PeakCriteria) -> Vec<usize> {
    let mut peaks = local_maxima(data);

    if let Some(min_height) = criteria.min_height {
        peaks.retain(|&p| data[p] >= min_height);
    }

    if criteria.min_distance > 1 && peaks.len() > 1 {
        peaks = select_by_distance(data, &peaks, criteria.min_distance);
    }

    if let Some(min_prominence) = criteria.min_prominence {
        peaks.retain(|&p| prominence(data, p) >= min_prominence);
    }

    peaks
}

fn local_maxima(data: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if data.len() < 3 {
        return peaks;
    }

    let last = data.len() - 1;
    let mut i = 1;
    while i < last {
        if data[i - 1] < data[i] {
            let mut ahead = i + 1;
            while ahead < last && data[ahead] == data[i] {
                ahead += 1;
            }
            if data[ahead] < data[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

fn select_by_distance(data: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    let mut keep = vec![true; peaks.len()];
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| data[peaks[a]].total_cmp(&data[peaks[b]]));

    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}

/// Height of a peak above the higher of its two surrounding bases.
pub fn prominence(data: &[f64], peak: usize) -> f64 {
    let height = data[peak];

    let mut left_min = height;
    let mut i = peak;
    loop {
        if data[i] > height {
            break;
        }
        left_min = left_min.min(data[i]);
        if i == 0 {
            break;
        }
        i -= 1;
    }

    let mut right_min = height;
    for &value in &data[peak..] {
        if value > height {
            break;
        }
        right_min = right_min.min(value);
    }

    height - left_min.max(right_min)
}
