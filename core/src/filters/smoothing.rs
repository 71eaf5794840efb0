/// Centred moving average; samples beyond either end are mirrored
/// (`d c b a | a b c d | d c b a`).
pub fn box_filter(data: &[f64], size: usize) -> Vec<f64> {
    let n = data.len();
    if n == 0 || size <= 1 {
        return data.to_vec();
    }
    let before = (size / 2) as isize;
    let reflect = |idx: isize| -> f64 {
        let n = n as isize;
        let mut i = idx;
        // Repeated mirroring for windows wider than the data.
        loop {
            if i < 0 {
                i = -i - 1;
            } else if i >= n {
                i = 2 * n - i - 1;
            } else {
                break;
            }
        }
        data[i as usize]
    };

    (0..n as isize)
        .map(|i| {
            let start = i - before;
            (start..start + size as isize).map(reflect).sum::<f64>() / size as f64
        })
        .collect()
}

/// Sliding median over an odd `kernel`, treating samples beyond the ends as zero.
pub fn median_filter(data: &[f64], kernel: usize) -> Vec<f64> {
    let n = data.len();
    if n == 0 || kernel <= 1 {
        return data.to_vec();
    }
    let kernel = if kernel % 2 == 0 { kernel + 1 } else { kernel };
    let half = kernel / 2;

    let mut window = Vec::with_capacity(kernel);
    (0..n)
        .map(|i| {
            window.clear();
            window.extend((0..kernel).map(|k| {
                let idx = i + k;
                if idx < half || idx - half >= n {
                    0.0
                } else {
                    data[idx - half]
                }
            }));
            window.sort_by(|a, b| a.total_cmp(b));
            window[half]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_filter_mirrors_edges() {
        let out = box_filter(&[1.0, 2.0, 3.0, 4.0, 5.0], 5);
        // first window: 2 1 | 1 2 3
        assert!((out[0] - 1.8).abs() < 1e-12);
        assert!((out[2] - 3.0).abs() < 1e-12);
        // last window: 3 4 5 | 5 4
        assert!((out[4] - 4.2).abs() < 1e-12);
    }

    #[test]
    fn box_filter_keeps_constant_signal() {
        let out = box_filter(&[2.5; 3], 5);
        assert!(out.iter().all(|&v| (v - 2.5).abs() < 1e-12));
    }

    #[test]
    fn median_filter_removes_impulse_and_zero_pads() {
        let out = median_filter(&[1.0, 1.0, 100.0, 1.0, 1.0, 1.0], 5);
        assert_eq!(out[2], 1.0);
        // window at index 0: 0 0 | 1 1 100
        assert_eq!(out[0], 1.0);
        // window at index 5: 1 1 1 | 0 0
        assert_eq!(out[5], 1.0);
    }
}
