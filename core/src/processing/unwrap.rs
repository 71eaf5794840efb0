use std::f64::consts::PI;

/// Removes 2π discontinuities: whenever consecutive samples differ by more
/// than π the remainder of the trace is shifted by the nearest multiple of 2π.
/// The first sample is kept as-is.
pub fn unwrap_phase(phase: &[f64]) -> Vec<f64> {
    let mut unwrapped = Vec::with_capacity(phase.len());
    let Some(&first) = phase.first() else {
        return unwrapped;
    };
    unwrapped.push(first);

    let mut correction = 0.0;
    for pair in phase.windows(2) {
        let delta = pair[1] - pair[0];
        let mut wrapped = (delta + PI).rem_euclid(2.0 * PI) - PI;
        // Keep +π jumps positive.
        if wrapped == -PI && delta > 0.0 {
            wrapped = PI;
        }
        if delta.abs() >= PI {
            correction += wrapped - delta;
        }
        unwrapped.push(pair[1] + correction);
    }
    unwrapped
}

/// Maps an angle into `(-π, π]`.
pub fn wrap_phase(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}
