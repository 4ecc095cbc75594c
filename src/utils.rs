//! Numerical helpers shared by the kernels, stimuli and integrator.

/// Sample frequencies of a discrete Fourier transform of length `n` with sample spacing `d`, in FFT order.
///
/// The first half holds the non-negative frequencies, the second half the negative ones,
/// e.g., `[0, 1, -2, -1] / (4 d)` for `n = 4`.
pub fn fftfreq(n: usize, d: f64) -> Vec<f64> {
    let cutoff = (n + 1) / 2;
    (0..n)
        .map(|k| {
            let k = if k < cutoff {
                k as f64
            } else {
                k as f64 - n as f64
            };
            k / (n as f64 * d)
        })
        .collect()
}

/// Heaviside step function, with the convention H(0) = 1.
pub fn heaviside(x: f64) -> f64 {
    if x >= 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Returns the position of the value closest to the target, if any.
pub fn nearest_index(values: &[f64], target: f64) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (*a - target)
                .abs()
                .partial_cmp(&(*b - target).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
}

/// Bessel function of the first kind of order one.
///
/// Rational approximation for |x| < 8 and asymptotic expansion beyond, accurate to about 1e-8.
pub fn bessel_j1(x: f64) -> f64 {
    let ax = x.abs();
    if ax < 8.0 {
        let y = x * x;
        let num = x
            * (72362614232.0
                + y * (-7895059235.0
                    + y * (242396853.1
                        + y * (-2972611.439 + y * (15704.48260 + y * (-30.16036606))))));
        let den = 144725228442.0
            + y * (2300535178.0
                + y * (18583304.74 + y * (99447.43394 + y * (376.9991397 + y))));
        num / den
    } else {
        let z = 8.0 / ax;
        let y = z * z;
        let xx = ax - 2.356194491;
        let p = 1.0
            + y * (0.183105e-2
                + y * (-0.3516396496e-4 + y * (0.2457520174e-5 + y * (-0.240337019e-6))));
        let q = 0.04687499995
            + y * (-0.2002690873e-3
                + y * (0.8449199096e-5 + y * (-0.88228987e-6 + y * 0.105787412e-6)));
        let ans = (0.636619772 / ax).sqrt() * (xx.cos() * p - z * xx.sin() * q);
        if x < 0.0 {
            -ans
        } else {
            ans
        }
    }
}

/// Fourier transform of the indicator function of a disk with the given radius, centred at the origin.
pub fn disk_ft(k: f64, radius: f64) -> f64 {
    let x = k * radius;
    if x.abs() < 1e-8 {
        std::f64::consts::PI * radius * radius
    } else {
        2.0 * std::f64::consts::PI * radius * bessel_j1(x) / k
    }
}
