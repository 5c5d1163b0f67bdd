//! Small signal helpers shared by the decomposition: edge taper, low-pass
//! filtering, integration and energy.

use std::f64::consts::PI;

/// Tukey (tapered cosine) window. `fraction` of the length is tapered on
/// each side; 0 gives a rectangular window.
pub fn tukey_window(len: usize, fraction: f64) -> Vec<f64> {
    let ramp = (fraction * len as f64).floor() as usize;
    (0..len)
        .map(|i| {
            let from_edge = i.min(len - 1 - i);
            if from_edge >= ramp {
                1.0
            } else {
                0.5 * (1.0 - (PI * (from_edge as f64 + 0.5) / ramp as f64).cos())
            }
        })
        .collect()
}

/// Windowed-sinc (Blackman) low-pass FIR with unit DC gain.
///
/// `cutoff` is in cycles per sample. The kernel spans about four periods of
/// the cutoff, clipped to an odd length no longer than `max_len`.
pub fn lowpass_kernel(cutoff: f64, max_len: usize) -> Vec<f64> {
    let wanted = (4.0 / cutoff).ceil() as usize | 1;
    let limit = if max_len % 2 == 1 { max_len } else { max_len.saturating_sub(1) };
    let len = wanted.min(limit.max(1));
    if len == 1 {
        return vec![1.0];
    }
    let m = (len - 1) as f64;
    let half = m / 2.0;
    let mut kernel: Vec<f64> = (0..len)
        .map(|i| {
            let k = i as f64 - half;
            let sinc = if k == 0.0 {
                2.0 * cutoff
            } else {
                (2.0 * PI * cutoff * k).sin() / (PI * k)
            };
            let blackman =
                0.42 - 0.5 * (2.0 * PI * i as f64 / m).cos() + 0.08 * (4.0 * PI * i as f64 / m).cos();
            sinc * blackman
        })
        .collect();
    let gain: f64 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= gain;
    }
    kernel
}

/// Convolve with a symmetric odd-length kernel, mirroring the signal at the
/// boundaries so the output keeps the input length.
pub fn convolve_reflect(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let half = (kernel.len() / 2) as isize;
    let last = n as isize - 1;
    let at = |j: isize| -> f64 {
        if last == 0 {
            return signal[0];
        }
        // Whole-sample symmetric reflection.
        let period = 2 * last;
        let mut j = j.rem_euclid(period);
        if j > last {
            j = period - j;
        }
        signal[j as usize]
    };
    (0..n as isize)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, c)| c * at(i + k as isize - half))
                .sum()
        })
        .collect()
}

/// Low-pass `signal` at `cutoff` cycles per sample.
pub fn lowpass(signal: &[f64], cutoff: f64) -> Vec<f64> {
    let kernel = lowpass_kernel(cutoff, signal.len());
    convolve_reflect(signal, &kernel)
}

/// Running trapezoidal integral with unit sample spacing, starting at 0.
pub fn cumulative_trapezoid(values: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    let mut out = Vec::with_capacity(values.len());
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            acc += 0.5 * (values[i - 1] + v);
        }
        out.push(acc);
    }
    out
}

/// Central-difference derivative with one-sided ends, unit spacing.
pub fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n)
            .map(|i| {
                if i == 0 {
                    values[1] - values[0]
                } else if i == n - 1 {
                    values[n - 1] - values[n - 2]
                } else {
                    0.5 * (values[i + 1] - values[i - 1])
                }
            })
            .collect(),
    }
}

pub fn energy(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}
