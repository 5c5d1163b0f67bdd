//! Analytic signal via the FFT.
//!
//! ```text
//! z(t) = x(t) + j·H{x}(t)
//! ```
//! obtained by zeroing the negative-frequency half of the spectrum and
//! doubling the positive half (DC and, for even lengths, Nyquist untouched).

use num_complex::Complex;
use rustfft::FftPlanner;

/// Analytic signal of a real sequence.
pub fn analytic_signal(x: &[f64]) -> Vec<Complex<f64>> {
    let n = x.len();
    if n == 0 {
        return Vec::new();
    }

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut buffer: Vec<Complex<f64>> = x.iter().map(|&v| Complex::new(v, 0.0)).collect();
    forward.process(&mut buffer);

    let half = n / 2;
    for (k, bin) in buffer.iter_mut().enumerate().skip(1) {
        let gain = if k < half || (k == half && n % 2 == 1) {
            2.0
        } else if k == half {
            1.0
        } else {
            0.0
        };
        *bin *= gain;
    }

    inverse.process(&mut buffer);
    let scale = 1.0 / n as f64;
    for v in &mut buffer {
        *v *= scale;
    }
    buffer
}
