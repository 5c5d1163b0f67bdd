//! Deterministic synthetic Raman spectra for tests and sample data.

use crate::data::model::Spectrum;
use crate::error::InputError;

/// Minimal deterministic PRNG (xoshiro256**)
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    pub fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianPeak {
    pub center: f64,
    pub sigma: f64,
    pub amplitude: f64,
}

impl GaussianPeak {
    pub fn at(&self, x: f64) -> f64 {
        self.amplitude * (-(x - self.center).powi(2) / (2.0 * self.sigma.powi(2))).exp()
    }
}

/// Polynomial background + Gaussian peaks + white noise on a uniform grid.
///
/// Background coefficients are in ascending powers of `t`, the grid mapped
/// linearly onto `[-1, 1]`, so high degrees stay well scaled.
#[derive(Debug, Clone)]
pub struct SyntheticSpectrum {
    start: f64,
    step: f64,
    len: usize,
    background: Vec<f64>,
    peaks: Vec<GaussianPeak>,
    noise: f64,
    seed: u64,
}

impl SyntheticSpectrum {
    pub fn new(start: f64, step: f64, len: usize) -> Self {
        Self {
            start,
            step,
            len,
            background: Vec::new(),
            peaks: Vec::new(),
            noise: 0.0,
            seed: 0,
        }
    }

    pub fn background(mut self, coefficients: &[f64]) -> Self {
        self.background = coefficients.to_vec();
        self
    }

    pub fn peak(mut self, center: f64, sigma: f64, amplitude: f64) -> Self {
        self.peaks.push(GaussianPeak {
            center,
            sigma,
            amplitude,
        });
        self
    }

    pub fn noise(mut self, std_dev: f64, seed: u64) -> Self {
        self.noise = std_dev;
        self.seed = seed;
        self
    }

    pub fn peaks(&self) -> &[GaussianPeak] {
        &self.peaks
    }

    pub fn wavenumber(&self) -> Vec<f64> {
        (0..self.len).map(|i| self.start + i as f64 * self.step).collect()
    }

    pub fn background_at(&self, x: f64) -> f64 {
        let half_range = 0.5 * self.step * self.len.saturating_sub(1) as f64;
        let t = if half_range > 0.0 {
            (x - self.start - half_range) / half_range
        } else {
            0.0
        };
        self.background.iter().rev().fold(0.0, |acc, c| acc * t + c)
    }

    /// Background only, sampled on the grid.
    pub fn background_curve(&self) -> Vec<f64> {
        self.wavenumber().into_iter().map(|x| self.background_at(x)).collect()
    }

    /// Background plus peaks, without noise.
    pub fn clean(&self) -> Vec<f64> {
        self.wavenumber()
            .into_iter()
            .map(|x| self.background_at(x) + self.peaks.iter().map(|p| p.at(x)).sum::<f64>())
            .collect()
    }

    pub fn build(&self) -> Result<Spectrum, InputError> {
        let mut rng = SimpleRng::new(self.seed);
        let intensity = self
            .clean()
            .into_iter()
            .map(|y| {
                if self.noise > 0.0 {
                    y + rng.gauss(0.0, self.noise)
                } else {
                    y
                }
            })
            .collect();
        Spectrum::new(self.wavenumber(), intensity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rng_is_deterministic() {
        let mut a = SimpleRng::new(42);
        let mut b = SimpleRng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        assert_ne!(SimpleRng::new(1).next_u64(), SimpleRng::new(2).next_u64());
    }

    #[test]
    fn gauss_moments() {
        let mut rng = SimpleRng::new(7);
        let samples: Vec<f64> = (0..20_000).map(|_| rng.gauss(1.0, 2.0)).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let var = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        assert_abs_diff_eq!(mean, 1.0, epsilon = 0.05);
        assert_abs_diff_eq!(var.sqrt(), 2.0, epsilon = 0.05);
    }

    #[test]
    fn background_spans_unit_interval() {
        let s = SyntheticSpectrum::new(100.0, 2.0, 51).background(&[1.0, 2.0, 3.0]);
        assert_abs_diff_eq!(s.background_at(100.0), 1.0 - 2.0 + 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.background_at(150.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.background_at(200.0), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn clean_includes_peaks() {
        let s = SyntheticSpectrum::new(0.0, 1.0, 101)
            .background(&[5.0])
            .peak(50.0, 4.0, 20.0);
        let y = s.clean();
        assert_abs_diff_eq!(y[50], 25.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y[0], 5.0, epsilon = 1e-6);
    }

    #[test]
    fn build_applies_seeded_noise() {
        let s = SyntheticSpectrum::new(0.0, 1.0, 64).noise(0.1, 3);
        let a = s.build().unwrap();
        assert_eq!(a, s.build().unwrap());
        assert!(a.intensity().iter().any(|&v| v != 0.0));
    }
}
