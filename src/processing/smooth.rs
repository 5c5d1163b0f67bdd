//! Savitzky-Golay smoothing.
//!
//! The least-squares fit of an order-`p` polynomial over a window of `w`
//! equally spaced samples is linear in the samples, so the smoothed value at
//! any position inside the window is a fixed dot product. All `w` kernels
//! (rows of the window's hat matrix) are computed once: the middle row is
//! the ordinary convolution kernel and the others serve the first and last
//! `(w - 1) / 2` points, where the window is shifted inwards instead of
//! truncated.

use nalgebra::DMatrix;

use crate::config::{EdgeMode, SmoothingConfig};
use crate::error::ConfigError;

use super::linalg::vandermonde;

#[derive(Debug, Clone)]
pub struct SavitzkyGolay {
    config: SmoothingConfig,
    /// `kernels[j]` evaluates the window fit at window position `j`.
    kernels: Vec<Vec<f64>>,
}

impl SavitzkyGolay {
    pub fn new(config: SmoothingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let kernels = hat_rows(config.window, config.order).ok_or(ConfigError::OrderTooHigh {
            order: config.order,
            window: config.window,
        })?;
        Ok(Self { config, kernels })
    }

    pub fn window(&self) -> usize {
        self.config.window
    }

    /// The centred convolution kernel.
    pub fn coefficients(&self) -> &[f64] {
        &self.kernels[self.config.window / 2]
    }

    /// Smooth `signal`, returning a sequence of the same length.
    pub fn apply(&self, signal: &[f64]) -> Result<Vec<f64>, ConfigError> {
        let w = self.config.window;
        let n = signal.len();
        self.config.validate_for_len(n)?;
        let half = w / 2;

        let dot = |kernel: &[f64], start: usize| -> f64 {
            kernel
                .iter()
                .zip(&signal[start..start + w])
                .map(|(k, s)| k * s)
                .sum()
        };

        let centre = self.coefficients();
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let value = if i < half {
                match self.config.edge_mode {
                    EdgeMode::Shift => dot(&self.kernels[i], 0),
                    EdgeMode::Preserve => signal[i],
                }
            } else if i + half >= n {
                match self.config.edge_mode {
                    EdgeMode::Shift => dot(&self.kernels[i + w - n], n - w),
                    EdgeMode::Preserve => signal[i],
                }
            } else {
                dot(centre, i - half)
            };
            out.push(value);
        }
        Ok(out)
    }
}

/// Rows of `A (AᵀA)⁻¹ Aᵀ` for the window's Vandermonde matrix `A`.
fn hat_rows(window: usize, order: usize) -> Option<Vec<Vec<f64>>> {
    let half = (window / 2) as f64;
    let t: Vec<f64> = (0..window).map(|k| (k as f64 - half) / half).collect();
    let a = vandermonde(&t, order);
    let pinv: DMatrix<f64> = a.clone().pseudo_inverse(f64::EPSILON * window as f64).ok()?;
    let hat = a * pinv;
    Some(
        hat.row_iter()
            .map(|row| row.iter().copied().collect())
            .collect(),
    )
}
