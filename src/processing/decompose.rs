//! Hilbert vibration decomposition.
//!
//! Repeatedly pulls the dominant (largest-amplitude) slowly modulated
//! oscillation out of a residual signal:
//!
//! ```text
//!  residual ──taper──► analytic signal ──► envelope A(t), inst. frequency ω(t)
//!                                                        │ low-pass
//!                                                        ▼
//!                                  ω̄(t) = frequency of the dominant component
//!                                                        │ demodulate
//!                                                        ▼
//!                                  mode(t) = a(t)·cos(φ(t))  ──► residual -= mode
//! ```
//!
//! Low-passing ω(t) leaves the frequency of the component with the largest
//! amplitude because the beat terms between components oscillate around it.
//! The loop ends when the residual energy drops below the configured
//! fraction of the input energy or `max_modes` modes have been taken; in the
//! latter case the result is returned with `converged == false`.

use std::f64::consts::PI;

use crate::config::{Demodulation, DecompositionConfig};
use crate::error::{ConfigError, InputError};

use super::filter::{cumulative_trapezoid, energy, gradient, lowpass, tukey_window};
use super::hilbert::analytic_signal;

/// Minimum signal length accepted by the decomposition.
const MIN_SIGNAL_LEN: usize = 3;

/// One extracted oscillatory component, aligned to the input samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Mode {
    amplitude: Vec<f64>,
    frequency: Vec<f64>,
    signal: Vec<f64>,
}

impl Mode {
    /// Instantaneous amplitude.
    pub fn amplitude(&self) -> &[f64] {
        &self.amplitude
    }

    /// Instantaneous frequency in cycles per sample.
    pub fn frequency(&self) -> &[f64] {
        &self.frequency
    }

    /// Synthesized component.
    pub fn signal(&self) -> &[f64] {
        &self.signal
    }

    pub fn energy(&self) -> f64 {
        energy(&self.signal)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecompositionResult {
    modes: Vec<Mode>,
    residual: Vec<f64>,
    converged: bool,
    residual_energy_fraction: f64,
}

impl DecompositionResult {
    /// Modes in extraction order.
    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    pub fn residual(&self) -> &[f64] {
        &self.residual
    }

    /// Whether the residual energy reached the configured threshold.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Residual energy relative to the input energy (0 for a zero input).
    pub fn residual_energy_fraction(&self) -> f64 {
        self.residual_energy_fraction
    }

    /// Sum of all modes plus the residual.
    pub fn reconstruct(&self) -> Vec<f64> {
        let mut out = self.residual.clone();
        for mode in &self.modes {
            for (o, m) in out.iter_mut().zip(&mode.signal) {
                *o += m;
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct Decomposer {
    config: DecompositionConfig,
}

impl Decomposer {
    pub fn new(config: DecompositionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn decompose(&self, signal: &[f64]) -> Result<DecompositionResult, InputError> {
        if signal.len() < MIN_SIGNAL_LEN {
            return Err(InputError::TooFewPoints {
                required: MIN_SIGNAL_LEN,
                available: signal.len(),
            });
        }
        if let Some(index) = signal.iter().position(|v| !v.is_finite()) {
            return Err(InputError::NonFinite {
                axis: "signal",
                index,
            });
        }

        let total = energy(signal);
        let fraction_of = |r: &[f64]| if total > 0.0 { energy(r) / total } else { 0.0 };
        let taper = tukey_window(signal.len(), self.config.edge_taper_fraction);

        let mut residual = signal.to_vec();
        let mut modes = Vec::new();

        let converged = loop {
            let fraction = fraction_of(&residual);
            if fraction < self.config.residual_energy_threshold {
                break true;
            }
            if modes.len() >= self.config.max_modes {
                break false;
            }
            let Some(mode) = extract_mode(&residual, &taper, &self.config) else {
                log::debug!("decomposition stalled after {} modes", modes.len());
                break false;
            };
            residual = subtract(&residual, &mode.signal);
            log::debug!(
                "mode {}: residual energy fraction {:.4}",
                modes.len(),
                fraction_of(&residual)
            );
            modes.push(mode);
        };

        let residual_energy_fraction = fraction_of(&residual);
        if !converged {
            log::warn!(
                "decomposition did not converge: {} modes, residual energy fraction {:.4} (threshold {})",
                modes.len(),
                residual_energy_fraction,
                self.config.residual_energy_threshold
            );
        }

        Ok(DecompositionResult {
            modes,
            residual,
            converged,
            residual_energy_fraction,
        })
    }
}

fn subtract(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// Extract the dominant component of `residual`. `None` when nothing
/// further can be taken out.
fn extract_mode(residual: &[f64], taper: &[f64], config: &DecompositionConfig) -> Option<Mode> {
    let x: Vec<f64> = residual.iter().zip(taper).map(|(r, w)| r * w).collect();
    let z = analytic_signal(&x);
    let re: Vec<f64> = z.iter().map(|c| c.re).collect();
    let im: Vec<f64> = z.iter().map(|c| c.im).collect();
    let envelope: Vec<f64> = z.iter().map(|c| c.norm()).collect();

    let peak = envelope.iter().fold(0.0_f64, |m, &a| m.max(a));
    if peak <= 0.0 {
        return None;
    }
    let floor = (config.envelope_floor * peak).max(f64::MIN_POSITIVE);

    // dφ/dt = (re·im' − im·re') / |z|², with |z| floored.
    let d_re = gradient(&re);
    let d_im = gradient(&im);
    let inst_freq: Vec<f64> = (0..x.len())
        .map(|i| {
            let a = envelope[i].max(floor);
            (re[i] * d_im[i] - im[i] * d_re[i]) / (a * a) / (2.0 * PI)
        })
        .collect();
    let frequency = lowpass(&inst_freq, config.lowpass_cutoff);

    let (amplitude, signal) = match config.demodulation {
        Demodulation::Synchronous => synchronous(&x, &frequency, config.lowpass_cutoff),
        Demodulation::Envelope => {
            let amplitude = lowpass(&envelope, config.lowpass_cutoff);
            let signal = amplitude
                .iter()
                .zip(&z)
                .map(|(a, c)| a * c.im.atan2(c.re).cos())
                .collect();
            (amplitude, signal)
        }
    };

    // Subtracting the mode must lower the residual energy. When the raw
    // estimate would not (DC-like content doubles under synchronous
    // demodulation), fall back to its least-squares scale.
    let own = energy(&signal);
    let cross: f64 = residual.iter().zip(&signal).map(|(r, m)| r * m).sum();
    if own <= f64::MIN_POSITIVE || cross <= 0.0 {
        return None;
    }
    let scale = if own < 2.0 * cross { 1.0 } else { cross / own };
    let reduction = scale * (2.0 * cross - scale * own);
    if reduction <= energy(residual) * f64::EPSILON {
        return None;
    }

    Some(Mode {
        amplitude: amplitude.iter().map(|a| a * scale).collect(),
        frequency,
        signal: signal.iter().map(|s| s * scale).collect(),
    })
}

/// Demodulate `x` against the carrier `cos(2π∫f)`; the low-passed in-phase
/// and quadrature products give the slowly varying amplitude and phase.
fn synchronous(x: &[f64], frequency: &[f64], cutoff: f64) -> (Vec<f64>, Vec<f64>) {
    let theta: Vec<f64> = cumulative_trapezoid(frequency)
        .into_iter()
        .map(|c| 2.0 * PI * c)
        .collect();
    let in_phase: Vec<f64> = x.iter().zip(&theta).map(|(v, t)| v * t.cos()).collect();
    let quadrature: Vec<f64> = x.iter().zip(&theta).map(|(v, t)| v * t.sin()).collect();
    let in_phase = lowpass(&in_phase, cutoff);
    let quadrature = lowpass(&quadrature, cutoff);

    // x ≈ a·cos(θ + φ) with a = 2·|I + jQ| and a·cos(θ + φ) = 2(I·cosθ + Q·sinθ).
    let amplitude = in_phase
        .iter()
        .zip(&quadrature)
        .map(|(i, q)| 2.0 * i.hypot(*q))
        .collect();
    let signal = theta
        .iter()
        .zip(in_phase.iter().zip(&quadrature))
        .map(|(t, (i, q))| 2.0 * (i * t.cos() + q * t.sin()))
        .collect();
    (amplitude, signal)
}
