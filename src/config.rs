//! Stage configuration.
//!
//! Each stage owns an independent structure with documented defaults and a
//! `validate` method that runs before any computation. [`PipelineConfig`]
//! bundles them and can be read from a JSON file.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Baseline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// Polynomial degree of the background model.
    pub degree: usize,
    /// Upper bound on reweighting iterations.
    pub max_iterations: usize,
    /// Relative change of the weight vector below which reweighting stops.
    pub tolerance: f64,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            degree: 4,
            max_iterations: 50,
            tolerance: 1e-3,
        }
    }
}

impl BaselineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.degree < 1 {
            return Err(ConfigError::ZeroDegree);
        }
        if self.max_iterations < 1 {
            return Err(ConfigError::ZeroCount {
                field: "baseline.max_iterations",
            });
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "baseline.tolerance",
                value: self.tolerance,
                range: "(0, inf)",
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Smoothing
// ---------------------------------------------------------------------------

/// How the first and last `(window - 1) / 2` points are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMode {
    /// Refit with a window of the same length shifted inwards.
    #[default]
    Shift,
    /// Leave the edge points untouched.
    Preserve,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Window length in samples; odd, at least 3.
    pub window: usize,
    /// Local polynomial order; strictly smaller than `window`.
    pub order: usize,
    pub edge_mode: EdgeMode,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window: 11,
            order: 3,
            edge_mode: EdgeMode::Shift,
        }
    }
}

impl SmoothingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window % 2 == 0 {
            return Err(ConfigError::EvenWindow(self.window));
        }
        if self.window < 3 {
            return Err(ConfigError::WindowTooSmall(self.window));
        }
        if self.order >= self.window {
            return Err(ConfigError::OrderTooHigh {
                order: self.order,
                window: self.window,
            });
        }
        Ok(())
    }

    /// Validation that also needs the signal length.
    pub fn validate_for_len(&self, len: usize) -> Result<(), ConfigError> {
        self.validate()?;
        if self.window > len {
            return Err(ConfigError::WindowTooLong {
                window: self.window,
                len,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Decomposition
// ---------------------------------------------------------------------------

/// Amplitude/frequency estimation strategy for one extracted mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Demodulation {
    /// Demodulate against a carrier built from the low-passed instantaneous
    /// frequency, then low-pass the in-phase and quadrature products.
    #[default]
    Synchronous,
    /// Single pass: low-passed analytic envelope times analytic phase.
    Envelope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionConfig {
    pub max_modes: usize,
    /// Stop once residual energy falls below this fraction of the input energy.
    pub residual_energy_threshold: f64,
    /// Fraction of the signal tapered on each side before the transform.
    pub edge_taper_fraction: f64,
    /// Low-pass cutoff in cycles per sample.
    pub lowpass_cutoff: f64,
    pub demodulation: Demodulation,
    /// Envelope floor relative to the envelope maximum, used in every
    /// amplitude-dependent division.
    pub envelope_floor: f64,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            max_modes: 3,
            residual_energy_threshold: 0.05,
            edge_taper_fraction: 0.05,
            lowpass_cutoff: 0.02,
            demodulation: Demodulation::Synchronous,
            envelope_floor: 1e-6,
        }
    }
}

impl DecompositionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_modes < 1 {
            return Err(ConfigError::ZeroCount {
                field: "decomposition.max_modes",
            });
        }
        let t = self.residual_energy_threshold;
        if !(t > 0.0 && t < 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "decomposition.residual_energy_threshold",
                value: t,
                range: "(0, 1)",
            });
        }
        let f = self.edge_taper_fraction;
        if !(f >= 0.0 && f < 0.5) {
            return Err(ConfigError::OutOfRange {
                field: "decomposition.edge_taper_fraction",
                value: f,
                range: "[0, 0.5)",
            });
        }
        let c = self.lowpass_cutoff;
        if !(c > 0.0 && c < 0.5) {
            return Err(ConfigError::OutOfRange {
                field: "decomposition.lowpass_cutoff",
                value: c,
                range: "(0, 0.5)",
            });
        }
        let e = self.envelope_floor;
        if !(e.is_finite() && e > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "decomposition.envelope_floor",
                value: e,
                range: "(0, inf)",
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Peak detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    pub min_prominence: f64,
    /// Minimum distance between reported peaks, in wavenumber units.
    pub min_separation: f64,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            min_prominence: 1.0,
            min_separation: 5.0,
        }
    }
}

impl PeakConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_prominence.is_finite() && self.min_prominence > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "peaks.min_prominence",
                value: self.min_prominence,
                range: "(0, inf)",
            });
        }
        if !(self.min_separation.is_finite() && self.min_separation > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "peaks.min_separation",
                value: self.min_separation,
                range: "(0, inf)",
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub baseline: BaselineConfig,
    pub smoothing: SmoothingConfig,
    pub decomposition: DecompositionConfig,
    pub peaks: PeakConfig,
    /// Clip baseline-corrected intensities at zero before smoothing.
    pub clamp_negative: bool,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.baseline.validate()?;
        self.smoothing.validate()?;
        self.decomposition.validate()?;
        self.peaks.validate()
    }

    /// Read a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).context("reading config file")?;
        let config: PipelineConfig =
            serde_json::from_str(&text).context("parsing config JSON")?;
        config.validate()?;
        Ok(config)
    }
}
