//! Background estimation by asymmetrically reweighted polynomial fitting.
//!
//! Each step fits a polynomial to the spectrum with the current weights and
//! derives new weights from the residuals: points at or below the curve keep
//! full weight, points above it (peaks) are suppressed by a logistic
//! function scaled by the spread of the negative residuals. The driving loop
//! stops when the weight vector settles.

use crate::config::BaselineConfig;
use crate::data::model::Spectrum;
use crate::error::{ConfigError, FitError, InputError};

use super::linalg::{fit_weighted, Polynomial};

/// Estimated background, aligned point-for-point with its source spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    intensity: Vec<f64>,
    polynomial: Polynomial,
    iterations: usize,
    converged: bool,
}

impl Baseline {
    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    pub fn polynomial(&self) -> &Polynomial {
        &self.polynomial
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// False when `max_iterations` ran out before the weights settled.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// `spectrum - baseline`, optionally clipped at zero.
    pub fn subtract_from(
        &self,
        spectrum: &Spectrum,
        clamp_negative: bool,
    ) -> Result<Spectrum, InputError> {
        let corrected = spectrum
            .intensity()
            .iter()
            .zip(&self.intensity)
            .map(|(&y, &b)| {
                let v = y - b;
                if clamp_negative {
                    v.max(0.0)
                } else {
                    v
                }
            })
            .collect();
        spectrum.with_intensity(corrected)
    }
}

#[derive(Debug, Clone)]
pub struct BaselineEstimator {
    config: BaselineConfig,
}

impl BaselineEstimator {
    pub fn new(config: BaselineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn estimate(&self, spectrum: &Spectrum) -> Result<Baseline, FitError> {
        let degree = self.config.degree;
        let x = spectrum.wavenumber();
        let y = spectrum.intensity();
        if x.len() < degree + 2 {
            return Err(FitError::Underdetermined {
                degree,
                required: degree + 2,
                available: x.len(),
            });
        }

        let scale = y.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(1.0);
        let mut weights = vec![1.0; x.len()];
        let mut iterations = 0;
        let mut converged = false;

        let polynomial = loop {
            iterations += 1;
            let polynomial = fit_weighted(x, y, &weights, degree)?;
            let residuals: Vec<f64> = x
                .iter()
                .zip(y)
                .map(|(&xi, &yi)| yi - polynomial.eval(xi))
                .collect();

            let Some(next) = reweight(&residuals, scale) else {
                // Nothing lies below the curve: it already hugs the data.
                converged = true;
                break polynomial;
            };
            let change = relative_change(&weights, &next);
            weights = next;
            log::trace!("baseline iteration {iterations}: weight change {change:.3e}");

            if change < self.config.tolerance {
                converged = true;
                break polynomial;
            }
            if iterations >= self.config.max_iterations {
                break polynomial;
            }
        };

        log::debug!(
            "baseline: degree {degree}, {iterations} iterations, converged = {converged}"
        );
        Ok(Baseline {
            intensity: polynomial.eval_all(x),
            polynomial,
            iterations,
            converged,
        })
    }
}

/// Weights for the next fit. `None` when there are no negative residuals.
pub fn reweight(residuals: &[f64], scale: f64) -> Option<Vec<f64>> {
    let negative: Vec<f64> = residuals.iter().copied().filter(|&r| r < 0.0).collect();
    if negative.is_empty() {
        return None;
    }
    let n = negative.len() as f64;
    let mean = negative.iter().sum::<f64>() / n;
    let var = negative.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let spread = var.sqrt().max(scale * f64::EPSILON);
    let threshold = 2.0 * spread - mean;

    Some(
        residuals
            .iter()
            .map(|&r| {
                if r <= 0.0 {
                    1.0
                } else {
                    1.0 / (1.0 + (2.0 * (r - threshold) / spread).exp())
                }
            })
            .collect(),
    )
}

fn relative_change(old: &[f64], new: &[f64]) -> f64 {
    let diff = old
        .iter()
        .zip(new)
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt();
    let norm = old.iter().map(|a| a * a).sum::<f64>().sqrt();
    if norm > 0.0 {
        diff / norm
    } else {
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn line_spectrum(n: usize) -> Spectrum {
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y = x.iter().map(|v| 2.0 + 0.5 * v).collect();
        Spectrum::new(x, y).unwrap()
    }

    #[test]
    fn reweight_keeps_points_below_at_full_weight() {
        let w = reweight(&[-1.0, -0.5, 0.0, 0.2, 50.0], 1.0).unwrap();
        assert_eq!(&w[..3], &[1.0, 1.0, 1.0]);
        assert!(w[3] < 1.0 && w[3] > 0.5);
        assert!(w[4] < 1e-10);
    }

    #[test]
    fn reweight_without_negative_residuals() {
        assert!(reweight(&[0.0, 1.0, 2.0], 1.0).is_none());
    }

    #[test]
    fn exact_line_is_recovered() {
        let s = line_spectrum(20);
        let est = BaselineEstimator::new(BaselineConfig {
            degree: 1,
            ..Default::default()
        })
        .unwrap();
        let b = est.estimate(&s).unwrap();
        for (fit, y) in b.intensity().iter().zip(s.intensity()) {
            assert_abs_diff_eq!(*fit, *y, epsilon = 1e-9);
        }
    }

    #[test]
    fn too_few_points_for_degree() {
        let s = line_spectrum(5);
        let est = BaselineEstimator::new(BaselineConfig {
            degree: 4,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            est.estimate(&s),
            Err(FitError::Underdetermined {
                degree: 4,
                required: 6,
                available: 5
            })
        );
    }

    #[test]
    fn zero_degree_is_config_error() {
        let err = BaselineEstimator::new(BaselineConfig {
            degree: 0,
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::ZeroDegree);
    }

    #[test]
    fn subtract_and_clamp() {
        let s = line_spectrum(10);
        let est = BaselineEstimator::new(BaselineConfig {
            degree: 1,
            ..Default::default()
        })
        .unwrap();
        let b = est.estimate(&s).unwrap();
        let shifted = s
            .with_intensity(s.intensity().iter().map(|v| v - 1.0).collect())
            .unwrap();
        let raw = b.subtract_from(&shifted, false).unwrap();
        let clamped = b.subtract_from(&shifted, true).unwrap();
        assert_abs_diff_eq!(raw.intensity()[3], -1.0, epsilon = 1e-9);
        assert_eq!(clamped.intensity()[3], 0.0);
    }
}
