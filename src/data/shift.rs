//! Wavelength → Raman shift conversion for instrument exports.

use serde::{Deserialize, Serialize};

const NM_PER_CM: f64 = 1e7;

/// Laser line and the wavelength band kept around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RamanShiftConfig {
    pub incident_nm: f64,
    /// Points closer than this to the laser line are dominated by Rayleigh
    /// scattering and dropped.
    pub min_offset_nm: f64,
    pub max_offset_nm: f64,
}

impl Default for RamanShiftConfig {
    fn default() -> Self {
        Self {
            incident_nm: 532.0,
            min_offset_nm: 8.0,
            max_offset_nm: 140.0,
        }
    }
}

impl RamanShiftConfig {
    /// Stokes shift in cm⁻¹ of light at `wavelength_nm`.
    pub fn shift(&self, wavelength_nm: f64) -> f64 {
        NM_PER_CM / self.incident_nm - NM_PER_CM / wavelength_nm
    }

    fn in_band(&self, wavelength_nm: f64) -> bool {
        let offset = wavelength_nm - self.incident_nm;
        self.min_offset_nm < offset && offset < self.max_offset_nm
    }

    /// Filter `(wavelength, intensity)` pairs to the band and convert the
    /// wavelengths to Raman shifts.
    pub fn convert(&self, wavelength_nm: &[f64], intensity: &[f64]) -> (Vec<f64>, Vec<f64>) {
        wavelength_nm
            .iter()
            .zip(intensity)
            .filter(|(&wl, _)| self.in_band(wl))
            .map(|(&wl, &y)| (self.shift(wl), y))
            .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn shift_of_incident_line_is_zero() {
        let cfg = RamanShiftConfig::default();
        assert_relative_eq!(cfg.shift(532.0), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn known_shift() {
        // 1e7/532 - 1e7/563 = 1035.0...
        let cfg = RamanShiftConfig::default();
        assert_relative_eq!(cfg.shift(563.0), 1e7 / 532.0 - 1e7 / 563.0, epsilon = 1e-9);
        assert!(cfg.shift(563.0) > 1000.0 && cfg.shift(563.0) < 1100.0);
    }

    #[test]
    fn band_filter_is_exclusive() {
        let cfg = RamanShiftConfig::default();
        let wl = [535.0, 540.0, 541.0, 671.0, 672.0, 700.0];
        let y = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let (x, y) = cfg.convert(&wl, &y);
        assert_eq!(y, vec![3.0, 4.0]);
        assert!(x[0] < x[1]);
    }
}
