//! Peak detection and cross-source merging.
//!
//! Candidates are local maxima (plateaus count once, at their midpoint).
//! Prominence is measured the usual way: walk outwards on each side until a
//! higher sample or the boundary, take the lowest point on each side, and
//! measure the drop to the higher of those two minima. Width is the
//! interpolated distance between the half-prominence crossings.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::config::PeakConfig;
use crate::error::{ConfigError, InputError};

/// Which signal a peak was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakSource {
    /// Index of the decomposition mode, in extraction order.
    Mode(usize),
    Residual,
    /// A plain signal outside any decomposition.
    Signal,
}

impl fmt::Display for PeakSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeakSource::Mode(i) => write!(f, "mode{i}"),
            PeakSource::Residual => write!(f, "residual"),
            PeakSource::Signal => write!(f, "signal"),
        }
    }
}

impl Serialize for PeakSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Peak {
    /// Wavenumber of the apex.
    pub position: f64,
    pub intensity: f64,
    pub prominence: f64,
    /// Full width at half prominence, in wavenumber units.
    pub width: f64,
    pub source: PeakSource,
}

/// Peaks sorted by position with no two closer than the separation they
/// were built with.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PeakList(Vec<Peak>);

impl PeakList {
    pub fn peaks(&self) -> &[Peak] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Peak> {
        self.0.iter()
    }

    pub fn positions(&self) -> Vec<f64> {
        self.0.iter().map(|p| p.position).collect()
    }

    pub fn into_vec(self) -> Vec<Peak> {
        self.0
    }
}

impl<'a> IntoIterator for &'a PeakList {
    type Item = &'a Peak;
    type IntoIter = std::slice::Iter<'a, Peak>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, Clone)]
pub struct PeakDetector {
    config: PeakConfig,
}

impl PeakDetector {
    pub fn new(config: PeakConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn min_separation(&self) -> f64 {
        self.config.min_separation
    }

    /// Peaks of `signal` over `wavenumber` passing both thresholds.
    pub fn detect(
        &self,
        wavenumber: &[f64],
        signal: &[f64],
        source: PeakSource,
    ) -> Result<PeakList, InputError> {
        if wavenumber.len() != signal.len() {
            return Err(InputError::LengthMismatch {
                left: wavenumber.len(),
                right: signal.len(),
            });
        }
        if let Some(index) = signal.iter().position(|v| !v.is_finite()) {
            return Err(InputError::NonFinite {
                axis: "signal",
                index,
            });
        }

        let candidates: Vec<Peak> = local_maxima(signal)
            .into_iter()
            .filter_map(|apex| {
                let (prominence, left_base, right_base) = prominence(signal, apex);
                if prominence < self.config.min_prominence {
                    return None;
                }
                let width = half_prominence_width(
                    wavenumber, signal, apex, prominence, left_base, right_base,
                );
                Some(Peak {
                    position: wavenumber[apex],
                    intensity: signal[apex],
                    prominence,
                    width,
                    source,
                })
            })
            .collect();

        log::trace!("{source}: {} peaks above prominence", candidates.len());
        Ok(deduplicate(candidates, self.config.min_separation))
    }
}

/// Merge peaks from independent sources, keeping the most intense peak of
/// every cluster closer than `min_separation`. Input order does not matter.
pub fn merge<I>(peaks: I, min_separation: f64) -> PeakList
where
    I: IntoIterator<Item = Peak>,
{
    deduplicate(peaks.into_iter().collect(), min_separation)
}

/// Greedy selection: highest intensity first, ties to the smaller
/// wavenumber; a peak is dropped when a kept one lies closer than
/// `min_separation`.
fn deduplicate(mut peaks: Vec<Peak>, min_separation: f64) -> PeakList {
    peaks.sort_by(|a, b| {
        b.intensity
            .total_cmp(&a.intensity)
            .then(a.position.total_cmp(&b.position))
    });
    let mut kept: Vec<Peak> = Vec::with_capacity(peaks.len());
    for peak in peaks {
        if kept
            .iter()
            .all(|k| (k.position - peak.position).abs() >= min_separation)
        {
            kept.push(peak);
        }
    }
    kept.sort_by(|a, b| a.position.total_cmp(&b.position));
    PeakList(kept)
}

/// Indices of local maxima. Endpoints never qualify; a flat top yields its
/// midpoint (rounded down).
pub fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }
    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < i_max && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Returns `(prominence, left_base, right_base)`.
pub(crate) fn prominence(x: &[f64], apex: usize) -> (f64, usize, usize) {
    let top = x[apex];

    let mut left_base = apex;
    let mut left_min = top;
    for i in (0..apex).rev() {
        if x[i] > top {
            break;
        }
        if x[i] < left_min {
            left_min = x[i];
            left_base = i;
        }
    }

    let mut right_base = apex;
    let mut right_min = top;
    for (i, &v) in x.iter().enumerate().skip(apex + 1) {
        if v > top {
            break;
        }
        if v < right_min {
            right_min = v;
            right_base = i;
        }
    }

    (top - left_min.max(right_min), left_base, right_base)
}

fn half_prominence_width(
    wavenumber: &[f64],
    x: &[f64],
    apex: usize,
    prominence: f64,
    left_base: usize,
    right_base: usize,
) -> f64 {
    let height = x[apex] - 0.5 * prominence;
    let crossing = |a: usize, b: usize| -> f64 {
        // `a` is at or below `height`, `b` above it.
        let span = x[b] - x[a];
        if span > 0.0 {
            wavenumber[a] + (height - x[a]) / span * (wavenumber[b] - wavenumber[a])
        } else {
            wavenumber[a]
        }
    };

    let mut i = apex;
    while i > left_base && x[i] > height {
        i -= 1;
    }
    let left = if x[i] <= height && i < apex {
        crossing(i, i + 1)
    } else {
        wavenumber[i]
    };

    let mut j = apex;
    while j < right_base && x[j] > height {
        j += 1;
    }
    let right = if x[j] <= height && j > apex {
        crossing(j, j - 1)
    } else {
        wavenumber[j]
    };

    (right - left).abs()
}
