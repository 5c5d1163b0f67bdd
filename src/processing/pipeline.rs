//! End-to-end peak extraction for one spectrum.
//!
//! ```text
//!  Spectrum ─► baseline ─► subtract ─► smooth ─► decompose ─┬─► detect(mode 0)
//!                                                            ├─► detect(mode 1) ...
//!                                                            └─► detect(residual)
//!                                                                      │
//!                                   anchor on smoothed spectrum ◄──────┘
//!                                                 │
//!                                                 ▼
//!                                         merge ─► PeakList
//! ```
//!
//! Candidates from the separate sources are anchored on the smoothed
//! spectrum before merging: each one climbs to the nearest local maximum of
//! the smoothed intensities within half the minimum separation and takes its
//! intensity from there. Intensities of all sources are then on one scale.
//! A candidate whose climb ends on a flank rather than a maximum, or whose
//! prominence in the smoothed spectrum is below the threshold, is dropped.

use crate::config::PipelineConfig;
use crate::data::model::Spectrum;
use crate::error::Result;

use super::baseline::{Baseline, BaselineEstimator};
use super::decompose::{DecompositionResult, Decomposer};
use super::peaks::{merge, prominence, Peak, PeakDetector, PeakList, PeakSource};
use super::smooth::SavitzkyGolay;

/// Everything one run produces. Only `peaks` is the result proper; the rest
/// is kept for inspection and plotting.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    peaks: PeakList,
    baseline: Baseline,
    corrected: Spectrum,
    smoothed: Spectrum,
    decomposition: DecompositionResult,
}

impl PipelineOutput {
    pub fn peaks(&self) -> &PeakList {
        &self.peaks
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// Input minus baseline (clipped at zero if configured).
    pub fn corrected(&self) -> &Spectrum {
        &self.corrected
    }

    /// The spectrum handed to the decomposition.
    pub fn smoothed(&self) -> &Spectrum {
        &self.smoothed
    }

    pub fn decomposition(&self) -> &DecompositionResult {
        &self.decomposition
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    baseline: BaselineEstimator,
    smoother: SavitzkyGolay,
    decomposer: Decomposer,
    detector: PeakDetector,
}

impl Pipeline {
    /// Validate every stage configuration and build the stages.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            baseline: BaselineEstimator::new(config.baseline.clone())?,
            smoother: SavitzkyGolay::new(config.smoothing.clone())?,
            decomposer: Decomposer::new(config.decomposition.clone())?,
            detector: PeakDetector::new(config.peaks.clone())?,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, spectrum: &Spectrum) -> Result<PipelineOutput> {
        // Length-dependent checks first, so a bad pairing fails before any work.
        self.config.smoothing.validate_for_len(spectrum.len())?;

        let baseline = self.baseline.estimate(spectrum)?;
        let corrected = baseline.subtract_from(spectrum, self.config.clamp_negative)?;
        log::debug!(
            "baseline done in {} iterations (converged = {})",
            baseline.iterations(),
            baseline.converged()
        );

        let smoothed = corrected.with_intensity(self.smoother.apply(corrected.intensity())?)?;
        let decomposition = self.decomposer.decompose(smoothed.intensity())?;
        log::debug!(
            "decomposition: {} modes, residual energy fraction {:.4}",
            decomposition.modes().len(),
            decomposition.residual_energy_fraction()
        );

        let wavenumber = smoothed.wavenumber();
        let mut sources = Vec::with_capacity(decomposition.modes().len() + 1);
        for (i, mode) in decomposition.modes().iter().enumerate() {
            sources.push(self.detector.detect(wavenumber, mode.signal(), PeakSource::Mode(i))?);
        }
        sources.push(self.detector.detect(
            wavenumber,
            decomposition.residual(),
            PeakSource::Residual,
        )?);

        let min_prominence = self.config.peaks.min_prominence;
        let min_separation = self.detector.min_separation();
        let candidates = sources
            .iter()
            .flatten()
            .filter_map(|p| {
                anchor(
                    p,
                    wavenumber,
                    smoothed.intensity(),
                    0.5 * min_separation,
                    min_prominence,
                )
            });
        let peaks = merge(candidates, min_separation);

        log::info!(
            "{} peaks from {} sources ({} points, converged = {})",
            peaks.len(),
            sources.len(),
            spectrum.len(),
            decomposition.converged()
        );

        Ok(PipelineOutput {
            peaks,
            baseline,
            corrected,
            smoothed,
            decomposition,
        })
    }
}

/// Move `peak` uphill on `reference`, no further than `radius` from where it
/// was found, and read its intensity there. Equal neighbours resolve to the
/// lower wavenumber.
///
/// `None` unless the climb ends on a local maximum of `reference` whose
/// prominence there reaches `min_prominence`; a climb cut short on a flank
/// is not a peak.
fn anchor(
    peak: &Peak,
    wavenumber: &[f64],
    reference: &[f64],
    radius: f64,
    min_prominence: f64,
) -> Option<Peak> {
    let last = wavenumber.len() - 1;
    let within = |j: usize| (wavenumber[j] - peak.position).abs() <= radius;

    let mut i = wavenumber.partition_point(|&w| w < peak.position).min(last);
    loop {
        let left = (i > 0 && within(i - 1) && reference[i - 1] > reference[i]).then(|| i - 1);
        let right = (i < last && within(i + 1) && reference[i + 1] > reference[i]).then(|| i + 1);
        i = match (left, right) {
            (Some(l), Some(r)) if reference[r] > reference[l] => r,
            (Some(l), _) => l,
            (None, Some(r)) => r,
            (None, None) => break,
        };
    }

    let uphill = (i > 0 && reference[i - 1] > reference[i])
        || (i < last && reference[i + 1] > reference[i]);
    if uphill {
        return None;
    }
    let (prominence, _, _) = prominence(reference, i);
    if prominence < min_prominence {
        return None;
    }

    Some(Peak {
        position: wavenumber[i],
        intensity: reference[i],
        ..*peak
    })
}
