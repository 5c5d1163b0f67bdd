//! Writers for peak lists, spectra and per-spectrum reports.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::data::model::{MetadataValue, Spectrum};
use crate::processing::peaks::PeakList;
use crate::processing::pipeline::PipelineOutput;

const SPECTRUM_HEADER: [&str; 2] = ["Wavenumber shift (cm^-1)", "Intensity"];

/// One row per peak: `position,intensity,prominence,width,source`.
pub fn write_peaks_csv<W: Write>(writer: W, peaks: &PeakList) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if peaks.is_empty() {
        wtr.write_record(["position", "intensity", "prominence", "width", "source"])?;
    }
    for peak in peaks {
        wtr.serialize(peak).context("writing peak row")?;
    }
    wtr.flush()?;
    Ok(())
}

/// Two-column wavenumber / intensity table.
pub fn write_spectrum_csv<W: Write>(writer: W, spectrum: &Spectrum) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(SPECTRUM_HEADER)?;
    for (x, y) in spectrum.wavenumber().iter().zip(spectrum.intensity()) {
        wtr.write_record([x.to_string(), y.to_string()])
            .context("writing spectrum row")?;
    }
    wtr.flush()?;
    Ok(())
}

/// Summary of one processed spectrum.
#[derive(Debug, Clone, Serialize)]
pub struct PeakReport {
    pub metadata: BTreeMap<String, MetadataValue>,
    pub peaks: PeakList,
    pub converged: bool,
    pub modes: usize,
    pub residual_energy_fraction: f64,
    pub baseline_iterations: usize,
}

impl PeakReport {
    pub fn new(metadata: BTreeMap<String, MetadataValue>, output: &PipelineOutput) -> Self {
        let decomposition = output.decomposition();
        PeakReport {
            metadata,
            peaks: output.peaks().clone(),
            converged: decomposition.converged(),
            modes: decomposition.modes().len(),
            residual_energy_fraction: decomposition.residual_energy_fraction(),
            baseline_iterations: output.baseline().iterations(),
        }
    }
}

pub fn write_reports_json<W: Write>(writer: W, reports: &[PeakReport]) -> Result<()> {
    serde_json::to_writer_pretty(writer, reports).context("writing JSON report")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::processing::pipeline::Pipeline;
    use crate::synthetic::SyntheticSpectrum;

    fn output() -> PipelineOutput {
        let spectrum = SyntheticSpectrum::new(400.0, 1.0, 400)
            .background(&[20.0, 5.0])
            .peak(600.0, 5.0, 80.0)
            .build()
            .unwrap();
        Pipeline::new(PipelineConfig::default())
            .unwrap()
            .run(&spectrum)
            .unwrap()
    }

    #[test]
    fn spectrum_csv_layout() {
        let s = Spectrum::new(vec![100.0, 101.5, 103.0], vec![1.0, 2.0, 0.5]).unwrap();
        let mut buf = Vec::new();
        write_spectrum_csv(&mut buf, &s).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Wavenumber shift (cm^-1),Intensity");
        assert_eq!(lines[2], "101.5,2");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn peaks_csv_has_header_and_rows() {
        let out = output();
        let mut buf = Vec::new();
        write_peaks_csv(&mut buf, out.peaks()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("position,intensity,prominence,width,source")
        );
        assert_eq!(lines.count(), out.peaks().len());
    }

    #[test]
    fn empty_peak_list_still_has_header() {
        let mut buf = Vec::new();
        write_peaks_csv(&mut buf, &PeakList::default()).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "position,intensity,prominence,width,source\n"
        );
    }

    #[test]
    fn report_json_fields() {
        let out = output();
        let mut metadata = BTreeMap::new();
        metadata.insert("sample".to_string(), MetadataValue::String("A".into()));
        let report = PeakReport::new(metadata, &out);
        let mut buf = Vec::new();
        write_reports_json(&mut buf, &[report]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value[0]["metadata"]["sample"], "A");
        assert_eq!(value[0]["modes"], out.decomposition().modes().len());
        assert!(value[0]["peaks"].is_array());
    }
}
