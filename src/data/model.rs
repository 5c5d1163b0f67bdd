use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::error::InputError;

/// Smallest spectrum the processing chain accepts.
pub const MIN_POINTS: usize = 3;

// ---------------------------------------------------------------------------
// MetadataValue – a single cell in a metadata column
// ---------------------------------------------------------------------------

/// A dynamically-typed metadata value carried alongside a spectrum from the
/// source file into the reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v:.4}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Spectrum – validated intensity-vs-wavenumber trace
// ---------------------------------------------------------------------------

/// An intensity trace over a strictly ascending wavenumber axis.
///
/// Construction validates the invariants once; the value is immutable
/// afterwards and every stage produces a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    wavenumber: Vec<f64>,
    intensity: Vec<f64>,
}

impl Spectrum {
    /// Build a spectrum whose wavenumbers are already strictly ascending.
    pub fn new(wavenumber: Vec<f64>, intensity: Vec<f64>) -> Result<Self, InputError> {
        if wavenumber.len() != intensity.len() {
            return Err(InputError::LengthMismatch {
                left: wavenumber.len(),
                right: intensity.len(),
            });
        }
        if wavenumber.len() < MIN_POINTS {
            return Err(InputError::TooFewPoints {
                required: MIN_POINTS,
                available: wavenumber.len(),
            });
        }
        check_finite(&wavenumber, "wavenumber")?;
        check_finite(&intensity, "intensity")?;
        if let Some(i) = wavenumber.windows(2).position(|w| w[1] <= w[0]) {
            return Err(InputError::NotAscending { index: i + 1 });
        }
        Ok(Self {
            wavenumber,
            intensity,
        })
    }

    /// Build a spectrum from pairs in any order (instrument exports are
    /// often descending). Duplicate wavenumbers are still rejected.
    pub fn from_unsorted(wavenumber: Vec<f64>, intensity: Vec<f64>) -> Result<Self, InputError> {
        if wavenumber.len() != intensity.len() {
            return Err(InputError::LengthMismatch {
                left: wavenumber.len(),
                right: intensity.len(),
            });
        }
        check_finite(&wavenumber, "wavenumber")?;
        let mut pairs: Vec<(f64, f64)> = wavenumber.into_iter().zip(intensity).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (x, y) = pairs.into_iter().unzip();
        Self::new(x, y)
    }

    pub fn wavenumber(&self) -> &[f64] {
        &self.wavenumber
    }

    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    pub fn len(&self) -> usize {
        self.wavenumber.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavenumber.is_empty()
    }

    /// A new spectrum on the same axis with replaced intensities.
    pub fn with_intensity(&self, intensity: Vec<f64>) -> Result<Self, InputError> {
        if intensity.len() != self.len() {
            return Err(InputError::LengthMismatch {
                left: self.len(),
                right: intensity.len(),
            });
        }
        check_finite(&intensity, "intensity")?;
        Ok(Self {
            wavenumber: self.wavenumber.clone(),
            intensity,
        })
    }
}

fn check_finite(values: &[f64], axis: &'static str) -> Result<(), InputError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(InputError::NonFinite { axis, index }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// SpectrumRecord / SpectralDataset – what the loaders hand over
// ---------------------------------------------------------------------------

/// One spectrum plus the metadata columns of its source row.
#[derive(Debug, Clone)]
pub struct SpectrumRecord {
    pub spectrum: Spectrum,
    /// Dynamic metadata columns: column_name → value.
    pub metadata: BTreeMap<String, MetadataValue>,
}

/// All records read from one file.
#[derive(Debug, Clone)]
pub struct SpectralDataset {
    pub records: Vec<SpectrumRecord>,
    /// Ordered list of metadata column names (excludes x, y).
    pub column_names: Vec<String>,
}

impl SpectralDataset {
    /// Collect the metadata column names of the loaded records.
    pub fn from_records(records: Vec<SpectrumRecord>) -> Self {
        let column_names: BTreeSet<String> = records
            .iter()
            .flat_map(|r| r.metadata.keys().cloned())
            .collect();
        SpectralDataset {
            records,
            column_names: column_names.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_length_mismatch() {
        let err = Spectrum::new(vec![1.0, 2.0, 3.0], vec![0.0, 0.0]).unwrap_err();
        assert_eq!(err, InputError::LengthMismatch { left: 3, right: 2 });
    }

    #[test]
    fn rejects_non_finite() {
        let err = Spectrum::new(vec![1.0, 2.0, 3.0], vec![0.0, f64::NAN, 1.0]).unwrap_err();
        assert_eq!(
            err,
            InputError::NonFinite {
                axis: "intensity",
                index: 1
            }
        );
    }

    #[test]
    fn rejects_descending_but_sorts_unsorted() {
        let x = vec![3.0, 2.0, 1.0];
        let y = vec![30.0, 20.0, 10.0];
        assert!(matches!(
            Spectrum::new(x.clone(), y.clone()),
            Err(InputError::NotAscending { index: 1 })
        ));
        let s = Spectrum::from_unsorted(x, y).unwrap();
        assert_eq!(s.wavenumber(), &[1.0, 2.0, 3.0]);
        assert_eq!(s.intensity(), &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn duplicate_wavenumbers_rejected() {
        let err = Spectrum::from_unsorted(vec![1.0, 2.0, 2.0], vec![0.0; 3]).unwrap_err();
        assert_eq!(err, InputError::NotAscending { index: 2 });
    }

    #[test]
    fn too_few_points() {
        assert!(matches!(
            Spectrum::new(vec![1.0, 2.0], vec![0.0, 0.0]),
            Err(InputError::TooFewPoints { .. })
        ));
    }

    #[test]
    fn metadata_serializes_untagged() {
        let json = serde_json::to_string(&vec![
            MetadataValue::String("A".into()),
            MetadataValue::Integer(3),
            MetadataValue::Null,
        ])
        .unwrap();
        assert_eq!(json, r#"["A",3,null]"#);
    }
}
