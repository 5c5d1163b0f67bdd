/// Data layer: core types and ingestion.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv / spectrometer export
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → SpectralDataset   (shift: nm → cm⁻¹)
///   └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ SpectralDataset │  Vec<SpectrumRecord> = validated Spectrum + metadata
///   └────────────────┘
/// ```

pub mod loader;
pub mod model;
pub mod shift;
