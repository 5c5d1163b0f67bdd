//! Peak extraction from Raman spectra.
//!
//! A spectrum is baseline corrected, smoothed and decomposed into
//! oscillatory modes; peaks are detected in every mode and in the residual
//! and merged into one list. See [`processing::pipeline::Pipeline`].

pub mod config;
pub mod data;
pub mod error;
pub mod processing;
pub mod report;
pub mod synthetic;

pub use config::PipelineConfig;
pub use data::model::Spectrum;
pub use error::{Error, Result};
pub use processing::peaks::{Peak, PeakList, PeakSource};
pub use processing::pipeline::{Pipeline, PipelineOutput};
