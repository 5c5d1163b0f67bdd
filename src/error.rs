//! Error taxonomy for the processing chain.
//!
//! Every stage fails with exactly one of these and the pipeline hands it to
//! the caller unchanged. Non-convergence of the decomposition is not an
//! error; see [`crate::processing::decompose::DecompositionResult::converged`].

use thiserror::Error;

/// Invalid stage parameters, detected before any computation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("smoothing window must be odd, got {0}")]
    EvenWindow(usize),

    #[error("smoothing window must be at least 3, got {0}")]
    WindowTooSmall(usize),

    #[error("polynomial order {order} must be smaller than the window {window}")]
    OrderTooHigh { order: usize, window: usize },

    #[error("window {window} is longer than the signal ({len} points)")]
    WindowTooLong { window: usize, len: usize },

    #[error("baseline degree must be at least 1")]
    ZeroDegree,

    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },

    #[error("{field} = {value} is outside {range}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        range: &'static str,
    },
}

/// Malformed spectrum or signal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("length mismatch: {left} wavenumbers but {right} intensities")]
    LengthMismatch { left: usize, right: usize },

    #[error("insufficient data: need {required} points, have {available}")]
    TooFewPoints { required: usize, available: usize },

    #[error("non-finite {axis} value at index {index}")]
    NonFinite { axis: &'static str, index: usize },

    #[error("wavenumbers must be strictly ascending (index {index})")]
    NotAscending { index: usize },
}

/// Numerically singular or underdetermined baseline fit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("degree {degree} fit needs at least {required} points, have {available}")]
    Underdetermined {
        degree: usize,
        required: usize,
        available: usize,
    },

    #[error("least-squares system is rank deficient (rank {rank} of {columns})")]
    Singular { rank: usize, columns: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("input error: {0}")]
    Input(#[from] InputError),

    #[error("fit error: {0}")]
    Fit(#[from] FitError),
}

pub type Result<T> = std::result::Result<T, Error>;
