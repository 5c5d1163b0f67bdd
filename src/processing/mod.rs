/// Signal processing: from a raw spectrum to a peak list.
///
/// Architecture:
/// ```text
///   Spectrum
///      │
///      ▼
///   ┌──────────┐   linalg: weighted polynomial least squares
///   │ baseline  │
///   └──────────┘
///      │ subtract
///      ▼
///   ┌──────────┐
///   │  smooth   │  Savitzky-Golay, shifted windows at the edges
///   └──────────┘
///      │
///      ▼
///   ┌───────────┐  hilbert: analytic signal
///   │ decompose  │  filter: taper, low-pass, integration
///   └───────────┘
///      │ modes + residual
///      ▼
///   ┌──────────┐
///   │  peaks    │  per source, then merged
///   └──────────┘
/// ```
/// `pipeline` runs the whole chain.

pub mod baseline;
pub mod decompose;
pub mod filter;
pub mod hilbert;
pub mod linalg;
pub mod peaks;
pub mod pipeline;
pub mod smooth;
