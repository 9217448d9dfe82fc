//! Heart rate extraction from anesthesia ekg recordings.
//!
//! The ekg is conditioned, its beats located (and optionally curated by hand),
//! converted to rr intervals, resampled per sample, and finally merged back
//! into the wave and trend recordings.

pub mod conditioning;
pub mod config;
pub mod detectors;
pub mod error;
pub mod io;
pub mod metrics;
pub mod pipeline;
pub mod plot;
pub mod reconcile;
pub mod records;
pub mod signal;

#[cfg(test)]
pub(crate) mod testutil;

pub use conditioning::*;
pub use config::PipelineConfig;
pub use detectors::*;
pub use error::PipelineError;
pub use metrics::*;
pub use pipeline::*;
pub use records::*;
pub use signal::*;
