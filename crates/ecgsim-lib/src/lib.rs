//! Vectorial 12-lead ECG synthesis.
//!
//! A rhythm is a timing policy that places beats; each beat projects its P,
//! QRS and T dipole vectors onto the 12 standard leads. [`generate`] is the
//! single entry point for catalog rhythms.

pub mod beat;
pub mod catalog;
pub mod detectors;
pub mod error;
pub mod lead;
pub mod metrics;
pub mod projection;
pub mod rhythm;
pub mod signal;
pub mod vector;

pub use beat::{Beat, BeatAnnotation, BeatKind, BeatTrace};
pub use catalog::{Catalog, Category, Criteria, RhythmDefinition};
pub use detectors::*;
pub use error::EngineError;
pub use lead::{Lead, LeadMap};
pub use metrics::*;
pub use projection::Morphology;
pub use rhythm::Rhythm;
pub use signal::*;
pub use vector::Vector;

use rand::Rng;

/// Synthesizes `duration` seconds of the standard-catalog rhythm `id`.
pub fn generate<R: Rng>(id: &str, duration: f64, rng: &mut R) -> Result<Dataset, EngineError> {
    Catalog::standard().generate(id, duration, rng)
}
