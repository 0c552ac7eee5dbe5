//! Rhythm generators: one timing and vector-selection policy per rhythm.
//!
//! Each variant of [`Rhythm`] carries its own policy data, so a rhythm can be
//! built and exercised without going through the catalog. Every generator
//! funnels its output through [`DatasetBuilder`], which sorts each lead by
//! time before the dataset is returned.

mod atrial;
mod conduction;
mod ectopy;
mod sinus;
mod ventricular;

pub use atrial::{FibrillationPolicy, FlutterPolicy, MultifocalPolicy};
pub use conduction::{DissociationPolicy, MobitzIIPolicy, RegularPolicy, WenckebachPolicy};
pub use ectopy::{EctopicFocus, EctopicPolicy};
pub use sinus::{Jitter, SinusPolicy};
pub use ventricular::{BaselinePolicy, ChaosPolicy, PacedPolicy, TorsadesPolicy};

use crate::error::EngineError;
use crate::signal::Dataset;
use crate::vector::Vector;
use log::debug;
use rand::Rng;
use serde::Serialize;

/// Beats whose start falls within this distance of the end of the requested
/// window are not generated.
pub(crate) const TIME_EPSILON: f64 = 1e-9;

/// Start times of a fixed-rate train beginning at `offset`.
pub(crate) fn fixed_train(duration: f64, interval: f64, offset: f64) -> impl Iterator<Item = f64> {
    (0u32..)
        .map(move |k| offset + f64::from(k) * interval)
        .take_while(move |t| *t + TIME_EPSILON < duration)
}

/// Uniform draw centred on zero with total width `span`.
pub(crate) fn centred<R: Rng>(rng: &mut R, span: f64) -> f64 {
    (rng.gen::<f64>() - 0.5) * span
}

/// Closed set of beat-sequencing algorithms.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum Rhythm {
    Sinus(SinusPolicy),
    Premature(EctopicPolicy),
    AtrialFibrillation(FibrillationPolicy),
    AtrialFlutter(FlutterPolicy),
    MultifocalAtrial(MultifocalPolicy),
    Regular(RegularPolicy),
    Wenckebach(WenckebachPolicy),
    MobitzII(MobitzIIPolicy),
    CompleteBlock(DissociationPolicy),
    Torsades(TorsadesPolicy),
    VentricularFibrillation(ChaosPolicy),
    Asystole(BaselinePolicy),
    Paced(PacedPolicy),
}

impl Rhythm {
    /// Synthesizes `duration` seconds of 12-lead data.
    ///
    /// Non-positive, infinite or NaN durations produce an empty dataset that
    /// still carries all 12 leads.
    pub fn generate<R: Rng>(&self, duration: f64, rng: &mut R) -> Dataset {
        if !(duration > 0.0 && duration.is_finite()) {
            return Dataset::empty(0.0);
        }
        let data = match self {
            Rhythm::Sinus(policy) => policy.generate(duration, rng),
            Rhythm::Premature(policy) => policy.generate(duration),
            Rhythm::AtrialFibrillation(policy) => policy.generate(duration, rng),
            Rhythm::AtrialFlutter(policy) => policy.generate(duration),
            Rhythm::MultifocalAtrial(policy) => policy.generate(duration, rng),
            Rhythm::Regular(policy) => policy.generate(duration),
            Rhythm::Wenckebach(policy) => policy.generate(duration),
            Rhythm::MobitzII(policy) => policy.generate(duration),
            Rhythm::CompleteBlock(policy) => policy.generate(duration),
            Rhythm::Torsades(policy) => policy.generate(duration, rng),
            Rhythm::VentricularFibrillation(policy) => policy.generate(duration, rng),
            Rhythm::Asystole(policy) => policy.generate(duration, rng),
            Rhythm::Paced(policy) => policy.generate(duration),
        };
        debug!(
            "generated {:.2}s: {} beats, {} points",
            duration,
            data.beats.len(),
            data.point_count()
        );
        data
    }

    /// Whether two calls with differently seeded generators can differ.
    pub fn is_randomized(&self) -> bool {
        match self {
            Rhythm::Sinus(policy) => policy.jitter != Jitter::NONE,
            Rhythm::AtrialFibrillation(_)
            | Rhythm::MultifocalAtrial(_)
            | Rhythm::Torsades(_)
            | Rhythm::VentricularFibrillation(_)
            | Rhythm::Asystole(_) => true,
            _ => false,
        }
    }

    /// Copy with sinus beat-to-beat variability switched off. Other policies
    /// are returned unchanged.
    pub fn without_jitter(&self) -> Rhythm {
        match self {
            Rhythm::Sinus(policy) => Rhythm::Sinus(policy.with_jitter(Jitter::NONE)),
            other => other.clone(),
        }
    }

    /// Every vector the policy can emit.
    pub fn vectors(&self) -> Vec<Vector> {
        match self {
            Rhythm::Sinus(_) => sinus::vectors(),
            Rhythm::Premature(policy) => policy.vectors(),
            Rhythm::AtrialFibrillation(_) => atrial::fibrillation_vectors(),
            Rhythm::AtrialFlutter(policy) => policy.vectors(),
            Rhythm::MultifocalAtrial(policy) => policy.vectors(),
            Rhythm::Regular(policy) => policy.vectors(),
            Rhythm::Wenckebach(_) | Rhythm::MobitzII(_) => conduction::sinus_vectors(),
            Rhythm::CompleteBlock(policy) => policy.vectors(),
            Rhythm::Torsades(policy) => policy.vectors(),
            Rhythm::VentricularFibrillation(_) | Rhythm::Asystole(_) => Vec::new(),
            Rhythm::Paced(policy) => policy.vectors(),
        }
    }

    /// Checks vector tables and timing constants.
    pub fn validate(&self) -> Result<(), EngineError> {
        for vector in self.vectors() {
            vector.validate()?;
        }
        match self {
            Rhythm::Sinus(policy) => policy.validate(),
            Rhythm::Premature(policy) => policy.validate(),
            Rhythm::AtrialFibrillation(policy) => policy.validate(),
            Rhythm::AtrialFlutter(policy) => policy.validate(),
            Rhythm::MultifocalAtrial(policy) => policy.validate(),
            Rhythm::Regular(policy) => policy.validate(),
            Rhythm::Wenckebach(policy) => policy.validate(),
            Rhythm::MobitzII(policy) => policy.validate(),
            Rhythm::CompleteBlock(policy) => policy.validate(),
            Rhythm::Torsades(policy) => policy.validate(),
            Rhythm::VentricularFibrillation(policy) => policy.validate(),
            Rhythm::Asystole(policy) => policy.validate(),
            Rhythm::Paced(policy) => policy.validate(),
        }
    }
}

pub(crate) fn require(condition: bool, reason: &'static str) -> Result<(), EngineError> {
    if condition {
        Ok(())
    } else {
        Err(EngineError::InvalidPolicy(reason))
    }
}

pub(crate) fn require_rate(bpm: f64) -> Result<(), EngineError> {
    require(bpm.is_finite() && bpm > 0.0, "rate must be positive")
}
