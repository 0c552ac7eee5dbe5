//! Fixed-rate rhythms and AV conduction disturbances.

use super::{fixed_train, require, require_rate};
use crate::beat::{Beat, BeatAnnotation, BeatKind, DEFAULT_PR};
use crate::error::EngineError;
use crate::lead::Lead;
use crate::projection::Morphology;
use crate::signal::{Dataset, DatasetBuilder};
use crate::vector::{Vector, NORMAL_P, NORMAL_QRS, NORMAL_T};
use serde::Serialize;

/// Constant-rate train of identical beats.
///
/// Covers every rhythm whose only distinguishing features are the rate, the
/// vectors, the PR interval and the precordial morphology: reentrant and
/// junctional tachycardias, first-degree block, pre-excitation, bundle branch
/// blocks and the ventricular rhythms with a regular wide complex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegularPolicy {
    pub bpm: f64,
    pub p: Option<Vector>,
    pub qrs: Vector,
    pub t: Vector,
    pub pr: f64,
    pub morphology: Morphology,
    pub kind: BeatKind,
}

impl RegularPolicy {
    /// Normal vectors with a P wave at `bpm`.
    pub const fn sinus(bpm: f64) -> Self {
        Self {
            bpm,
            p: Some(NORMAL_P),
            qrs: NORMAL_QRS,
            t: NORMAL_T,
            pr: DEFAULT_PR,
            morphology: Morphology::Normal,
            kind: BeatKind::Conducted,
        }
    }

    /// Wide ventricular complexes without atrial activity.
    pub const fn ventricular(bpm: f64, qrs: Vector, t: Vector) -> Self {
        Self {
            bpm,
            p: None,
            qrs,
            t,
            pr: DEFAULT_PR,
            morphology: Morphology::Normal,
            kind: BeatKind::Ventricular,
        }
    }

    pub const fn without_p(self) -> Self {
        Self { p: None, ..self }
    }

    pub const fn with_pr(self, pr: f64) -> Self {
        Self { pr, ..self }
    }

    pub const fn with_complex(self, qrs: Vector, t: Vector) -> Self {
        Self { qrs, t, ..self }
    }

    pub const fn with_morphology(self, morphology: Morphology) -> Self {
        Self { morphology, ..self }
    }

    pub const fn with_kind(self, kind: BeatKind) -> Self {
        Self { kind, ..self }
    }

    pub(crate) fn generate(&self, duration: f64) -> Dataset {
        let mut out = DatasetBuilder::new(duration);
        for start in fixed_train(duration, 60.0 / self.bpm, 0.0) {
            let beat = Beat::new(start, self.qrs, self.t)
                .with_optional_p(self.p)
                .with_pr(self.pr)
                .with_morphology(self.morphology);
            out.push_trace(beat.synthesize(), beat.annotation(self.kind));
        }
        out.finish()
    }

    pub(crate) fn vectors(&self) -> Vec<Vector> {
        self.p.into_iter().chain([self.qrs, self.t]).collect()
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        require_rate(self.bpm)?;
        require(self.pr >= 0.0, "PR interval cannot be negative")?;
        if let Some(p) = &self.p {
            require(
                self.pr.max(p.duration) + self.qrs.duration < 60.0 / self.bpm,
                "PR and QRS must fit inside one cycle",
            )?;
        }
        Ok(())
    }
}

/// Mobitz type I: the PR interval lengthens beat by beat until one P wave is
/// not conducted, then the cycle restarts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WenckebachPolicy {
    pub bpm: f64,
    /// PR of each conducted beat in the cycle; the beat after the last one
    /// is dropped.
    pub pr_progression: &'static [f64],
}

impl WenckebachPolicy {
    pub(crate) fn generate(&self, duration: f64) -> Dataset {
        let cycle = self.pr_progression.len() + 1;
        let mut out = DatasetBuilder::new(duration);
        for (k, start) in fixed_train(duration, 60.0 / self.bpm, 0.0).enumerate() {
            let beat = Beat::new(start, NORMAL_QRS, NORMAL_T).with_p(NORMAL_P);
            match self.pr_progression.get(k % cycle) {
                Some(&pr) => {
                    let beat = beat.with_pr(pr);
                    out.push_trace(beat.synthesize(), beat.annotation(BeatKind::Conducted));
                }
                None => out.push_atrial(beat.synthesize(), beat.blocked_annotation()),
            }
        }
        out.finish()
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        require_rate(self.bpm)?;
        require(!self.pr_progression.is_empty(), "PR progression is empty")?;
        require(
            self.pr_progression.windows(2).all(|w| w[1] > w[0]),
            "PR must lengthen across the cycle",
        )
    }
}

/// Mobitz type II: constant PR with every `drop_every`-th P wave blocked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MobitzIIPolicy {
    pub bpm: f64,
    pub pr: f64,
    pub drop_every: usize,
}

impl MobitzIIPolicy {
    pub(crate) fn generate(&self, duration: f64) -> Dataset {
        let mut out = DatasetBuilder::new(duration);
        for (k, start) in fixed_train(duration, 60.0 / self.bpm, 0.0).enumerate() {
            let beat = Beat::new(start, NORMAL_QRS, NORMAL_T)
                .with_p(NORMAL_P)
                .with_pr(self.pr);
            if (k + 1) % self.drop_every == 0 {
                out.push_atrial(beat.synthesize(), beat.blocked_annotation());
            } else {
                out.push_trace(beat.synthesize(), beat.annotation(BeatKind::Conducted));
            }
        }
        out.finish()
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        require_rate(self.bpm)?;
        require(self.pr > 0.0, "PR interval must be positive")?;
        require(self.drop_every >= 2, "at least one beat per cycle must conduct")
    }
}

/// Third-degree block: independent atrial and ventricular trains.
///
/// Atrial points that land inside an escape QRS are removed so the P wave
/// appears buried in the complex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DissociationPolicy {
    pub atrial_bpm: f64,
    pub ventricular_bpm: f64,
    /// Start of the first escape beat (seconds).
    pub ventricular_offset: f64,
    pub escape_qrs: Vector,
    pub escape_t: Vector,
}

impl DissociationPolicy {
    pub(crate) fn generate(&self, duration: f64) -> Dataset {
        let mut out = DatasetBuilder::new(duration);
        for start in fixed_train(duration, 60.0 / self.atrial_bpm, 0.0) {
            let beat = Beat::new(start, NORMAL_QRS, NORMAL_T).with_p(NORMAL_P);
            out.push_atrial(beat.synthesize(), beat.blocked_annotation());
        }

        let escapes: Vec<f64> = fixed_train(
            duration,
            60.0 / self.ventricular_bpm,
            self.ventricular_offset,
        )
        .collect();
        let width = self.escape_qrs.duration;
        for lead in Lead::ALL {
            out.retain(lead, |p| {
                !escapes.iter().any(|&v| p.time >= v && p.time <= v + width)
            });
        }

        for &start in &escapes {
            let beat = Beat::new(start, self.escape_qrs, self.escape_t);
            let trace = beat.synthesize();
            out.append(trace.ventricular);
            out.annotate(BeatAnnotation::ventricular(BeatKind::Ventricular, start));
        }
        out.finish()
    }

    pub(crate) fn vectors(&self) -> Vec<Vector> {
        vec![NORMAL_P, self.escape_qrs, self.escape_t]
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        require_rate(self.atrial_bpm)?;
        require_rate(self.ventricular_bpm)?;
        require(
            self.ventricular_bpm < self.atrial_bpm,
            "escape rhythm must be slower than the atria",
        )?;
        require(self.ventricular_offset >= 0.0, "escape offset cannot be negative")
    }
}

pub(crate) fn sinus_vectors() -> Vec<Vector> {
    vec![NORMAL_P, NORMAL_QRS, NORMAL_T]
}
