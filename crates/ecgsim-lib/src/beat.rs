//! Beat synthesizer: one cardiac cycle (P, QRS, T) across all 12 leads.

use crate::lead::{Lead, LeadMap};
use crate::projection::{atrial_gain, frontal_gain, precordial_pattern, Morphology};
use crate::signal::Point;
use crate::vector::{knots_at, Vector};
use serde::{Deserialize, Serialize};

/// PR interval used when a rhythm does not specify one (seconds).
pub const DEFAULT_PR: f64 = 0.16;
/// Isoelectric ST segment between the end of QRS and the T wave (seconds).
pub const ST_SEGMENT: f64 = 0.08;

/// One cardiac cycle to be synthesized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beat {
    pub start: f64,
    pub p: Option<Vector>,
    pub qrs: Vector,
    pub t: Vector,
    pub pr_interval: f64,
    pub morphology: Morphology,
}

impl Beat {
    /// A beat without atrial activity starting at `start`.
    pub fn new(start: f64, qrs: Vector, t: Vector) -> Self {
        Self {
            start,
            p: None,
            qrs,
            t,
            pr_interval: DEFAULT_PR,
            morphology: Morphology::Normal,
        }
    }

    pub fn with_p(self, p: Vector) -> Self {
        Self { p: Some(p), ..self }
    }

    pub fn with_optional_p(self, p: Option<Vector>) -> Self {
        Self { p, ..self }
    }

    pub fn with_pr(self, pr_interval: f64) -> Self {
        Self {
            pr_interval,
            ..self
        }
    }

    pub fn with_morphology(self, morphology: Morphology) -> Self {
        Self { morphology, ..self }
    }

    /// PR actually applied: never shorter than the P wave itself, zero when
    /// there is no P wave.
    pub fn effective_pr(&self) -> f64 {
        match &self.p {
            Some(p) => self.pr_interval.max(p.duration),
            None => 0.0,
        }
    }

    pub fn qrs_onset(&self) -> f64 {
        self.start + self.effective_pr()
    }

    pub fn t_onset(&self) -> f64 {
        self.qrs_onset() + self.qrs.duration + ST_SEGMENT
    }

    pub fn end(&self) -> f64 {
        self.t_onset() + self.t.duration
    }

    /// Annotation describing this beat if it is fully conducted.
    pub fn annotation(&self, kind: BeatKind) -> BeatAnnotation {
        BeatAnnotation {
            kind,
            p_onset: self.p.map(|_| self.start),
            qrs_onset: Some(self.qrs_onset()),
        }
    }

    /// Annotation for a P wave that never reaches the ventricles.
    pub fn blocked_annotation(&self) -> BeatAnnotation {
        BeatAnnotation::atrial(self.start)
    }

    /// Projects P, QRS and T onto every lead.
    pub fn synthesize(&self) -> BeatTrace {
        let qrs_onset = self.qrs_onset();
        let t_onset = self.t_onset();
        let mut atrial = LeadMap::<Vec<Point>>::default();
        let mut ventricular = LeadMap::<Vec<Point>>::default();

        for lead in Lead::ALL {
            if let Some(p) = &self.p {
                atrial[lead].extend(p.knots_at(self.start, atrial_gain(p, lead)));
            }
            let out = &mut ventricular[lead];
            match (lead.axis(), precordial_pattern(lead, self.morphology)) {
                (Some(axis), _) => {
                    out.extend(self.qrs.knots_at(qrs_onset, frontal_gain(&self.qrs, axis)));
                    out.extend(self.t.knots_at(t_onset, frontal_gain(&self.t, axis)));
                }
                (None, Some(pattern)) => {
                    out.extend(knots_at(
                        &pattern.qrs,
                        qrs_onset,
                        self.qrs.duration,
                        self.qrs.magnitude,
                    ));
                    out.extend(self.t.knots_at(t_onset, pattern.t_amplitude));
                }
                (None, None) => {}
            }
        }

        BeatTrace {
            atrial,
            ventricular,
        }
    }
}

/// Per-lead output of one beat, split so generators can emit a P wave
/// without its QRS/T.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatTrace {
    pub atrial: LeadMap<Vec<Point>>,
    pub ventricular: LeadMap<Vec<Point>>,
}

/// How a beat originated / was conducted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatKind {
    /// Supraventricular impulse conducted to the ventricles.
    Conducted,
    /// Narrow escape beat from the AV junction.
    Junctional,
    /// Early ectopic beat (atrial or ventricular).
    Premature,
    /// P wave with no ventricular response.
    NonConducted,
    /// Wide complex of ventricular origin.
    Ventricular,
    /// Pacemaker-captured beat.
    Paced,
}

/// Timing landmarks of one generated beat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatAnnotation {
    pub kind: BeatKind,
    pub p_onset: Option<f64>,
    pub qrs_onset: Option<f64>,
}

impl BeatAnnotation {
    pub fn atrial(p_onset: f64) -> Self {
        Self {
            kind: BeatKind::NonConducted,
            p_onset: Some(p_onset),
            qrs_onset: None,
        }
    }

    pub fn ventricular(kind: BeatKind, qrs_onset: f64) -> Self {
        Self {
            kind,
            p_onset: None,
            qrs_onset: Some(qrs_onset),
        }
    }

    /// Earliest landmark of the beat.
    pub fn onset(&self) -> f64 {
        match (self.p_onset, self.qrs_onset) {
            (Some(p), Some(q)) => p.min(q),
            (Some(p), None) => p,
            (None, Some(q)) => q,
            (None, None) => f64::NAN,
        }
    }

    /// PR interval when both landmarks belong to the same beat.
    pub fn pr(&self) -> Option<f64> {
        Some(self.qrs_onset? - self.p_onset?)
    }
}
