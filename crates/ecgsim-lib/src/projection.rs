//! Lead projection model: turns a dipole vector into a per-lead gain.
//!
//! Frontal leads use the cosine of the angle between the vector and the lead
//! axis. Precordial leads ignore the frontal angle and use empirical R/S
//! progression tables, with one hard-coded knot table per conduction
//! morphology and chest-lead group.

use crate::lead::{Lead, PrecordialGroup};
use crate::vector::{Knot, Vector};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Ventricular conduction pattern that selects the precordial QRS/T tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Morphology {
    #[default]
    Normal,
    Lbbb,
    Rbbb,
}

/// R-wave amplitude by chest position, V1..V6.
pub const R_PROGRESSION: [f64; 6] = [0.1, 0.3, 0.6, 1.0, 1.2, 1.0];
/// S-wave amplitude by chest position, V1..V6.
pub const S_PROGRESSION: [f64; 6] = [-1.0, -1.2, -1.0, -0.6, -0.2, -0.1];
/// Atrial (P and flutter) amplitude by chest position, V1..V6.
pub const ATRIAL_PROGRESSION: [f64; 6] = [0.5, 0.7, 0.8, 0.9, 1.0, 1.0];

const LBBB_SEPTAL: &[Knot] = &[(0.0, 0.0), (0.1, -0.2), (0.5, -1.2), (1.0, 0.0)];
const LBBB_LATERAL: &[Knot] = &[(0.0, 0.0), (0.2, 0.2), (0.6, 1.2), (1.0, 0.0)];
const LBBB_TRANSITION: &[Knot] = &[(0.0, 0.0), (0.5, -0.5), (1.0, 0.0)];
const RBBB_RIGHT: &[Knot] = &[(0.0, 0.0), (0.2, 0.4), (0.4, -0.3), (0.8, 1.0), (1.0, 0.0)];
const RBBB_LATERAL: &[Knot] = &[(0.0, 0.0), (0.3, 0.8), (0.8, -0.6), (1.0, 0.0)];

/// Cosine projection of a frontal-plane angle onto a lead axis.
pub fn frontal_projection(angle: f64, axis: f64) -> f64 {
    (angle - axis).to_radians().cos()
}

/// Amplitude multiplier for an atrial wave (P or flutter) on `lead`.
pub fn atrial_gain(vector: &Vector, lead: Lead) -> f64 {
    match (lead.axis(), lead.precordial_index()) {
        (Some(axis), _) => vector.magnitude * frontal_projection(vector.angle, axis),
        (None, Some(i)) => vector.magnitude * ATRIAL_PROGRESSION[i],
        (None, None) => 0.0,
    }
}

/// Amplitude multiplier for a ventricular wave on a frontal lead.
pub fn frontal_gain(vector: &Vector, axis: f64) -> f64 {
    vector.magnitude * frontal_projection(vector.angle, axis)
}

/// Chest-lead QRS shape and T amplitude for one lead and morphology.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecordialPattern {
    /// Normalized QRS knots, scaled by the QRS vector magnitude.
    pub qrs: Cow<'static, [Knot]>,
    /// Absolute T amplitude applied to the T vector's shape.
    pub t_amplitude: f64,
}

/// Looks up the precordial pattern; `None` for frontal leads.
pub fn precordial_pattern(lead: Lead, morphology: Morphology) -> Option<PrecordialPattern> {
    let index = lead.precordial_index()?;
    let group = lead.precordial_group()?;
    let pattern = match morphology {
        Morphology::Normal => PrecordialPattern {
            qrs: Cow::Owned(progression_complex(index)),
            t_amplitude: if matches!(lead, Lead::V4 | Lead::V5 | Lead::V6) {
                0.4
            } else {
                0.2
            },
        },
        Morphology::Lbbb => match group {
            PrecordialGroup::Septal => PrecordialPattern {
                qrs: Cow::Borrowed(LBBB_SEPTAL),
                t_amplitude: 0.2,
            },
            PrecordialGroup::Transition => PrecordialPattern {
                qrs: Cow::Borrowed(LBBB_TRANSITION),
                t_amplitude: 0.2,
            },
            // Broad R, T discordant.
            PrecordialGroup::Lateral => PrecordialPattern {
                qrs: Cow::Borrowed(LBBB_LATERAL),
                t_amplitude: -0.4,
            },
        },
        Morphology::Rbbb => match group {
            // rSR', T discordant.
            PrecordialGroup::Septal => PrecordialPattern {
                qrs: Cow::Borrowed(RBBB_RIGHT),
                t_amplitude: -0.3,
            },
            PrecordialGroup::Transition => PrecordialPattern {
                qrs: Cow::Owned(progression_complex(index)),
                t_amplitude: 0.3,
            },
            PrecordialGroup::Lateral => PrecordialPattern {
                qrs: Cow::Borrowed(RBBB_LATERAL),
                t_amplitude: 0.3,
            },
        },
    };
    Some(pattern)
}

/// rS / qR complex weighted by the R and S progression at chest position `i`.
fn progression_complex(i: usize) -> Vec<Knot> {
    let r = R_PROGRESSION[i];
    let s = S_PROGRESSION[i];
    vec![(0.0, 0.0), (0.1, s * 0.2), (0.4, r), (0.7, s), (1.0, 0.0)]
}
