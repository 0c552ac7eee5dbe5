//! Cardiac dipole vectors and their normalized waveform shapes.

use crate::error::EngineError;
use crate::signal::Point;
use serde::Serialize;

/// A control point of a normalized shape: `(fraction of duration, value)`.
pub type Knot = (f64, f64);

/// Net cardiac dipole active over one wave (P, QRS, T or flutter wave).
///
/// Immutable; variants are derived with the `with_*` copy-with-override
/// helpers instead of mutating a shared template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vector {
    pub magnitude: f64,
    /// Frontal-plane direction in hexaxial degrees.
    pub angle: f64,
    /// Seconds.
    pub duration: f64,
    /// Piecewise-linear shape over `[0, 1]`.
    pub shape: &'static [Knot],
}

impl Vector {
    pub const fn new(magnitude: f64, angle: f64, duration: f64, shape: &'static [Knot]) -> Self {
        Self {
            magnitude,
            angle,
            duration,
            shape,
        }
    }

    pub const fn with_magnitude(self, magnitude: f64) -> Self {
        Self { magnitude, ..self }
    }

    pub const fn with_angle(self, angle: f64) -> Self {
        Self { angle, ..self }
    }

    pub const fn with_duration(self, duration: f64) -> Self {
        Self { duration, ..self }
    }

    pub const fn with_shape(self, shape: &'static [Knot]) -> Self {
        Self { shape, ..self }
    }

    /// Copy with the magnitude multiplied by `factor`.
    pub fn scaled(self, factor: f64) -> Self {
        self.with_magnitude(self.magnitude * factor)
    }

    /// Largest absolute normalized value in the shape.
    pub fn shape_peak(&self) -> f64 {
        self.shape.iter().fold(0.0, |acc, (_, v)| acc.max(v.abs()))
    }

    /// Emits one point per knot for a wave starting at `start`, with every
    /// value multiplied by `gain` (magnitude and projection already folded in).
    pub fn knots_at(&self, start: f64, gain: f64) -> impl Iterator<Item = Point> + '_ {
        knots_at(self.shape, start, self.duration, gain)
    }

    /// Normalized shape value at absolute time `t` for a wave starting at
    /// `start`; zero outside the active window.
    pub fn shape_at(&self, start: f64, t: f64) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        let frac = (t - start) / self.duration;
        interpolate(self.shape, frac)
    }

    /// Rejects shapes that could not produce a time-ordered polyline.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.duration > 0.0 && self.duration.is_finite()) {
            return Err(EngineError::MalformedVector("duration must be positive"));
        }
        if !self.magnitude.is_finite() || !self.angle.is_finite() {
            return Err(EngineError::MalformedVector("non-finite magnitude or angle"));
        }
        validate_shape(self.shape)
    }
}

pub(crate) fn validate_shape(shape: &[Knot]) -> Result<(), EngineError> {
    if shape.len() < 2 {
        return Err(EngineError::MalformedVector("shape needs at least two knots"));
    }
    if shape
        .iter()
        .any(|&(at, v)| !(0.0..=1.0).contains(&at) || !v.is_finite())
    {
        return Err(EngineError::MalformedVector(
            "knot positions must lie within [0, 1]",
        ));
    }
    if shape.windows(2).any(|w| w[1].0 < w[0].0) {
        return Err(EngineError::MalformedVector("knot positions must not decrease"));
    }
    Ok(())
}

/// Expands a normalized shape into absolute-time points.
pub(crate) fn knots_at(
    shape: &[Knot],
    start: f64,
    duration: f64,
    gain: f64,
) -> impl Iterator<Item = Point> + '_ {
    shape
        .iter()
        .map(move |&(at, v)| Point::new(start + at * duration, v * gain))
}

/// Linear interpolation between bracketing knots; zero outside the shape.
pub(crate) fn interpolate(shape: &[Knot], frac: f64) -> f64 {
    let (Some(first), Some(last)) = (shape.first(), shape.last()) else {
        return 0.0;
    };
    if frac < first.0 || frac > last.0 {
        return 0.0;
    }
    let upper = shape.partition_point(|&(at, _)| at <= frac);
    if upper == 0 {
        return first.1;
    }
    if upper >= shape.len() {
        return last.1;
    }
    let (t0, v0) = shape[upper - 1];
    let (t1, v1) = shape[upper];
    if t1 <= t0 {
        return v1;
    }
    v0 + (v1 - v0) * (frac - t0) / (t1 - t0)
}

const MONOPHASIC: &[Knot] = &[(0.0, 0.0), (0.5, 1.0), (1.0, 0.0)];
const INVERTED: &[Knot] = &[(0.0, 0.0), (0.5, -1.0), (1.0, 0.0)];
const NARROW_COMPLEX: &[Knot] = &[(0.0, 0.0), (0.1, -0.2), (0.4, 1.0), (0.7, -0.4), (1.0, 0.0)];
const WIDE_COMPLEX: &[Knot] = &[(0.0, 0.0), (0.25, 1.2), (0.5, -1.0), (0.75, 0.4), (1.0, 0.0)];
const RIGHT_DELAYED: &[Knot] = &[(0.0, 0.0), (0.4, 1.0), (0.7, -0.4), (1.0, 0.0)];
const DELTA_COMPLEX: &[Knot] = &[
    (0.0, 0.0),
    (0.2, 0.3),
    (0.3, -0.2),
    (0.6, 1.0),
    (0.8, -0.4),
    (1.0, 0.0),
];
const PSEUDO_DEFLECTED: &[Knot] = &[(0.0, -0.2), (0.091, 0.0), (0.545, 1.0), (1.0, 0.0)];
const SAWTOOTH: &[Knot] = &[(0.0, 0.0), (0.75, -1.0), (1.0, 0.0)];

pub const NORMAL_P: Vector = Vector::new(0.15, 60.0, 0.08, MONOPHASIC);
pub const NORMAL_QRS: Vector = Vector::new(1.0, 45.0, 0.09, NARROW_COMPLEX);
pub const NORMAL_T: Vector = Vector::new(0.3, 45.0, 0.14, MONOPHASIC);

/// Wide ventricular complex shared by PVCs, VT, idioventricular and escape beats.
pub const VENTRICULAR_QRS: Vector = Vector::new(1.5, -90.0, 0.16, WIDE_COMPLEX);
pub const VENTRICULAR_T: Vector = Vector::new(0.4, 90.0, 0.18, INVERTED);

pub const RBBB_QRS: Vector = Vector::new(1.1, 100.0, 0.14, RIGHT_DELAYED);
pub const RBBB_T: Vector = Vector::new(0.3, -60.0, 0.16, INVERTED);
pub const LBBB_QRS: Vector = Vector::new(1.2, -60.0, 0.14, MONOPHASIC);
pub const LBBB_T: Vector = Vector::new(0.4, 120.0, 0.16, INVERTED);

/// Pre-excited complex: slurred delta upstroke before the main deflection.
pub const WPW_QRS: Vector = NORMAL_QRS.with_duration(0.13).with_shape(DELTA_COMPLEX);

/// T wave opened by a small retrograde pseudo-deflection; the window is
/// stretched so the dip fits inside `[0, 1]`.
pub const AVNRT_T: Vector = NORMAL_T.with_duration(0.154).with_shape(PSEUDO_DEFLECTED);

/// Sawtooth atrial flutter wave: slow descent, quick return.
pub const FLUTTER_WAVE: Vector = Vector::new(0.3, 90.0, 0.2, SAWTOOTH);

pub const PACED_QRS: Vector = VENTRICULAR_QRS.with_angle(-60.0);
pub const PACED_T: Vector = VENTRICULAR_T.with_angle(120.0);
