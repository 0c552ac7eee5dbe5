//! Ventricular rhythms without a regular train of identical beats, plus the
//! pacemaker rhythm.

use super::{centred, fixed_train, require, require_rate, TIME_EPSILON};
use crate::beat::{Beat, BeatKind};
use crate::error::EngineError;
use crate::lead::Lead;
use crate::signal::{Dataset, DatasetBuilder, Point};
use crate::vector::Vector;
use rand::Rng;
use serde::Serialize;
use std::f64::consts::PI;

/// Polymorphic VT whose QRS and T amplitudes swell and shrink on a slow
/// sinusoidal envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TorsadesPolicy {
    pub bpm: f64,
    /// Peak-to-peak spread of the instantaneous rate (bpm).
    pub bpm_spread: f64,
    /// Period of the amplitude envelope (seconds).
    pub envelope_period: f64,
    pub qrs: Vector,
    pub t: Vector,
    /// QRS magnitude is `qrs_magnitude + qrs_swing * envelope`.
    pub qrs_magnitude: f64,
    pub qrs_swing: f64,
    pub t_magnitude: f64,
    pub t_swing: f64,
}

impl TorsadesPolicy {
    fn envelope(&self, time: f64) -> f64 {
        (2.0 * PI * time / self.envelope_period).sin()
    }

    pub(crate) fn generate<R: Rng>(&self, duration: f64, rng: &mut R) -> Dataset {
        let mut out = DatasetBuilder::new(duration);
        let mut time = 0.0;
        while time + TIME_EPSILON < duration {
            let interval = 60.0 / (self.bpm + centred(rng, self.bpm_spread));
            let m = self.envelope(time);
            let qrs = self.qrs.with_magnitude(self.qrs_magnitude + self.qrs_swing * m);
            let t = self.t.with_magnitude(self.t_magnitude + self.t_swing * m);
            let beat = Beat::new(time, qrs, t);
            out.push_trace(beat.synthesize(), beat.annotation(BeatKind::Ventricular));
            time += interval;
        }
        out.finish()
    }

    pub(crate) fn vectors(&self) -> Vec<Vector> {
        vec![self.qrs, self.t]
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        require_rate(self.bpm - self.bpm_spread / 2.0)?;
        require(self.envelope_period > 0.0, "envelope period must be positive")?;
        require(
            self.qrs_magnitude >= self.qrs_swing.abs(),
            "QRS envelope must not flip polarity",
        )
    }
}

/// Ventricular fibrillation: an independent bounded random walk per lead.
///
/// Whenever a step would leave `[-ceiling, ceiling]` the walk rebounds to
/// `rebound` times its previous value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChaosPolicy {
    pub step: f64,
    pub spread: f64,
    pub ceiling: f64,
    pub rebound: f64,
}

impl ChaosPolicy {
    pub(crate) fn generate<R: Rng>(&self, duration: f64, rng: &mut R) -> Dataset {
        let mut out = DatasetBuilder::new(duration);
        for lead in Lead::ALL {
            let mut last = 0.0;
            for time in fixed_train(duration, self.step, 0.0) {
                let mut value = last + centred(rng, self.spread);
                if value.abs() > self.ceiling {
                    value = last * self.rebound;
                }
                out.push_point(lead, Point::new(time, value));
                last = value;
            }
        }
        out.finish()
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        require(self.step > 0.0, "sample step must be positive")?;
        require(self.ceiling > 0.0, "ceiling must be positive")?;
        require(
            self.rebound.abs() < 1.0,
            "rebound must shrink the amplitude",
        )
    }
}

/// Asystole: low-amplitude baseline noise on every lead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselinePolicy {
    pub step: f64,
    /// Peak-to-peak noise amplitude.
    pub span: f64,
}

impl BaselinePolicy {
    pub(crate) fn generate<R: Rng>(&self, duration: f64, rng: &mut R) -> Dataset {
        let mut out = DatasetBuilder::new(duration);
        for lead in Lead::ALL {
            for time in fixed_train(duration, self.step, 0.0) {
                out.push_point(lead, Point::new(time, centred(rng, self.span)));
            }
        }
        out.finish()
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        require(self.step > 0.0, "sample step must be positive")?;
        require(
            (0.0..0.1).contains(&self.span),
            "baseline noise must stay near the isoelectric line",
        )
    }
}

/// Fixed-rate ventricular pacing: a narrow stimulus artifact on every lead
/// followed, after the capture delay, by a wide paced complex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PacedPolicy {
    pub bpm: f64,
    pub spike_amplitude: f64,
    /// Seconds from spike onset back to baseline.
    pub spike_width: f64,
    /// Seconds from spike onset to QRS onset.
    pub capture_delay: f64,
    pub qrs: Vector,
    pub t: Vector,
}

impl PacedPolicy {
    fn spike(&self, at: f64) -> [Point; 3] {
        [
            Point::new(at, 0.0),
            Point::new(at + self.spike_width / 2.0, self.spike_amplitude),
            Point::new(at + self.spike_width, 0.0),
        ]
    }

    pub(crate) fn generate(&self, duration: f64) -> Dataset {
        let mut out = DatasetBuilder::new(duration);
        for start in fixed_train(duration, 60.0 / self.bpm, 0.0) {
            for lead in Lead::ALL {
                for point in self.spike(start) {
                    out.push_point(lead, point);
                }
            }
            let beat = Beat::new(start + self.capture_delay, self.qrs, self.t);
            out.push_trace(beat.synthesize(), beat.annotation(BeatKind::Paced));
        }
        out.finish()
    }

    pub(crate) fn vectors(&self) -> Vec<Vector> {
        vec![self.qrs, self.t]
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        require_rate(self.bpm)?;
        require(self.spike_width > 0.0, "spike width must be positive")?;
        require(
            self.capture_delay >= self.spike_width,
            "capture cannot start before the stimulus ends",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{PACED_QRS, PACED_T, VENTRICULAR_QRS, VENTRICULAR_T};
    use rand::{rngs::StdRng, SeedableRng};

    fn torsades() -> TorsadesPolicy {
        TorsadesPolicy {
            bpm: 200.0,
            bpm_spread: 40.0,
            envelope_period: 4.0,
            qrs: VENTRICULAR_QRS,
            t: VENTRICULAR_T,
            qrs_magnitude: 1.0,
            qrs_swing: 0.6,
            t_magnitude: 0.3,
            t_swing: 0.2,
        }
    }

    #[test]
    fn torsades_amplitude_twists() {
        let policy = torsades();
        policy.validate().unwrap();
        let data = policy.generate(8.0, &mut StdRng::seed_from_u64(1));
        let onsets = data.qrs_onsets();
        for w in onsets.windows(2) {
            let rr = w[1] - w[0];
            assert!(rr >= 60.0 / 220.0 - 1e-9 && rr <= 60.0 / 180.0 + 1e-9);
        }
        let peak = |lead: Lead, from: f64, to: f64| {
            data.lead(lead)
                .iter()
                .filter(|p| p.time >= from && p.time < to)
                .map(|p| p.value.abs())
                .fold(0.0, f64::max)
        };
        // envelope peaks near 1 s and troughs near 3 s
        assert!(peak(Lead::V1, 0.7, 1.3) > peak(Lead::V1, 2.7, 3.3));
    }

    #[test]
    fn fibrillation_walk_stays_bounded() {
        let policy = ChaosPolicy {
            step: 0.02,
            spread: 0.9,
            ceiling: 1.2,
            rebound: -0.7,
        };
        let data = policy.generate(10.0, &mut StdRng::seed_from_u64(2));
        assert!(data.beats.is_empty());
        for lead in Lead::ALL {
            let points = data.lead(lead);
            assert_eq!(points.len(), 500);
            assert!(points.iter().all(|p| p.value.abs() <= 1.2));
        }
        assert_ne!(data.lead(Lead::DI), data.lead(Lead::DII));
    }

    #[test]
    fn asystole_is_flat() {
        let policy = BaselinePolicy {
            step: 0.02,
            span: 0.02,
        };
        let data = policy.generate(4.0, &mut StdRng::seed_from_u64(4));
        for lead in Lead::ALL {
            assert!(data.lead(lead).iter().all(|p| p.value.abs() <= 0.01));
        }
    }

    #[test]
    fn paced_spike_precedes_every_complex() {
        let policy = PacedPolicy {
            bpm: 70.0,
            spike_amplitude: -0.5,
            spike_width: 0.01,
            capture_delay: 0.02,
            qrs: PACED_QRS,
            t: PACED_T,
        };
        policy.validate().unwrap();
        let data = policy.generate(6.0);
        assert_eq!(data.beats.len(), 7);
        for beat in &data.beats {
            assert_eq!(beat.kind, BeatKind::Paced);
            let q = beat.qrs_onset.unwrap();
            let spike = data
                .lead(Lead::V3)
                .iter()
                .find(|p| (p.time - (q - 0.015)).abs() < 1e-9)
                .unwrap();
            assert_eq!(spike.value, -0.5);
        }
    }
}
