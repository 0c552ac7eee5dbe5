use super::{centred, require, require_rate, TIME_EPSILON};
use crate::beat::{Beat, BeatKind};
use crate::error::EngineError;
use crate::signal::{Dataset, DatasetBuilder};
use crate::vector::{Vector, NORMAL_P, NORMAL_QRS, NORMAL_T};
use rand::Rng;
use serde::Serialize;

/// Beat-to-beat variability, as full peak-to-peak fractions of the base value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Jitter {
    pub interval: f64,
    pub amplitude: f64,
}

impl Jitter {
    pub const NONE: Jitter = Jitter {
        interval: 0.0,
        amplitude: 0.0,
    };

    /// ±2.5% interval and ±5% amplitude.
    pub const PHYSIOLOGICAL: Jitter = Jitter {
        interval: 0.05,
        amplitude: 0.1,
    };

    fn draw<R: Rng>(span: f64, rng: &mut R) -> f64 {
        if span == 0.0 {
            0.0
        } else {
            centred(rng, span)
        }
    }
}

/// Sinus node firing at a fixed base rate with independent per-beat jitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SinusPolicy {
    pub bpm: f64,
    pub jitter: Jitter,
}

impl SinusPolicy {
    pub const fn new(bpm: f64) -> Self {
        Self {
            bpm,
            jitter: Jitter::PHYSIOLOGICAL,
        }
    }

    pub const fn with_jitter(self, jitter: Jitter) -> Self {
        Self { jitter, ..self }
    }

    pub(crate) fn generate<R: Rng>(&self, duration: f64, rng: &mut R) -> Dataset {
        let base = 60.0 / self.bpm;
        let mut out = DatasetBuilder::new(duration);
        let mut time = 0.0;
        while time + TIME_EPSILON < duration {
            let interval = base * (1.0 + Jitter::draw(self.jitter.interval, rng));
            let scale = 1.0 + Jitter::draw(self.jitter.amplitude, rng);
            let beat = Beat::new(time, NORMAL_QRS.scaled(scale), NORMAL_T.scaled(scale))
                .with_p(NORMAL_P.scaled(scale));
            out.push_trace(beat.synthesize(), beat.annotation(BeatKind::Conducted));
            time += interval;
        }
        out.finish()
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        require_rate(self.bpm)?;
        let spans = 0.0..1.0;
        require(
            spans.contains(&self.jitter.interval) && spans.contains(&self.jitter.amplitude),
            "jitter spans must lie within [0, 1)",
        )
    }
}

pub(crate) fn vectors() -> Vec<Vector> {
    vec![NORMAL_P, NORMAL_QRS, NORMAL_T]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::Lead;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn steady_75_bpm_gives_five_beats_in_four_seconds() {
        let policy = SinusPolicy::new(75.0).with_jitter(Jitter::NONE);
        let data = policy.generate(4.0, &mut StdRng::seed_from_u64(7));
        assert_eq!(data.beats.len(), 5);
        for (i, beat) in data.beats.iter().enumerate() {
            let start = i as f64 * 0.8;
            assert!((beat.p_onset.unwrap() - start).abs() < 1e-9);
            assert!((beat.qrs_onset.unwrap() - (start + 0.16)).abs() < 1e-9);
        }
        let per_beat = NORMAL_P.shape.len() + NORMAL_QRS.shape.len() + NORMAL_T.shape.len();
        for lead in Lead::ALL {
            assert_eq!(data.lead(lead).len(), 5 * per_beat);
        }
    }

    #[test]
    fn jitter_stays_within_envelope() {
        let policy = SinusPolicy::new(60.0);
        let data = policy.generate(30.0, &mut StdRng::seed_from_u64(11));
        let onsets = data.qrs_onsets();
        for w in onsets.windows(2) {
            let rr = w[1] - w[0];
            assert!((0.975 - 1e-9..=1.025 + 1e-9).contains(&rr), "rr {rr}");
        }
        let distinct = onsets
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|rr| (rr - 1.0).abs() > 1e-6)
            .count();
        assert!(distinct > 0, "jitter should vary the interval");
    }
}
