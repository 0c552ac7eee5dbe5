use super::{require, require_rate, TIME_EPSILON};
use crate::beat::{Beat, BeatKind};
use crate::error::EngineError;
use crate::signal::{Dataset, DatasetBuilder};
use crate::vector::{Vector, NORMAL_P, NORMAL_QRS, NORMAL_T};
use serde::Serialize;

/// Where the premature impulse comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EctopicFocus {
    /// Ectopic P wave, conducted with a normal QRS/T.
    Atrial { p: Vector },
    /// Wide ventricular complex with no P wave.
    Ventricular { qrs: Vector, t: Vector },
}

/// Regular sinus train where every `every`-th beat is replaced by an early
/// ectopic beat.
///
/// `coupling` is the fraction of the base interval between the preceding
/// sinus beat and the ectopic beat; `pause` is the distance, in base
/// intervals, from the preceding sinus beat to the next one. A pause of 2.0
/// is fully compensatory; anything shorter resets the sinus node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EctopicPolicy {
    pub bpm: f64,
    pub every: usize,
    pub coupling: f64,
    pub pause: f64,
    pub focus: EctopicFocus,
}

impl EctopicPolicy {
    pub(crate) fn generate(&self, duration: f64) -> Dataset {
        let base = 60.0 / self.bpm;
        let mut out = DatasetBuilder::new(duration);
        // `slot` is the next sinus start; an ectopic beat fires before it.
        let mut slot = 0.0;
        let mut count = 0usize;
        loop {
            count += 1;
            let (beat, kind) = if count % self.every == 0 {
                let preceding = slot - base;
                slot = preceding + self.pause * base;
                (self.ectopic_beat(preceding + self.coupling * base), BeatKind::Premature)
            } else {
                let beat = Beat::new(slot, NORMAL_QRS, NORMAL_T).with_p(NORMAL_P);
                slot += base;
                (beat, BeatKind::Conducted)
            };
            if beat.start + TIME_EPSILON >= duration {
                break;
            }
            out.push_trace(beat.synthesize(), beat.annotation(kind));
        }
        out.finish()
    }

    fn ectopic_beat(&self, start: f64) -> Beat {
        match self.focus {
            EctopicFocus::Atrial { p } => Beat::new(start, NORMAL_QRS, NORMAL_T).with_p(p),
            EctopicFocus::Ventricular { qrs, t } => Beat::new(start, qrs, t),
        }
    }

    pub(crate) fn vectors(&self) -> Vec<Vector> {
        let mut vectors = vec![NORMAL_P, NORMAL_QRS, NORMAL_T];
        match self.focus {
            EctopicFocus::Atrial { p } => vectors.push(p),
            EctopicFocus::Ventricular { qrs, t } => vectors.extend([qrs, t]),
        }
        vectors
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        require_rate(self.bpm)?;
        require(self.every >= 2, "ectopic beats need at least one sinus beat between them")?;
        require(
            self.coupling > 0.0 && self.coupling < 1.0,
            "coupling must fall inside the base interval",
        )?;
        require(
            self.pause > self.coupling && self.pause <= 2.0,
            "pause must follow the ectopic beat and not exceed two base intervals",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{VENTRICULAR_QRS, VENTRICULAR_T};

    fn ventricular(every: usize, coupling: f64, pause: f64) -> EctopicPolicy {
        EctopicPolicy {
            bpm: 60.0,
            every,
            coupling,
            pause,
            focus: EctopicFocus::Ventricular {
                qrs: VENTRICULAR_QRS,
                t: VENTRICULAR_T,
            },
        }
    }

    #[test]
    fn bigeminy_alternates_sinus_and_ectopic() {
        let data = ventricular(2, 0.8, 2.0).generate(10.0);
        let kinds: Vec<BeatKind> = data.beats.iter().map(|b| b.kind).collect();
        for pair in kinds.chunks(2) {
            assert_eq!(pair[0], BeatKind::Conducted);
            if pair.len() == 2 {
                assert_eq!(pair[1], BeatKind::Premature);
            }
        }
    }

    #[test]
    fn compensatory_pause_restores_phase() {
        let data = ventricular(3, 0.7, 2.0).generate(12.0);
        let beats = &data.beats;
        let mut checked = 0;
        for i in 1..beats.len().saturating_sub(1) {
            if beats[i].kind == BeatKind::Premature {
                let before = beats[i - 1].qrs_onset.unwrap();
                let after = beats[i + 1].qrs_onset.unwrap();
                assert!(((after - before) - 2.0).abs() < 0.02);
                assert!(beats[i].p_onset.is_none());
                checked += 1;
            }
        }
        assert!(checked >= 2);
    }

    #[test]
    fn ectopic_beat_near_the_window_end_is_kept() {
        // Next sinus slot (4.0 s) is outside the window, the PVC (3.6 s) is not.
        let data = ventricular(5, 0.6, 2.0).generate(3.9);
        let kinds: Vec<BeatKind> = data.beats.iter().map(|b| b.kind).collect();
        assert_eq!(kinds.len(), 5);
        assert_eq!(kinds[4], BeatKind::Premature);
        assert!((data.beats[4].qrs_onset.unwrap() - 3.6).abs() < 1e-9);

        let shorter = ventricular(5, 0.6, 2.0).generate(3.6);
        assert_eq!(shorter.beats.len(), 4);
        assert!(shorter.beats.iter().all(|b| b.kind == BeatKind::Conducted));
    }

    #[test]
    fn rejects_inconsistent_timing() {
        assert!(ventricular(1, 0.7, 2.0).validate().is_err());
        assert!(ventricular(3, 1.2, 2.0).validate().is_err());
        assert!(ventricular(3, 0.7, 0.5).validate().is_err());
        assert!(ventricular(3, 0.7, 2.0).validate().is_ok());
    }
}
