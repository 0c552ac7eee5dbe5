use super::{fixed_train, require, require_rate, TIME_EPSILON};
use crate::beat::{Beat, BeatKind};
use crate::error::EngineError;
use crate::lead::Lead;
use crate::projection::atrial_gain;
use crate::signal::{Dataset, DatasetBuilder, Point};
use crate::vector::{Vector, NORMAL_QRS, NORMAL_T};
use rand::Rng;
use serde::Serialize;

/// Atrial fibrillation: irregularly irregular R-R with fibrillatory noise
/// filling every interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FibrillationPolicy {
    /// Shortest R-R interval (seconds).
    pub rr_min: f64,
    /// Longest R-R interval (seconds).
    pub rr_max: f64,
    /// Peak-to-peak amplitude of the f-wave noise.
    pub noise_span: f64,
    /// Spacing of noise samples (seconds).
    pub noise_step: f64,
    /// Noise is not placed this close to a QRS/T knot (seconds).
    pub clearance: f64,
}

impl FibrillationPolicy {
    /// Slow ventricular response, fine f waves.
    pub const LOW: Self = Self::tier(0.6, 1.0, 0.05);
    pub const MODERATE: Self = Self::tier(0.4, 0.9, 0.1);
    /// Rapid ventricular response, coarse f waves.
    pub const HIGH: Self = Self::tier(0.25, 0.5, 0.15);

    const fn tier(rr_min: f64, rr_max: f64, noise_span: f64) -> Self {
        Self {
            rr_min,
            rr_max,
            noise_span,
            noise_step: 0.03,
            clearance: 0.01,
        }
    }

    pub(crate) fn generate<R: Rng>(&self, duration: f64, rng: &mut R) -> Dataset {
        let mut out = DatasetBuilder::new(duration);
        let mut windows = Vec::new();
        let mut time = 0.0;
        while time + TIME_EPSILON < duration {
            let interval = rng.gen_range(self.rr_min..self.rr_max);
            let beat = Beat::new(time, NORMAL_QRS, NORMAL_T);
            out.push_trace(beat.synthesize(), beat.annotation(BeatKind::Conducted));
            windows.push((time, time + interval));
            time += interval;
        }

        for lead in Lead::ALL {
            let mut occupied: Vec<f64> = out.lead(lead).iter().map(|p| p.time).collect();
            occupied.sort_by(f64::total_cmp);
            for &(from, to) in &windows {
                let mut t = from;
                while t < to {
                    if !is_near(&occupied, t, self.clearance) {
                        let value = (rng.gen::<f64>() - 0.5) * self.noise_span;
                        out.push_point(lead, Point::new(t, value));
                    }
                    t += self.noise_step;
                }
            }
        }
        out.finish()
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        require(
            self.rr_min > 0.0 && self.rr_max > self.rr_min,
            "R-R band must be positive and non-empty",
        )?;
        require(
            self.noise_step > 0.0 && self.noise_span >= 0.0 && self.clearance >= 0.0,
            "noise parameters must be non-negative with a positive step",
        )
    }
}

fn is_near(sorted: &[f64], t: f64, clearance: f64) -> bool {
    let idx = sorted.partition_point(|&x| x < t - clearance);
    idx < sorted.len() && sorted[idx] <= t + clearance
}

pub(crate) fn fibrillation_vectors() -> Vec<Vector> {
    vec![NORMAL_QRS, NORMAL_T]
}

/// Atrial flutter: continuous sawtooth at the atrial rate, with every
/// `conduction_ratio`-th wave conducted to the ventricles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlutterPolicy {
    pub atrial_bpm: f64,
    pub conduction_ratio: u32,
    pub wave: Vector,
}

impl FlutterPolicy {
    pub(crate) fn generate(&self, duration: f64) -> Dataset {
        let atrial_interval = 60.0 / self.atrial_bpm;
        let wave = self.wave.with_duration(atrial_interval);
        let mut out = DatasetBuilder::new(duration);

        for start in fixed_train(duration, atrial_interval, 0.0) {
            for lead in Lead::ALL {
                for point in wave.knots_at(start, atrial_gain(&wave, lead)) {
                    out.push_point(lead, point);
                }
            }
        }

        let ratio = f64::from(self.conduction_ratio);
        let first = atrial_interval * (ratio - 1.0);
        for start in fixed_train(duration, atrial_interval * ratio, first) {
            let beat = Beat::new(start, NORMAL_QRS, NORMAL_T);
            out.push_trace(beat.synthesize(), beat.annotation(BeatKind::Conducted));
        }
        out.finish()
    }

    pub(crate) fn vectors(&self) -> Vec<Vector> {
        vec![self.wave, NORMAL_QRS, NORMAL_T]
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        require_rate(self.atrial_bpm)?;
        require(self.conduction_ratio >= 1, "conduction ratio must be at least 1:1")
    }
}

/// Multifocal atrial tachycardia: irregular rate above 100 with each P wave
/// drawn from a set of distinct ectopic foci.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MultifocalPolicy {
    pub min_bpm: f64,
    pub max_bpm: f64,
    pub foci: &'static [Vector],
}

impl MultifocalPolicy {
    pub(crate) fn generate<R: Rng>(&self, duration: f64, rng: &mut R) -> Dataset {
        let mut out = DatasetBuilder::new(duration);
        let mut time = 0.0;
        while time + TIME_EPSILON < duration {
            let bpm = self.min_bpm + rng.gen::<f64>() * (self.max_bpm - self.min_bpm);
            let p = self.foci[rng.gen_range(0..self.foci.len())];
            let beat = Beat::new(time, NORMAL_QRS, NORMAL_T).with_p(p);
            out.push_trace(beat.synthesize(), beat.annotation(BeatKind::Conducted));
            time += 60.0 / bpm;
        }
        out.finish()
    }

    pub(crate) fn vectors(&self) -> Vec<Vector> {
        let mut vectors = vec![NORMAL_QRS, NORMAL_T];
        vectors.extend_from_slice(self.foci);
        vectors
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        require_rate(self.min_bpm)?;
        require(self.max_bpm >= self.min_bpm, "rate band is inverted")?;
        require(self.foci.len() >= 3, "multifocal rhythm needs at least three foci")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beat::ST_SEGMENT;
    use crate::vector::{FLUTTER_WAVE, NORMAL_P};
    use rand::{rngs::StdRng, SeedableRng};

    static FOCI: [Vector; 3] = [
        NORMAL_P,
        NORMAL_P.with_angle(20.0).with_magnitude(0.12),
        NORMAL_P.with_angle(80.0).with_magnitude(0.18),
    ];

    #[test]
    fn fibrillation_rr_stays_in_band() {
        let policy = FibrillationPolicy::MODERATE;
        let data = policy.generate(20.0, &mut StdRng::seed_from_u64(3));
        let onsets = data.qrs_onsets();
        assert!(onsets.len() > 10);
        for w in onsets.windows(2) {
            let rr = w[1] - w[0];
            assert!(rr >= 0.4 - 1e-9 && rr < 0.9 + 1e-9, "rr {rr}");
        }
        assert!(data.beats.iter().all(|b| b.p_onset.is_none()));
    }

    #[test]
    fn fibrillation_noise_fills_the_baseline() {
        let policy = FibrillationPolicy::HIGH;
        let data = policy.generate(5.0, &mut StdRng::seed_from_u64(5));
        let points = data.lead(Lead::V1);
        let qrs_t_knots = data.beats.len() * (NORMAL_QRS.shape.len() + NORMAL_T.shape.len());
        assert!(points.len() > qrs_t_knots + 50);
        assert!(points.windows(2).all(|w| w[0].time <= w[1].time));
    }

    /// Largest |value| of the noise between the end of each T wave and the
    /// next QRS, over every lead.
    fn baseline_noise_peak(data: &Dataset) -> f64 {
        let onsets = data.qrs_onsets();
        let beat_span = NORMAL_QRS.duration + ST_SEGMENT + NORMAL_T.duration;
        let mut peak = 0.0_f64;
        for w in onsets.windows(2) {
            let (from, to) = (w[0] + beat_span + 0.011, w[1] - 0.011);
            for lead in Lead::ALL {
                for p in data.lead(lead).iter().filter(|p| p.time > from && p.time < to) {
                    peak = peak.max(p.value.abs());
                }
            }
        }
        peak
    }

    #[test]
    fn fibrillation_noise_grows_with_tier() {
        let peak = |policy: FibrillationPolicy| {
            baseline_noise_peak(&policy.generate(20.0, &mut StdRng::seed_from_u64(11)))
        };
        let low = peak(FibrillationPolicy::LOW);
        let moderate = peak(FibrillationPolicy::MODERATE);
        let high = peak(FibrillationPolicy::HIGH);
        assert!(low > 0.0 && low <= 0.025, "low {low}");
        assert!(moderate > 0.025 && moderate <= 0.05, "moderate {moderate}");
        assert!(high > 0.05 && high <= 0.075, "high {high}");
    }

    #[test]
    fn flutter_conducts_every_second_wave() {
        let policy = FlutterPolicy {
            atrial_bpm: 300.0,
            conduction_ratio: 2,
            wave: FLUTTER_WAVE,
        };
        let data = policy.generate(4.0);
        let onsets = data.qrs_onsets();
        assert_eq!(onsets.len(), 10);
        assert!((onsets[0] - 0.2).abs() < 1e-9);
        for w in onsets.windows(2) {
            assert!(((w[1] - w[0]) - 0.4).abs() < 1e-9);
        }
        let dii = data.lead(Lead::DII);
        assert!(dii.iter().any(|p| p.value < -0.2), "sawtooth in inferior leads");
    }

    #[test]
    fn multifocal_uses_several_p_shapes() {
        let policy = MultifocalPolicy {
            min_bpm: 110.0,
            max_bpm: 130.0,
            foci: &FOCI,
        };
        policy.validate().unwrap();
        let data = policy.generate(20.0, &mut StdRng::seed_from_u64(9));
        let onsets = data.qrs_onsets();
        for w in onsets.windows(2) {
            let rr = w[1] - w[0];
            assert!(rr <= 60.0 / 110.0 + 1e-9 && rr >= 60.0 / 130.0 - 1e-9);
        }
        // P peak in DII differs between foci.
        let mut peaks: Vec<f64> = data
            .beats
            .iter()
            .map(|b| {
                let peak_time = b.p_onset.unwrap() + NORMAL_P.duration / 2.0;
                data.lead(Lead::DII)
                    .iter()
                    .find(|p| (p.time - peak_time).abs() < 1e-9)
                    .map(|p| (p.value * 1e6).round() / 1e6)
                    .unwrap()
            })
            .collect();
        peaks.sort_by(f64::total_cmp);
        peaks.dedup();
        assert!(peaks.len() >= 2);
    }
}
