//! Rhythm catalog: the ordered, read-only registry of every rhythm the engine
//! can synthesize, with its presentation metadata.

use crate::beat::BeatKind;
use crate::error::EngineError;
use crate::projection::Morphology;
use crate::rhythm::{
    BaselinePolicy, ChaosPolicy, DissociationPolicy, EctopicFocus, EctopicPolicy,
    FibrillationPolicy, FlutterPolicy, MobitzIIPolicy, MultifocalPolicy, PacedPolicy,
    RegularPolicy, Rhythm, SinusPolicy, TorsadesPolicy, WenckebachPolicy,
};
use crate::signal::Dataset;
use crate::vector::{
    Vector, AVNRT_T, FLUTTER_WAVE, LBBB_QRS, LBBB_T, NORMAL_P, NORMAL_QRS, NORMAL_T, PACED_QRS,
    PACED_T, RBBB_QRS, RBBB_T, VENTRICULAR_QRS, VENTRICULAR_T, WPW_QRS,
};
use log::info;
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

/// Broad anatomical origin used to group rhythms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Supraventricular,
    Ventricular,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Supraventricular => "supraventricular",
            Category::Ventricular => "ventricular",
        })
    }
}

/// Textbook recognition criteria. Opaque to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Criteria {
    pub rhythm: &'static str,
    pub rhythm_analysis: &'static str,
    pub rate: &'static str,
    pub p_wave: &'static str,
    pub pr_interval: &'static str,
    pub qrs: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis: Option<&'static str>,
}

/// One catalog entry: identity, metadata and the generator policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RhythmDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
    pub description: &'static str,
    pub criteria: Criteria,
    pub rhythm: Rhythm,
}

impl RhythmDefinition {
    pub fn generate<R: Rng>(&self, duration: f64, rng: &mut R) -> Dataset {
        self.rhythm.generate(duration, rng)
    }
}

/// Ordered set of rhythm definitions with unique ids.
#[derive(Debug, Clone)]
pub struct Catalog {
    definitions: Vec<RhythmDefinition>,
}

impl Catalog {
    /// Validates every definition and rejects duplicate ids.
    pub fn try_new(definitions: Vec<RhythmDefinition>) -> Result<Self, EngineError> {
        let mut seen = HashSet::new();
        for def in &definitions {
            if !seen.insert(def.id) {
                return Err(EngineError::DuplicateRhythm(def.id.to_string()));
            }
            def.rhythm
                .validate()
                .map_err(|err| EngineError::in_definition(def.id, err))?;
        }
        Ok(Self { definitions })
    }

    /// The built-in catalog, validated on first use.
    ///
    /// # Panics
    /// If a built-in constant table is malformed.
    pub fn standard() -> &'static Catalog {
        static STANDARD: OnceLock<Catalog> = OnceLock::new();
        STANDARD.get_or_init(|| {
            let catalog = Catalog::try_new(standard_definitions())
                .unwrap_or_else(|err| panic!("built-in rhythm catalog is invalid: {err:?}"));
            info!("rhythm catalog ready with {} definitions", catalog.len());
            catalog
        })
    }

    pub fn get(&self, id: &str) -> Result<&RhythmDefinition, EngineError> {
        self.definitions
            .iter()
            .find(|def| def.id == id)
            .ok_or_else(|| EngineError::UnknownRhythm(id.to_string()))
    }

    /// Synthesizes `duration` seconds of the rhythm registered as `id`.
    pub fn generate<R: Rng>(
        &self,
        id: &str,
        duration: f64,
        rng: &mut R,
    ) -> Result<Dataset, EngineError> {
        Ok(self.get(id)?.generate(duration, rng))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RhythmDefinition> {
        self.definitions.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.definitions.iter().map(|def| def.id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

static MAT_FOCI: [Vector; 3] = [
    NORMAL_P,
    NORMAL_P.with_angle(20.0).with_magnitude(0.12),
    NORMAL_P.with_angle(80.0).with_magnitude(0.18),
];

static WENCKEBACH_PR: [f64; 3] = [0.20, 0.28, 0.36];

const PAC_P: Vector = NORMAL_P.with_angle(20.0).with_magnitude(0.1);

const PVC: EctopicFocus = EctopicFocus::Ventricular {
    qrs: VENTRICULAR_QRS,
    t: VENTRICULAR_T,
};

fn entry(
    id: &'static str,
    name: &'static str,
    category: Category,
    description: &'static str,
    criteria: [&'static str; 6],
    axis: Option<&'static str>,
    rhythm: Rhythm,
) -> RhythmDefinition {
    let [rhythm_text, rhythm_analysis, rate, p_wave, pr_interval, qrs] = criteria;
    RhythmDefinition {
        id,
        name,
        category,
        description,
        criteria: Criteria {
            rhythm: rhythm_text,
            rhythm_analysis,
            rate,
            p_wave,
            pr_interval,
            qrs,
            axis,
        },
        rhythm,
    }
}

fn standard_definitions() -> Vec<RhythmDefinition> {
    use Category::{Supraventricular as Sv, Ventricular as V};

    vec![
        entry(
            "nsr",
            "Normal Sinus Rhythm",
            Sv,
            "Normal cardiac rhythm: rate 60-100/min, regular, a P wave precedes every QRS.",
            [
                "Regular",
                "Regular",
                "60-100 bpm",
                "Present, precedes every QRS",
                "0.12-0.20 s",
                "Normal (< 0.12 s)",
            ],
            Some("Normal (0° to +90°)"),
            Rhythm::Sinus(SinusPolicy::new(75.0)),
        ),
        entry(
            "sinus_brady",
            "Sinus Bradycardia",
            Sv,
            "Rate below 60/min, regular rhythm, normal P waves.",
            ["Regular", "Regular", "< 60 bpm", "Normal", "0.12-0.20 s", "< 0.12 s"],
            Some("Normal"),
            Rhythm::Sinus(SinusPolicy::new(48.0)),
        ),
        entry(
            "sinus_tachy",
            "Sinus Tachycardia",
            Sv,
            "Rate above 100/min, regular rhythm, normal P waves.",
            ["Regular", "Regular", "> 100 bpm", "Normal", "0.12-0.20 s", "< 0.12 s"],
            Some("Normal"),
            Rhythm::Sinus(SinusPolicy::new(120.0)),
        ),
        entry(
            "pac",
            "Premature Atrial Complex",
            Sv,
            "Early beat from an ectopic atrial focus. The P wave is premature and shaped \
             differently from the sinus P, usually followed by a narrow QRS.",
            [
                "Irregular due to premature beat",
                "Irregular",
                "Depends on the underlying rhythm",
                "Premature, abnormal shape",
                "Variable",
                "Normal (< 0.12 s)",
            ],
            None,
            Rhythm::Premature(EctopicPolicy {
                bpm: 70.0,
                every: 6,
                coupling: 0.7,
                pause: 1.7,
                focus: EctopicFocus::Atrial { p: PAC_P },
            }),
        ),
        entry(
            "afib_moderate",
            "Atrial Fibrillation, Controlled Response",
            Sv,
            "Totally irregular rhythm without clear P waves, variable R-R intervals and chaotic \
             atrial activity.",
            [
                "Irregularly irregular",
                "Irregularly irregular",
                "Variable (e.g. 60-100 bpm)",
                "Absent (fibrillatory waves)",
                "Not measurable",
                "< 0.12 s",
            ],
            Some("Variable"),
            Rhythm::AtrialFibrillation(FibrillationPolicy::MODERATE),
        ),
        entry(
            "afib_low",
            "Atrial Fibrillation, Slow Response",
            Sv,
            "Atrial fibrillation with a slow ventricular response (40-60 bpm) and fine, barely \
             visible f waves.",
            [
                "Irregularly irregular",
                "Irregularly irregular",
                "40-60 bpm",
                "Absent (fine f waves)",
                "Not measurable",
                "< 0.12 s",
            ],
            Some("Variable"),
            Rhythm::AtrialFibrillation(FibrillationPolicy::LOW),
        ),
        entry(
            "afib_high",
            "Atrial Fibrillation, Rapid Response",
            Sv,
            "Atrial fibrillation with a rapid ventricular response (120-160 bpm) and coarse, \
             chaotic f waves.",
            [
                "Irregularly irregular",
                "Irregularly irregular",
                "120-160 bpm",
                "Absent (coarse f waves)",
                "Not measurable",
                "< 0.12 s",
            ],
            Some("Variable"),
            Rhythm::AtrialFibrillation(FibrillationPolicy::HIGH),
        ),
        entry(
            "aflutter",
            "Atrial Flutter",
            Sv,
            "Sawtooth atrial waves (F waves) at about 300/min; ventricular rhythm set by the AV \
             conduction ratio.",
            [
                "Regular (fixed block)",
                "Regular",
                "Ventricular ~150 bpm (2:1)",
                "Sawtooth F waves",
                "Not measurable",
                "< 0.12 s",
            ],
            Some("Variable"),
            Rhythm::AtrialFlutter(FlutterPolicy {
                atrial_bpm: 300.0,
                conduction_ratio: 2,
                wave: FLUTTER_WAVE,
            }),
        ),
        entry(
            "mat",
            "Multifocal Atrial Tachycardia",
            Sv,
            "Fast, irregular atrial rhythm with at least three distinct P-wave morphologies, \
             variable PR and a rate above 100 bpm.",
            [
                "Irregularly irregular",
                "Irregular",
                "> 100 bpm",
                "At least 3 distinct shapes",
                "Variable",
                "Normal (< 0.12 s)",
            ],
            None,
            Rhythm::MultifocalAtrial(MultifocalPolicy {
                min_bpm: 110.0,
                max_bpm: 130.0,
                foci: &MAT_FOCI,
            }),
        ),
        entry(
            "psvt",
            "Paroxysmal Supraventricular Tachycardia",
            Sv,
            "Fast regular tachycardia originating above the ventricles, with a narrow QRS, a rate \
             of 150-250 bpm and abrupt onset and termination.",
            [
                "Regular",
                "Regular",
                "150-250 bpm",
                "Often hidden",
                "Not measurable",
                "Normal (< 0.12 s)",
            ],
            None,
            Rhythm::Regular(RegularPolicy::sinus(190.0).without_p()),
        ),
        entry(
            "avnrt",
            "AV Nodal Reentrant Tachycardia",
            Sv,
            "The most common PSVT, driven by a reentry circuit inside the AV node. Regular \
             narrow-complex tachycardia whose retrograde P waves hide in the QRS or show as a \
             pseudo-S / pseudo-R'.",
            [
                "Regular",
                "Regular",
                "150-250 bpm",
                "Retrograde, hidden or pseudo-wave",
                "Not applicable",
                "Normal (< 0.12 s)",
            ],
            None,
            Rhythm::Regular(
                RegularPolicy::sinus(170.0)
                    .without_p()
                    .with_complex(NORMAL_QRS, AVNRT_T),
            ),
        ),
        entry(
            "junctional_escape",
            "Junctional Escape Rhythm",
            Sv,
            "Escape rhythm from the AV junction when the sinus node fails. Slow rate, narrow QRS, \
             absent or retrograde P waves.",
            [
                "Regular",
                "Regular",
                "40-60 bpm",
                "Absent or inverted/retrograde",
                "Not applicable",
                "< 0.12 s",
            ],
            Some("Normal"),
            Rhythm::Regular(
                RegularPolicy::sinus(52.0)
                    .without_p()
                    .with_kind(BeatKind::Junctional),
            ),
        ),
        entry(
            "avb_1st_degree",
            "First-Degree AV Block",
            Sv,
            "Fixed prolongation of the PR interval beyond 0.20 s.",
            ["Regular", "Regular", "Variable", "Normal", "> 0.20 s (fixed)", "< 0.12 s"],
            Some("Normal"),
            Rhythm::Regular(RegularPolicy::sinus(70.0).with_pr(0.28)),
        ),
        entry(
            "avb_2nd_degree_mobitz_I",
            "Second-Degree AV Block, Mobitz I (Wenckebach)",
            Sv,
            "Progressive PR prolongation over consecutive beats until one P wave is not conducted \
             and the cycle restarts, giving a regularly irregular rhythm.",
            [
                "Regularly irregular",
                "Grouped beating",
                "Bradycardic",
                "Normal, some not conducted",
                "Progressively lengthens",
                "Normal (< 0.12 s)",
            ],
            None,
            Rhythm::Wenckebach(WenckebachPolicy {
                bpm: 60.0,
                pr_progression: &WENCKEBACH_PR,
            }),
        ),
        entry(
            "avb_2nd_degree_mobitz_II",
            "Second-Degree AV Block, Mobitz II",
            Sv,
            "P waves suddenly blocked without prior PR prolongation; PR is constant in conducted \
             beats. Potentially dangerous.",
            [
                "Regularly irregular",
                "Regularly irregular",
                "Bradycardic",
                "Normal, some not conducted",
                "Constant in conducted beats",
                "May be wide",
            ],
            Some("Variable"),
            Rhythm::MobitzII(MobitzIIPolicy {
                bpm: 68.0,
                pr: 0.20,
                drop_every: 3,
            }),
        ),
        entry(
            "avb_3rd_degree",
            "Third-Degree (Complete) AV Block",
            Sv,
            "Complete AV dissociation: atria and ventricles beat independently.",
            [
                "Regular P-P, regular R-R",
                "Regular",
                "Ventricular 20-40 bpm",
                "Unrelated to QRS",
                "Variable",
                "Wide (> 0.12 s)",
            ],
            Some("Variable"),
            Rhythm::CompleteBlock(DissociationPolicy {
                atrial_bpm: 78.0,
                ventricular_bpm: 38.0,
                ventricular_offset: 0.5,
                escape_qrs: VENTRICULAR_QRS,
                escape_t: VENTRICULAR_T,
            }),
        ),
        entry(
            "wpw",
            "Wolff-Parkinson-White Pattern",
            Sv,
            "Ventricular pre-excitation through an accessory pathway, producing a short PR \
             interval and a delta wave at the start of the QRS.",
            ["Regular", "Regular", "Variable", "Normal", "< 0.12 s", "Wide with delta wave"],
            Some("Variable, depends on the pathway"),
            Rhythm::Regular(
                RegularPolicy::sinus(80.0)
                    .with_pr(0.10)
                    .with_complex(WPW_QRS, NORMAL_T),
            ),
        ),
        entry(
            "pvc",
            "Premature Ventricular Complex",
            V,
            "Ectopic beat from the ventricles: wide, bizarre QRS with no preceding P wave, \
             followed by a compensatory pause.",
            [
                "Regularly irregular",
                "Irregular (premature beat)",
                "Depends on the underlying rhythm",
                "Absent before the PVC",
                "Not applicable to the PVC",
                "Wide (> 0.12 s), bizarre",
            ],
            Some("Variable"),
            Rhythm::Premature(EctopicPolicy {
                bpm: 70.0,
                every: 5,
                coupling: 0.6,
                pause: 2.0,
                focus: PVC,
            }),
        ),
        entry(
            "bigeminy",
            "Ventricular Bigeminy",
            V,
            "Every normal sinus beat is followed by a premature ventricular complex, giving a \
             repeating normal-ectopic pattern.",
            [
                "Regularly irregular",
                "1:1 pattern",
                "Depends on the underlying rhythm",
                "Present in sinus beats",
                "Normal in sinus beats",
                "Normal and wide (PVC) alternating",
            ],
            None,
            Rhythm::Premature(EctopicPolicy {
                bpm: 70.0,
                every: 2,
                coupling: 0.8,
                pause: 2.0,
                focus: PVC,
            }),
        ),
        entry(
            "trigeminy",
            "Ventricular Trigeminy",
            V,
            "Every two normal sinus beats are followed by a premature ventricular complex, giving \
             a repeating normal-normal-ectopic pattern.",
            [
                "Regularly irregular",
                "2:1 pattern",
                "Depends on the underlying rhythm",
                "Present in sinus beats",
                "Normal in sinus beats",
                "Two normal, one wide (PVC)",
            ],
            None,
            Rhythm::Premature(EctopicPolicy {
                bpm: 75.0,
                every: 3,
                coupling: 0.7,
                pause: 2.0,
                focus: PVC,
            }),
        ),
        entry(
            "vtach",
            "Ventricular Tachycardia",
            V,
            "Fast (> 100/min) rhythm of ventricular origin with a wide, regular QRS.",
            [
                "Regular",
                "Regular",
                "100-270 bpm",
                "Not visible",
                "Not measurable",
                "Wide (> 0.12 s)",
            ],
            Some("Extreme / indeterminate"),
            Rhythm::Regular(RegularPolicy::ventricular(180.0, VENTRICULAR_QRS, VENTRICULAR_T)),
        ),
        entry(
            "torsades",
            "Torsades de Pointes",
            V,
            "Polymorphic ventricular tachycardia whose QRS complexes seem to twist around the \
             isoelectric line. Associated with a prolonged QT interval.",
            [
                "Irregular",
                "Irregular",
                "150-250 bpm",
                "Not visible",
                "Not measurable",
                "Wide, polymorphic, twisting",
            ],
            Some("Variable"),
            Rhythm::Torsades(TorsadesPolicy {
                bpm: 200.0,
                bpm_spread: 40.0,
                envelope_period: 4.0,
                qrs: VENTRICULAR_QRS,
                t: VENTRICULAR_T,
                qrs_magnitude: 1.0,
                qrs_swing: 0.6,
                t_magnitude: 0.3,
                t_swing: 0.2,
            }),
        ),
        entry(
            "ivr",
            "Idioventricular Rhythm",
            V,
            "Very slow ventricular escape rhythm (20-40 bpm) with a wide QRS, seen when higher \
             pacemakers fail.",
            [
                "Regular",
                "Regular",
                "20-40 bpm",
                "Absent or dissociated",
                "Not applicable",
                "Wide (> 0.12 s)",
            ],
            Some("Indeterminate"),
            Rhythm::Regular(RegularPolicy::ventricular(32.0, VENTRICULAR_QRS, VENTRICULAR_T)),
        ),
        entry(
            "aivr",
            "Accelerated Idioventricular Rhythm",
            V,
            "Regular ventricular rhythm at 40-120 bpm: faster than a ventricular escape, slower \
             than VT. Often seen during reperfusion after myocardial infarction.",
            [
                "Regular",
                "Regular",
                "40-120 bpm",
                "Absent or dissociated",
                "Not applicable",
                "Wide (> 0.12 s)",
            ],
            None,
            Rhythm::Regular(RegularPolicy::ventricular(80.0, VENTRICULAR_QRS, VENTRICULAR_T)),
        ),
        entry(
            "vfib",
            "Ventricular Fibrillation",
            V,
            "Chaotic ventricular electrical activity with no identifiable QRS. Cardiac arrest.",
            [
                "Chaotic",
                "Chaotic",
                "> 300/min",
                "Absent",
                "Not measurable",
                "Absent (fibrillatory waves)",
            ],
            Some("Indeterminate"),
            Rhythm::VentricularFibrillation(ChaosPolicy {
                step: 0.02,
                spread: 0.9,
                ceiling: 1.2,
                rebound: -0.7,
            }),
        ),
        entry(
            "asystole",
            "Asystole",
            V,
            "Absence of electrical activity: flat line.",
            ["Absent", "Absent", "0 bpm", "Absent", "Not applicable", "Absent"],
            Some("Not applicable"),
            Rhythm::Asystole(BaselinePolicy {
                step: 0.02,
                span: 0.02,
            }),
        ),
        entry(
            "v_paced",
            "Ventricular Paced Rhythm (VVI)",
            V,
            "Ventricular pacing: a pacemaker spike followed by a wide QRS.",
            [
                "Regular",
                "Regular",
                "Programmed (e.g. 70 bpm)",
                "Absent or dissociated",
                "Not applicable",
                "Wide, preceded by a spike",
            ],
            Some("Extreme (left superior)"),
            Rhythm::Paced(PacedPolicy {
                bpm: 70.0,
                spike_amplitude: -0.5,
                spike_width: 0.01,
                capture_delay: 0.02,
                qrs: PACED_QRS,
                t: PACED_T,
            }),
        ),
        entry(
            "rbbb",
            "Right Bundle Branch Block",
            V,
            "Block in the right bundle branch: wide QRS, rSR' pattern in V1 (rabbit ears) and a \
             broad slurred S in the lateral leads.",
            [
                "Regular",
                "Regular",
                "Variable",
                "Normal",
                "0.12-0.20 s",
                "> 0.12 s, rSR' in V1, broad S in V6",
            ],
            Some("Normal or right deviation"),
            Rhythm::Regular(
                RegularPolicy::sinus(75.0)
                    .with_complex(RBBB_QRS, RBBB_T)
                    .with_morphology(Morphology::Rbbb),
            ),
        ),
        entry(
            "lbbb",
            "Left Bundle Branch Block",
            V,
            "Conduction block in the left bundle branch causing abnormal ventricular \
             depolarization: wide QRS with a deep S in V1 and a broad notched R in V6.",
            [
                "Regular",
                "Regular",
                "Variable",
                "Normal",
                "0.12-0.20 s",
                "> 0.12 s, dominant S in V1, broad R in V6",
            ],
            Some("Often left deviation"),
            Rhythm::Regular(
                RegularPolicy::sinus(75.0)
                    .with_complex(LBBB_QRS, LBBB_T)
                    .with_morphology(Morphology::Lbbb),
            ),
        ),
    ]
}
