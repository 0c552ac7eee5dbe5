use anyhow::{ensure, Context, Result};
use csv::WriterBuilder;
use ecgsim_lib::{summarize, Catalog, Dataset, Lead, RhythmSummary};
use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// A reproducible generation request, usually read from a TOML file.
#[derive(Debug, Deserialize, Clone)]
pub struct SessionSpec {
    pub name: String,
    pub rhythm: String,
    pub duration_s: f64,
    #[serde(default)]
    pub randomization: Option<RandomizationSpec>,
    #[serde(default)]
    pub variability: Option<VariabilitySpec>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RandomizationSpec {
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VariabilitySpec {
    /// `false` disables sinus beat-to-beat jitter.
    #[serde(default)]
    pub jitter: Option<bool>,
}

impl SessionSpec {
    pub fn seed(&self) -> Option<u64> {
        self.randomization.as_ref().and_then(|r| r.seed)
    }

    pub fn jitter(&self) -> bool {
        self.variability
            .as_ref()
            .and_then(|v| v.jitter)
            .unwrap_or(true)
    }
}

/// Points emitted on one lead.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LeadPoints {
    pub lead: Lead,
    pub points: usize,
}

#[derive(Debug, Serialize, Clone)]
pub struct SessionManifest {
    pub name: String,
    pub rhythm: String,
    pub rhythm_name: String,
    pub duration_s: f64,
    pub seed: Option<u64>,
    pub randomized: bool,
    pub jitter: bool,
    pub total_beats: usize,
    pub leads: Vec<LeadPoints>,
    pub summary: RhythmSummary,
    pub start_time_unix: f64,
}

pub struct SessionBundle {
    pub dataset: Dataset,
    pub manifest: SessionManifest,
}

pub fn read_session(path: &Path) -> Result<SessionSpec> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read session {}", path.display()))?;
    let spec: SessionSpec =
        toml::from_str(&contents).with_context(|| format!("parsing session {}", path.display()))?;
    Ok(spec)
}

/// Generates the dataset a session describes. A missing seed means seed 0.
pub fn run_session(spec: &SessionSpec) -> Result<SessionBundle> {
    ensure!(
        spec.duration_s.is_finite(),
        "session {} has a non-finite duration",
        spec.name
    );
    let definition = Catalog::standard()
        .get(&spec.rhythm)
        .with_context(|| format!("session {}", spec.name))?;
    let rhythm = if spec.jitter() {
        definition.rhythm.clone()
    } else {
        definition.rhythm.without_jitter()
    };

    let seed = spec.seed().unwrap_or(0);
    let mut rng = StdRng::seed_from_u64(seed);
    debug!("session {}: rhythm {} seed {}", spec.name, spec.rhythm, seed);
    let dataset = rhythm.generate(spec.duration_s, &mut rng);

    let start_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|dur| dur.as_secs_f64())
        .unwrap_or(0.0);
    let manifest = SessionManifest {
        name: spec.name.clone(),
        rhythm: definition.id.to_string(),
        rhythm_name: definition.name.to_string(),
        duration_s: dataset.duration,
        seed: spec.seed(),
        randomized: rhythm.is_randomized(),
        jitter: spec.jitter(),
        total_beats: dataset.beats.len(),
        leads: dataset
            .leads
            .iter()
            .map(|(lead, points)| LeadPoints {
                lead,
                points: points.len(),
            })
            .collect(),
        summary: summarize(&dataset),
        start_time_unix: start_time,
    };
    info!(
        "session {} generated {} beats over {:.1}s",
        manifest.name, manifest.total_beats, manifest.duration_s
    );
    Ok(SessionBundle { dataset, manifest })
}

/// Writes the selected leads (all 12 when `leads` is empty) as tab-separated
/// `lead, time, value` rows.
pub fn write_points_tsv<W: Write>(writer: W, dataset: &Dataset, leads: &[Lead]) -> Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    writer.write_record(["lead", "time", "value"])?;
    let selected: &[Lead] = if leads.is_empty() { &Lead::ALL } else { leads };
    for &lead in selected {
        for point in dataset.lead(lead) {
            writer.write_record(&[
                lead.name().to_string(),
                point.time.to_string(),
                point.value.to_string(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn write_dataset_json<W: Write>(writer: W, dataset: &Dataset) -> Result<()> {
    serde_json::to_writer(writer, dataset)?;
    Ok(())
}

pub fn write_manifest_json<W: Write>(writer: W, manifest: &SessionManifest) -> Result<()> {
    serde_json::to_writer_pretty(writer, manifest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn session(rhythm: &str, seed: Option<u64>, jitter: Option<bool>) -> SessionSpec {
        SessionSpec {
            name: "test".into(),
            rhythm: rhythm.into(),
            duration_s: 4.0,
            randomization: Some(RandomizationSpec { seed }),
            variability: Some(VariabilitySpec { jitter }),
        }
    }

    #[test]
    fn parses_session_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.toml");
        fs::write(
            &path,
            "name = \"demo\"\nrhythm = \"vtach\"\nduration_s = 6.0\n\n[randomization]\nseed = 7\n",
        )
        .unwrap();
        let spec = read_session(&path).unwrap();
        assert_eq!(spec.rhythm, "vtach");
        assert_eq!(spec.seed(), Some(7));
        assert!(spec.jitter());
    }

    #[test]
    fn missing_session_file_has_context() {
        let err = read_session(Path::new("/nonexistent/session.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read session"));
    }

    #[test]
    fn jitter_off_reproduces_the_reference_beat_count() {
        let bundle = run_session(&session("nsr", None, Some(false))).unwrap();
        assert_eq!(bundle.manifest.total_beats, 5);
        assert!(!bundle.manifest.randomized);
        assert_eq!(bundle.manifest.leads.len(), 12);
        assert_eq!(bundle.manifest.seed, None);
        assert!((bundle.manifest.summary.ventricular_rate_bpm - 75.0).abs() < 1e-6);
    }

    #[test]
    fn same_seed_same_dataset() {
        let a = run_session(&session("afib_high", Some(3), None)).unwrap();
        let b = run_session(&session("afib_high", Some(3), None)).unwrap();
        assert_eq!(a.dataset, b.dataset);
        assert!(a.manifest.randomized);
    }

    #[test]
    fn unknown_rhythm_is_reported() {
        let err = run_session(&session("sinus_arrest", None, None))
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("unknown rhythm `sinus_arrest`"));
    }

    #[test]
    fn writes_selected_leads_as_tsv() {
        let bundle = run_session(&session("v_paced", None, None)).unwrap();
        let mut out = Vec::new();
        write_points_tsv(&mut out, &bundle.dataset, &[Lead::V1, Lead::AVR]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("lead\ttime\tvalue"));
        let rows: Vec<Vec<&str>> = lines.map(|l| l.split('\t').collect()).collect();
        let v1 = bundle.dataset.lead(Lead::V1);
        let avr = bundle.dataset.lead(Lead::AVR).len();
        assert_eq!(rows.len(), v1.len() + avr);
        assert_eq!(rows[0][0], "V1");
        assert_eq!(rows[v1.len()][0], "aVR");
        assert_eq!(rows[0][1].parse::<f64>().unwrap(), v1[0].time);
    }

    #[test]
    fn manifest_json_describes_the_run() {
        let bundle = run_session(&session("avb_3rd_degree", Some(1), None)).unwrap();
        let mut out = Vec::new();
        write_manifest_json(&mut out, &bundle.manifest).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["rhythm"], "avb_3rd_degree");
        assert_eq!(value["seed"], 1);
        assert_eq!(value["leads"][0]["lead"], "DI");
        assert_eq!(value["leads"].as_array().unwrap().len(), 12);
        assert_eq!(value["total_beats"], bundle.manifest.total_beats);
        assert!(value["summary"]["rr"].is_object());
    }

    #[test]
    fn dataset_json_is_keyed_by_lead_name() {
        let bundle = run_session(&session("lbbb", None, None)).unwrap();
        let mut out = Vec::new();
        write_dataset_json(&mut out, &bundle.dataset).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        for name in ["DI", "aVR", "aVL", "aVF", "V6"] {
            assert!(value["leads"][name].is_array(), "{name}");
        }
        assert!(value["beats"].as_array().unwrap().len() >= 5);
    }
}
