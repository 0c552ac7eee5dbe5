use crate::beat::BeatKind;
use crate::signal::{Dataset, RRSeries};
use serde::{Deserialize, Serialize};

/// Time-domain statistics of an R-R series (seconds unless noted).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RRStats {
    pub n: usize,
    pub mean_rr: f64,
    pub sdnn: f64,
    pub rmssd: f64,
    /// Fraction of successive differences larger than 50 ms.
    pub pnn50: f64,
}

pub fn rr_stats(rr: &RRSeries) -> RRStats {
    let n = rr.rr.len();
    let mean_rr = if n > 0 {
        rr.rr.iter().sum::<f64>() / n as f64
    } else {
        0.0
    };
    let (sdnn, rmssd, pnn50) = if n > 1 {
        let denom = n as f64 - 1.0;
        let sdnn = (rr.rr.iter().map(|x| (x - mean_rr).powi(2)).sum::<f64>() / denom).sqrt();
        let diffs: Vec<f64> = rr.rr.windows(2).map(|w| w[1] - w[0]).collect();
        let rmssd = (diffs.iter().map(|d| d * d).sum::<f64>() / denom).sqrt();
        let over = diffs.iter().filter(|d| d.abs() > 0.050).count();
        (sdnn, rmssd, over as f64 / denom)
    } else {
        (0.0, 0.0, 0.0)
    };

    RRStats {
        n,
        mean_rr,
        sdnn,
        rmssd,
        pnn50,
    }
}

/// Minimum, maximum and mean of the PR intervals of conducted beats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Rhythm-level description of a generated dataset, computed from its beat
/// annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmSummary {
    pub duration: f64,
    pub beats: usize,
    /// Beats where a P wave was followed by its own QRS.
    pub conducted: usize,
    pub non_conducted: usize,
    pub ventricular_beats: usize,
    /// Zero when fewer than two ventricular complexes were generated.
    pub ventricular_rate_bpm: f64,
    pub atrial_rate_bpm: f64,
    pub rr: RRStats,
    pub pr: Option<PrStats>,
}

pub fn summarize(data: &Dataset) -> RhythmSummary {
    let ventricular = data.qrs_onsets();
    let atrial: Vec<f64> = data.beats.iter().filter_map(|b| b.p_onset).collect();
    let rr = rr_stats(&RRSeries::from_onsets(&ventricular));
    let pp = rr_stats(&RRSeries::from_onsets(&atrial));
    let prs: Vec<f64> = data.beats.iter().filter_map(|b| b.pr()).collect();

    RhythmSummary {
        duration: data.duration,
        beats: data.beats.len(),
        conducted: prs.len(),
        non_conducted: data
            .beats
            .iter()
            .filter(|b| b.kind == BeatKind::NonConducted)
            .count(),
        ventricular_beats: ventricular.len(),
        ventricular_rate_bpm: rate(&rr),
        atrial_rate_bpm: rate(&pp),
        rr,
        pr: pr_stats(&prs),
    }
}

fn rate(stats: &RRStats) -> f64 {
    if stats.n > 0 && stats.mean_rr > 0.0 {
        60.0 / stats.mean_rr
    } else {
        0.0
    }
}

fn pr_stats(prs: &[f64]) -> Option<PrStats> {
    if prs.is_empty() {
        return None;
    }
    let min = prs.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = prs.iter().sum::<f64>() / prs.len() as f64;
    Some(PrStats { min, max, mean })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beat::BeatAnnotation;
    use crate::signal::DatasetBuilder;

    #[test]
    fn stats_of_constant_series() {
        let stats = rr_stats(&RRSeries {
            rr: vec![0.8, 0.8, 0.8],
        });
        assert_eq!(stats.n, 3);
        assert!((stats.mean_rr - 0.8).abs() < 1e-12);
        assert!(stats.sdnn.abs() < 1e-12);
        assert_eq!(stats.pnn50, 0.0);
    }

    #[test]
    fn stats_of_alternating_series() {
        let stats = rr_stats(&RRSeries {
            rr: vec![0.6, 1.0, 0.6, 1.0],
        });
        assert!((stats.mean_rr - 0.8).abs() < 1e-12);
        assert!((stats.rmssd - 0.4).abs() < 1e-12);
        assert_eq!(stats.pnn50, 1.0);
    }

    #[test]
    fn summary_counts_blocked_beats() {
        let mut builder = DatasetBuilder::new(4.0);
        for k in 0..4 {
            let p = f64::from(k);
            if k == 2 {
                builder.annotate(BeatAnnotation::atrial(p));
            } else {
                let mut ann = BeatAnnotation::atrial(p);
                ann.kind = BeatKind::Conducted;
                ann.qrs_onset = Some(p + 0.2);
                builder.annotate(ann);
            }
        }
        let summary = summarize(&builder.finish());
        assert_eq!(summary.beats, 4);
        assert_eq!(summary.conducted, 3);
        assert_eq!(summary.non_conducted, 1);
        assert_eq!(summary.ventricular_beats, 3);
        assert!((summary.atrial_rate_bpm - 60.0).abs() < 1e-9);
        assert!((summary.ventricular_rate_bpm - 40.0).abs() < 1e-9);
        let pr = summary.pr.unwrap();
        assert!((pr.min - 0.2).abs() < 1e-9 && (pr.max - 0.2).abs() < 1e-9);
    }

    #[test]
    fn empty_dataset_has_zero_rates() {
        let summary = summarize(&Dataset::empty(0.0));
        assert_eq!(summary.ventricular_rate_bpm, 0.0);
        assert!(summary.pr.is_none());
    }
}
