use crate::{
    lead::Lead,
    metrics::summary::{rr_stats, RRStats},
    signal::{Dataset, RRSeries, TimeSeries},
};
use serde::{Deserialize, Serialize};

/// Configurable parameters for the QRS-feature detector.
#[derive(Debug, Clone, Copy)]
pub struct QrsDetectorConfig {
    /// Sampling rate the polyline is resampled to before detection (Hz).
    pub fs: f64,
    /// Absolute amplitude below which a sample counts as isoelectric.
    pub quiet_level: f64,
    /// Minimum absolute excursion a complex must reach.
    pub min_amplitude: f64,
    /// Isoelectric stretch required before an onset (seconds).
    pub baseline_s: f64,
    /// Time from onset within which `min_amplitude` must be reached (seconds).
    pub rise_s: f64,
    /// Longest complex accepted, onset to settled baseline (seconds).
    pub max_width_s: f64,
    /// Isoelectric stretch required after the complex (seconds).
    pub settle_s: f64,
}

impl Default for QrsDetectorConfig {
    fn default() -> Self {
        Self {
            fs: 250.0,
            quiet_level: 0.05,
            min_amplitude: 0.5,
            baseline_s: 0.080,
            rise_s: 0.200,
            max_width_s: 0.250,
            settle_s: 0.040,
        }
    }
}

/// Detected complexes on one lead plus the derived R-R statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrsDetection {
    pub fs: f64,
    pub sample_count: usize,
    /// Sample index of each complex onset.
    pub onsets: Vec<usize>,
    /// Onset times in seconds.
    pub onset_times: Vec<f64>,
    pub rr: RRSeries,
    pub stats: RRStats,
}

impl QrsDetection {
    pub fn from_onsets(ts: &TimeSeries, onsets: Vec<usize>) -> Self {
        let onset_times: Vec<f64> = onsets.iter().map(|&i| ts.time_of(i)).collect();
        let rr = RRSeries::from_onsets(&onset_times);
        let stats = rr_stats(&rr);
        Self {
            fs: ts.fs,
            sample_count: ts.len(),
            onsets,
            onset_times,
            rr,
            stats,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.onsets.is_empty()
    }
}

/// Finds QRS-shaped features: an excursion that leaves a quiet baseline,
/// reaches `min_amplitude` and settles back to baseline within
/// `max_width_s`. Returned indices are the first non-quiet sample of each
/// feature.
pub fn detect_qrs_features(ts: &TimeSeries, cfg: &QrsDetectorConfig) -> Vec<usize> {
    let data = &ts.data;
    if data.is_empty() || ts.fs <= 0.0 {
        return Vec::new();
    }

    let baseline = samples(cfg.baseline_s, ts.fs).max(1);
    let settle = samples(cfg.settle_s, ts.fs).max(1);
    let mut onsets = Vec::new();
    let mut quiet_run = 0usize;
    let mut i = 0usize;
    while i < data.len() {
        if data[i].abs() < cfg.quiet_level {
            quiet_run += 1;
            i += 1;
            continue;
        }
        if quiet_run >= baseline {
            if let Some(end) = feature_end(data, i, ts.fs, cfg) {
                onsets.push(i);
                i = end;
                quiet_run = settle;
                continue;
            }
        }
        quiet_run = 0;
        i += 1;
    }
    onsets
}

/// Resamples one lead of a generated dataset and runs the detector on it.
pub fn detect_lead(data: &Dataset, lead: Lead, cfg: &QrsDetectorConfig) -> QrsDetection {
    let ts = data.resample(lead, cfg.fs);
    let onsets = detect_qrs_features(&ts, cfg);
    QrsDetection::from_onsets(&ts, onsets)
}

fn samples(seconds: f64, fs: f64) -> usize {
    (seconds * fs).round().max(0.0) as usize
}

/// Index just past the settled baseline following a complex that starts at
/// `onset`, or `None` if the excursion is too small or too long.
fn feature_end(data: &[f64], onset: usize, fs: f64, cfg: &QrsDetectorConfig) -> Option<usize> {
    let rise_end = (onset + samples(cfg.rise_s, fs)).min(data.len());
    let peak = (onset..rise_end).find(|&j| data[j].abs() >= cfg.min_amplitude)?;
    let limit = (onset + samples(cfg.max_width_s, fs)).min(data.len());
    let settle = samples(cfg.settle_s, fs).max(1);
    let mut run = 0usize;
    for j in peak..limit {
        if data[j].abs() < cfg.quiet_level {
            run += 1;
            if run >= settle {
                return Some(j + 1);
            }
        } else {
            run = 0;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(fs: f64, seconds: f64, f: impl Fn(f64) -> f64) -> TimeSeries {
        let n = (seconds * fs) as usize;
        TimeSeries {
            fs,
            data: (0..n).map(|i| f(i as f64 / fs)).collect(),
        }
    }

    fn spike_train(t: f64) -> f64 {
        let phase = t % 1.0;
        if (0.5..0.55).contains(&phase) {
            1.0
        } else {
            0.0
        }
    }

    #[test]
    fn detects_isolated_complexes() {
        let ts = series(250.0, 5.0, spike_train);
        let onsets = detect_qrs_features(&ts, &QrsDetectorConfig::default());
        assert_eq!(onsets.len(), 5);
        let detection = QrsDetection::from_onsets(&ts, onsets);
        assert_eq!(detection.rr.rr.len(), 4);
        assert!((detection.stats.mean_rr - 1.0).abs() < 0.01);
        assert!((detection.onset_times[0] - 0.5).abs() < 0.01);
    }

    #[test]
    fn ignores_small_and_unsettled_excursions() {
        let small = series(250.0, 3.0, |t| 0.3 * spike_train(t));
        assert!(detect_qrs_features(&small, &QrsDetectorConfig::default())
            .is_empty());

        let plateau = series(250.0, 3.0, |t| if t > 1.0 { 1.0 } else { 0.0 });
        assert!(detect_qrs_features(&plateau, &QrsDetectorConfig::default())
            .is_empty());
    }

    #[test]
    fn requires_quiet_baseline_before_onset() {
        let noisy = series(250.0, 3.0, |t| {
            if spike_train(t) > 0.0 {
                1.0
            } else {
                0.1 * (t * 200.0).sin().signum()
            }
        });
        assert!(detect_qrs_features(&noisy, &QrsDetectorConfig::default())
            .is_empty());
    }
}
