use crate::beat::{BeatAnnotation, BeatTrace};
use crate::lead::{Lead, LeadMap};
use serde::{Deserialize, Serialize};

/// One vertex of a lead's polyline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Seconds from the start of the trace.
    pub time: f64,
    /// Normalized amplitude, nominally within [-1.5, 1.5].
    pub value: f64,
}

impl Point {
    pub const fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }
}

/// One lead resampled onto a uniform grid, as the QRS detector sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    /// Sampling rate (Hz).
    pub fs: f64,
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Seconds from the start of the trace to sample `index`.
    pub fn time_of(&self, index: usize) -> f64 {
        index as f64 / self.fs
    }
}

/// Intervals between consecutive onsets (seconds). Used for both R-R and
/// P-P series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr: Vec<f64>,
}

impl RRSeries {
    pub fn from_onsets(onsets: &[f64]) -> Self {
        Self {
            rr: onsets.windows(2).map(|w| w[1] - w[0]).collect(),
        }
    }
}

/// Generated 12-lead trace: one time-sorted polyline per lead plus the beat
/// annotations the generator produced it from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub duration: f64,
    pub leads: LeadMap<Vec<Point>>,
    pub beats: Vec<BeatAnnotation>,
}

impl Dataset {
    /// All 12 leads present, each with no points.
    pub fn empty(duration: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            leads: LeadMap::default(),
            beats: Vec::new(),
        }
    }

    pub fn lead(&self, lead: Lead) -> &[Point] {
        &self.leads[lead]
    }

    pub fn point_count(&self) -> usize {
        self.leads.values().map(Vec::len).sum()
    }

    /// QRS onsets of every beat that reached the ventricles, in time order.
    pub fn qrs_onsets(&self) -> Vec<f64> {
        self.beats.iter().filter_map(|b| b.qrs_onset).collect()
    }

    /// Linear interpolation of one lead onto a uniform grid covering
    /// `[0, duration)`. Gaps between knots are bridged by the polyline, so an
    /// isoelectric stretch with no knots resamples as a straight line.
    pub fn resample(&self, lead: Lead, fs: f64) -> TimeSeries {
        let points = self.lead(lead);
        let samples = if fs > 0.0 {
            (self.duration * fs).floor() as usize
        } else {
            0
        };
        let mut data = Vec::with_capacity(samples);
        for i in 0..samples {
            data.push(polyline_at(points, i as f64 / fs));
        }
        TimeSeries { fs, data }
    }
}

fn polyline_at(points: &[Point], t: f64) -> f64 {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return 0.0;
    };
    if t <= first.time {
        return first.value;
    }
    if t >= last.time {
        return last.value;
    }
    let upper = points.partition_point(|p| p.time <= t);
    let a = points[upper - 1];
    let b = points[upper];
    if b.time <= a.time {
        return b.value;
    }
    a.value + (b.value - a.value) * (t - a.time) / (b.time - a.time)
}

/// Accumulates out-of-order beat output and enforces the dataset
/// postconditions on [`DatasetBuilder::finish`]: every lead sorted by time
/// and clipped to `[0, duration)`.
#[derive(Debug)]
pub struct DatasetBuilder {
    duration: f64,
    leads: LeadMap<Vec<Point>>,
    beats: Vec<BeatAnnotation>,
}

impl DatasetBuilder {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            leads: LeadMap::default(),
            beats: Vec::new(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Appends P, QRS and T of a beat to every lead.
    pub fn push_trace(&mut self, trace: BeatTrace, annotation: BeatAnnotation) {
        let BeatTrace {
            atrial,
            ventricular,
        } = trace;
        self.append(atrial);
        self.append(ventricular);
        self.beats.push(annotation);
    }

    /// Appends only the atrial part of a beat (P wave without conduction).
    pub fn push_atrial(&mut self, trace: BeatTrace, annotation: BeatAnnotation) {
        self.append(trace.atrial);
        self.beats.push(annotation);
    }

    /// Appends per-lead points without an accompanying beat.
    pub fn append(&mut self, points: LeadMap<Vec<Point>>) {
        for ((_, dst), (_, src)) in self.leads.iter_mut().zip(points.iter()) {
            dst.extend_from_slice(src);
        }
    }

    pub fn push_point(&mut self, lead: Lead, point: Point) {
        self.leads[lead].push(point);
    }

    pub fn annotate(&mut self, annotation: BeatAnnotation) {
        self.beats.push(annotation);
    }

    pub fn lead(&self, lead: Lead) -> &[Point] {
        &self.leads[lead]
    }

    /// Drops points of one lead for which `keep` returns false.
    pub fn retain(&mut self, lead: Lead, keep: impl FnMut(&Point) -> bool) {
        self.leads[lead].retain(keep);
    }

    /// Merges everything collected so far into a time-ordered dataset.
    pub fn finish(self) -> Dataset {
        let duration = self.duration;
        let mut leads = self.leads;
        for (_, points) in leads.iter_mut() {
            points.retain(|p| p.time >= 0.0 && p.time < duration);
            points.sort_by(|a, b| a.time.total_cmp(&b.time));
        }
        let mut beats = self.beats;
        beats.retain(|b| b.onset() < duration);
        beats.sort_by(|a, b| a.onset().total_cmp(&b.onset()));
        Dataset {
            duration,
            leads,
            beats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beat::BeatKind;

    #[test]
    fn finish_sorts_and_clips_every_lead() {
        let mut builder = DatasetBuilder::new(1.0);
        builder.push_point(Lead::DI, Point::new(0.5, 1.0));
        builder.push_point(Lead::DI, Point::new(0.2, 0.5));
        builder.push_point(Lead::DI, Point::new(1.0, 0.1));
        builder.push_point(Lead::DI, Point::new(-0.1, 0.1));
        builder.annotate(BeatAnnotation::ventricular(BeatKind::Ventricular, 0.4));
        builder.annotate(BeatAnnotation::ventricular(BeatKind::Ventricular, 0.1));
        let data = builder.finish();
        let times: Vec<f64> = data.lead(Lead::DI).iter().map(|p| p.time).collect();
        assert_eq!(times, vec![0.2, 0.5]);
        assert_eq!(data.qrs_onsets(), vec![0.1, 0.4]);
        assert!(data.lead(Lead::V6).is_empty());
    }

    #[test]
    fn resample_interpolates_the_polyline() {
        let mut builder = DatasetBuilder::new(1.0);
        builder.push_point(Lead::DII, Point::new(0.0, 0.0));
        builder.push_point(Lead::DII, Point::new(0.5, 1.0));
        builder.push_point(Lead::DII, Point::new(0.9, 0.0));
        let ts = builder.finish().resample(Lead::DII, 10.0);
        assert_eq!(ts.len(), 10);
        assert!((ts.data[2] - 0.4).abs() < 1e-9);
        assert!((ts.data[5] - 1.0).abs() < 1e-9);
        assert!((ts.data[7] - 0.5).abs() < 1e-9);
        assert_eq!(ts.data[9], 0.0);
    }

    #[test]
    fn json_nests_traces_under_lead_names() {
        let mut builder = DatasetBuilder::new(2.0);
        builder.push_point(Lead::AVF, Point::new(0.5, 0.25));
        builder.annotate(BeatAnnotation::ventricular(BeatKind::Ventricular, 0.4));
        let json = serde_json::to_value(builder.finish()).unwrap();
        let top = json.as_object().unwrap();
        let mut keys: Vec<&str> = top.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["beats", "duration", "leads"]);
        assert_eq!(json["duration"], 2.0);
        let leads = json["leads"].as_object().unwrap();
        assert_eq!(leads.len(), 12);
        for lead in Lead::ALL {
            assert!(leads.contains_key(lead.name()), "{lead}");
        }
        assert_eq!(json["leads"]["aVF"][0]["time"], 0.5);
        assert_eq!(json["leads"]["aVF"][0]["value"], 0.25);
        assert_eq!(json["beats"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn rr_from_onsets() {
        let rr = RRSeries::from_onsets(&[0.0, 0.8, 1.7]);
        assert_eq!(rr.rr.len(), 2);
        assert!((rr.rr[1] - 0.9).abs() < 1e-12);
    }
}
