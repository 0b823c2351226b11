//! Per-aircraft report aggregation and landing/departing classification.
//!
//! Pure logic, no I/O. A `TrackAggregator` lives for one batch (one input
//! file): reports are appended to the track of their
//! `(aircraft address, flight identification)` key in arrival order, and the
//! caller sorts and classifies once the batch is complete.
//!
//! Reports missing either half of the key are never aggregated.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveTime;
use serde::Serialize;

use crate::report::DecodedReport;
use crate::types::address_to_string;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackClass {
    Landing,
    Departing,
}

impl fmt::Display for TrackClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackClass::Landing => f.write_str("landing"),
            TrackClass::Departing => f.write_str("departing"),
        }
    }
}

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

/// All reports of one aircraft within a batch.
#[derive(Debug, Clone)]
pub struct Track {
    pub aircraft_address: u32,
    pub flight_id: String,
    pub reports: Vec<DecodedReport>,
}

impl Track {
    pub fn new(aircraft_address: u32, flight_id: impl Into<String>) -> Self {
        Track {
            aircraft_address,
            flight_id: flight_id.into(),
            reports: Vec::new(),
        }
    }

    pub fn push(&mut self, report: DecodedReport) {
        self.reports.push(report);
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Stable sort by decoded time of day, then reception time.
    /// Reports without a time of day sort first.
    pub fn sort_by_time(&mut self) {
        self.reports.sort_by(|a, b| {
            a.time_of_day()
                .cmp(&b.time_of_day())
                .then(a.recv_time.cmp(&b.recv_time))
        });
    }

    fn flight_levels(&self) -> impl Iterator<Item = f64> + '_ {
        self.reports.iter().filter_map(DecodedReport::flight_level_m)
    }

    /// Compare the last flight level seen against the first, in current report
    /// order. Falling means landing; level, rising, or no flight level at all
    /// means departing. Call `sort_by_time` first.
    pub fn classify(&self) -> TrackClass {
        let mut levels = self.flight_levels();
        let Some(start) = levels.next() else {
            return TrackClass::Departing;
        };
        let end = levels.last().unwrap_or(start);
        if end - start < 0.0 {
            TrackClass::Landing
        } else {
            TrackClass::Departing
        }
    }

    /// Lowest flight level in metres; `+∞` when no report has one.
    pub fn min_flight_level(&self) -> f64 {
        self.flight_levels().fold(f64::INFINITY, f64::min)
    }

    /// Highest flight level in metres; `-∞` when no report has one.
    pub fn max_flight_level(&self) -> f64 {
        self.flight_levels().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn first_time(&self) -> Option<NaiveTime> {
        self.reports.iter().find_map(DecodedReport::time_of_day)
    }

    pub fn last_time(&self) -> Option<NaiveTime> {
        self.reports.iter().rev().find_map(DecodedReport::time_of_day)
    }

    pub fn summary(&self) -> TrackSummary {
        let finite = |v: f64| v.is_finite().then_some(v);
        TrackSummary {
            icao: address_to_string(self.aircraft_address),
            flight_id: self.flight_id.clone(),
            reports: self.len(),
            first_time: self.first_time(),
            last_time: self.last_time(),
            min_flight_level_m: finite(self.min_flight_level()),
            max_flight_level_m: finite(self.max_flight_level()),
            class: self.classify(),
        }
    }
}

/// Display/serialization view of a track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSummary {
    pub icao: String,
    pub flight_id: String,
    pub reports: usize,
    pub first_time: Option<NaiveTime>,
    pub last_time: Option<NaiveTime>,
    pub min_flight_level_m: Option<f64>,
    pub max_flight_level_m: Option<f64>,
    pub class: TrackClass,
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Identity → track map for one batch. Tracks keep first-seen order.
#[derive(Debug, Default)]
pub struct TrackAggregator {
    tracks: Vec<Track>,
    index: HashMap<(u32, String), usize>,
}

impl TrackAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `report` to its track. Returns false (and drops the report)
    /// when it has no aircraft address or no flight identification.
    pub fn add(&mut self, report: DecodedReport) -> bool {
        let Some((address, flight_id)) = report.track_key() else {
            return false;
        };
        let key = (address, flight_id.to_string());
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.tracks.push(Track::new(address, key.1.clone()));
                self.index.insert(key, self.tracks.len() - 1);
                self.tracks.len() - 1
            }
        };
        self.tracks[idx].push(report);
        true
    }

    pub fn get(&self, aircraft_address: u32, flight_id: &str) -> Option<&Track> {
        let idx = self.index.get(&(aircraft_address, flight_id.to_string()))?;
        self.tracks.get(*idx)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::header::{Fspec, MessageHeader};
    use crate::report::{parse_timestamp, Cat034Report, Cat048Report, ReportBody};

    /// CAT048 report with the given identity, time of day (s) and flight level.
    pub(crate) fn report(
        address: Option<u32>,
        flight_id: Option<&str>,
        tod_secs: Option<u32>,
        flight_level_m: Option<f64>,
    ) -> DecodedReport {
        DecodedReport {
            recv_time: parse_timestamp("20200801:0").unwrap(),
            header: MessageHeader {
                link_address: 0,
                link_control: 3,
                category: 48,
                length: 0,
                fspec: Fspec::default(),
            },
            body: ReportBody::Cat048(Cat048Report {
                aircraft_address: address,
                flight_id: flight_id.map(String::from),
                time_of_day: tod_secs.and_then(|s| NaiveTime::from_num_seconds_from_midnight_opt(s, 0)),
                flight_level_m,
                ..Default::default()
            }),
        }
    }

    fn track_with_levels(levels: &[f64]) -> Track {
        let mut track = Track::new(0x780A3B, "CSN3101");
        for (i, fl) in levels.iter().enumerate() {
            track.push(report(Some(0x780A3B), Some("CSN3101"), Some(i as u32), Some(*fl)));
        }
        track
    }

    #[test]
    fn test_classify_landing() {
        assert_eq!(track_with_levels(&[500.0, 300.0, 100.0]).classify(), TrackClass::Landing);
    }

    #[test]
    fn test_classify_departing() {
        assert_eq!(track_with_levels(&[100.0, 300.0, 500.0]).classify(), TrackClass::Departing);
    }

    #[test]
    fn test_classify_level_is_departing() {
        assert_eq!(track_with_levels(&[300.0, 300.0]).classify(), TrackClass::Departing);
        assert_eq!(track_with_levels(&[300.0]).classify(), TrackClass::Departing);
    }

    #[test]
    fn test_classify_uses_only_endpoints() {
        // Dips in the middle do not matter
        assert_eq!(
            track_with_levels(&[500.0, 50.0, 50.0, 600.0]).classify(),
            TrackClass::Departing
        );
    }

    #[test]
    fn test_classify_skips_reports_without_level() {
        let mut track = track_with_levels(&[]);
        track.push(report(Some(1), Some("A"), Some(1), None));
        track.push(report(Some(1), Some("A"), Some(2), Some(900.0)));
        track.push(report(Some(1), Some("A"), Some(3), None));
        track.push(report(Some(1), Some("A"), Some(4), Some(400.0)));
        track.push(report(Some(1), Some("A"), Some(5), None));
        assert_eq!(track.classify(), TrackClass::Landing);
    }

    #[test]
    fn test_no_flight_level() {
        let mut track = Track::new(1, "A");
        track.push(report(Some(1), Some("A"), Some(1), None));
        assert_eq!(track.classify(), TrackClass::Departing);
        assert_eq!(track.min_flight_level(), f64::INFINITY);
        assert_eq!(track.max_flight_level(), f64::NEG_INFINITY);
        assert_eq!(track.summary().min_flight_level_m, None);
    }

    #[test]
    fn test_min_max_flight_level() {
        let track = track_with_levels(&[500.0, 2500.0, 300.0]);
        assert_eq!(track.min_flight_level(), 300.0);
        assert_eq!(track.max_flight_level(), 2500.0);
    }

    #[test]
    fn test_sort_by_time_is_stable() {
        let mut track = Track::new(1, "A");
        track.push(report(Some(1), Some("A"), Some(30), Some(100.0)));
        track.push(report(Some(1), Some("A"), Some(10), Some(900.0)));
        track.push(report(Some(1), Some("A"), None, Some(1.0)));
        track.push(report(Some(1), Some("A"), Some(10), Some(800.0)));
        track.sort_by_time();

        let levels: Vec<f64> = track.flight_levels().collect();
        assert_eq!(levels, vec![1.0, 900.0, 800.0, 100.0]);
        assert_eq!(track.classify(), TrackClass::Departing);
        assert_eq!(track.first_time(), NaiveTime::from_hms_opt(0, 0, 10));
        assert_eq!(track.last_time(), NaiveTime::from_hms_opt(0, 0, 30));
    }

    #[test]
    fn test_aggregator_groups_by_key() {
        let mut agg = TrackAggregator::new();
        assert!(agg.add(report(Some(1), Some("A"), Some(1), None)));
        assert!(agg.add(report(Some(2), Some("B"), Some(2), None)));
        assert!(agg.add(report(Some(1), Some("A"), Some(3), None)));
        // Same address, different flight id: separate track
        assert!(agg.add(report(Some(1), Some("C"), Some(4), None)));

        assert_eq!(agg.len(), 3);
        assert_eq!(agg.get(1, "A").unwrap().len(), 2);
        assert_eq!(agg.get(2, "B").unwrap().len(), 1);
        let order: Vec<&str> = agg.tracks().iter().map(|t| t.flight_id.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_aggregator_rejects_incomplete_identity() {
        let mut agg = TrackAggregator::new();
        assert!(!agg.add(report(None, Some("A"), Some(1), None)));
        assert!(!agg.add(report(Some(1), None, Some(1), None)));
        assert!(agg.is_empty());
    }

    #[test]
    fn test_aggregator_rejects_cat034() {
        let mut agg = TrackAggregator::new();
        let mut r = report(Some(1), Some("A"), None, None);
        r.body = ReportBody::Cat034(Cat034Report::default());
        assert!(!agg.add(r));
    }

    #[test]
    fn test_summary() {
        let summary = track_with_levels(&[500.0, 100.0]).summary();
        assert_eq!(summary.icao, "780A3B");
        assert_eq!(summary.reports, 2);
        assert_eq!(summary.class, TrackClass::Landing);
        assert_eq!(summary.min_flight_level_m, Some(100.0));
    }

    #[test]
    fn test_class_display() {
        assert_eq!(TrackClass::Landing.to_string(), "landing");
        assert_eq!(TrackClass::Departing.to_string(), "departing");
    }
}
