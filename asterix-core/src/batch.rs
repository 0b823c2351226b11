//! One input batch: decode lines, collect tracks, split by classification.
//!
//! Per-message failures are counted and logged here and never abort the
//! batch. The ceiling filter is applied when the batch finishes, before
//! classification.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::decode::Decoder;
use crate::report::{DecodedReport, RawMessage};
use crate::tracker::{Track, TrackAggregator, TrackClass};
use crate::types::AsterixError;

/// Default altitude ceiling for track selection, metres.
pub const DEFAULT_CEILING_M: f64 = 2000.0;

/// Counters for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub lines: u64,
    pub blank: u64,
    pub decoded_cat048: u64,
    pub decoded_cat034: u64,
    pub unsupported: u64,
    pub truncated: u64,
    pub malformed_timestamp: u64,
    pub malformed_line: u64,
    pub invalid_hex: u64,
    pub aggregated: u64,
    pub not_aggregated: u64,
    pub dropped_by_ceiling: u64,
    pub landing: u64,
    pub departing: u64,
}

impl BatchStats {
    pub fn decoded(&self) -> u64 {
        self.decoded_cat048 + self.decoded_cat034
    }

    /// Messages dropped because of an error (unsupported categories excluded).
    pub fn failed(&self) -> u64 {
        self.truncated + self.malformed_timestamp + self.malformed_line + self.invalid_hex
    }

    fn record_error(&mut self, err: &AsterixError) {
        match err {
            AsterixError::TruncatedInput { .. } => self.truncated += 1,
            AsterixError::MalformedTimestamp(_) => self.malformed_timestamp += 1,
            AsterixError::InvalidHex(_) => self.invalid_hex += 1,
            AsterixError::UnsupportedCategory(_) => self.unsupported += 1,
            AsterixError::MalformedLine(_)
            | AsterixError::Io(_)
            | AsterixError::Config(_)
            | AsterixError::Export(_) => self.malformed_line += 1,
        }
    }
}

/// Result of a finished batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub landing: Vec<Track>,
    pub departing: Vec<Track>,
    pub stats: BatchStats,
}

/// True if the track ever comes down to `ceiling_m` or below.
/// A track without flight levels is never below the ceiling.
pub fn below_ceiling(track: &Track, ceiling_m: f64) -> bool {
    track.min_flight_level() <= ceiling_m
}

/// Batch state. Owns its aggregator; the decoder is shared.
pub struct Batch<'d> {
    decoder: &'d Decoder,
    aggregator: TrackAggregator,
    stats: BatchStats,
}

impl<'d> Batch<'d> {
    pub fn new(decoder: &'d Decoder) -> Self {
        Batch {
            decoder,
            aggregator: TrackAggregator::new(),
            stats: BatchStats::default(),
        }
    }

    /// Decode one input line. Blank lines and `#` comments are skipped;
    /// failures are counted and yield `None`.
    pub fn decode_line(&mut self, line: &str) -> Option<DecodedReport> {
        self.stats.lines += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            self.stats.blank += 1;
            return None;
        }

        let result = RawMessage::parse(trimmed).and_then(|raw| self.decoder.decode(&raw));
        match result {
            Ok(report) => {
                match report.category() {
                    34 => self.stats.decoded_cat034 += 1,
                    _ => self.stats.decoded_cat048 += 1,
                }
                Some(report)
            }
            Err(e) => {
                debug!(line = self.stats.lines, error = %e, "skipping message");
                self.stats.record_error(&e);
                None
            }
        }
    }

    /// Count a line the input could not deliver (I/O error, invalid UTF-8).
    pub fn skip_unreadable(&mut self, err: std::io::Error) {
        self.stats.lines += 1;
        let err = AsterixError::from(err);
        debug!(line = self.stats.lines, error = %err, "skipping unreadable line");
        self.stats.record_error(&err);
    }

    /// Offer a report to the track aggregator.
    pub fn aggregate(&mut self, report: DecodedReport) -> bool {
        let accepted = self.aggregator.add(report);
        if accepted {
            self.stats.aggregated += 1;
        } else {
            self.stats.not_aggregated += 1;
        }
        accepted
    }

    /// Decode and aggregate in one step. Returns the report when it was
    /// decoded but not aggregated (CAT034, or CAT048 without identity).
    pub fn push_line(&mut self, line: &str) -> Option<DecodedReport> {
        let report = self.decode_line(line)?;
        if report.track_key().is_some() {
            self.aggregate(report);
            None
        } else {
            self.stats.not_aggregated += 1;
            Some(report)
        }
    }

    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }

    pub fn aggregator(&self) -> &TrackAggregator {
        &self.aggregator
    }

    /// Drop tracks above `ceiling_m`, sort the rest by time and classify them.
    pub fn finish(self, ceiling_m: f64) -> BatchOutcome {
        let Batch {
            aggregator,
            mut stats,
            ..
        } = self;

        let mut landing = Vec::new();
        let mut departing = Vec::new();
        for mut track in aggregator.into_tracks() {
            if !below_ceiling(&track, ceiling_m) {
                stats.dropped_by_ceiling += 1;
                continue;
            }
            track.sort_by_time();
            match track.classify() {
                TrackClass::Landing => landing.push(track),
                TrackClass::Departing => departing.push(track),
            }
        }
        stats.landing = landing.len() as u64;
        stats.departing = departing.len() as u64;

        if stats.failed() > 0 {
            warn!(
                failed = stats.failed(),
                truncated = stats.truncated,
                malformed_timestamp = stats.malformed_timestamp,
                malformed_line = stats.malformed_line,
                invalid_hex = stats.invalid_hex,
                "batch dropped malformed messages"
            );
        }
        info!(
            lines = stats.lines,
            decoded = stats.decoded(),
            unsupported = stats.unsupported,
            landing = stats.landing,
            departing = stats.departing,
            dropped_by_ceiling = stats.dropped_by_ceiling,
            "batch complete"
        );

        BatchOutcome {
            landing,
            departing,
            stats,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
