//! Input records and decoded report types.
//!
//! A recording line is `<timestamp> <hex payload>`. The timestamp token is
//! `<date digits>:<seconds since midnight>`, where the date digits are the
//! year followed by two month digits and two day digits
//! (`20200801:45296.250000`).
//!
//! Every decoded item is an `Option`: absent on the wire means `None`, never
//! zero.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::coord::Coordinate;
use crate::header::MessageHeader;
use crate::types::{hex_decode, AsterixError, Result};

const SECONDS_PER_DAY: u64 = 86_400;

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// One recorded message: reception time plus undecoded payload octets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub recv_time: NaiveDateTime,
    pub payload: Vec<u8>,
}

impl RawMessage {
    /// Parse a `<timestamp> <hex>` line. Extra tokens are ignored.
    pub fn parse(line: &str) -> Result<Self> {
        let mut tokens = line.split_whitespace();
        let (Some(stamp), Some(hex)) = (tokens.next(), tokens.next()) else {
            return Err(AsterixError::MalformedLine(line.trim().to_string()));
        };
        let recv_time = parse_timestamp(stamp)?;
        let payload = hex_decode(hex).ok_or_else(|| AsterixError::InvalidHex(hex.to_string()))?;
        Ok(RawMessage { recv_time, payload })
    }
}

/// Parse `<YYYY..MMDD>:<seconds>[.<fraction>]` into a date-time.
///
/// Hours wrap modulo 24 on the same date; the fraction is truncated to
/// microseconds.
pub fn parse_timestamp(token: &str) -> Result<NaiveDateTime> {
    let malformed = || AsterixError::MalformedTimestamp(token.to_string());

    let (date, secs) = token.split_once(':').ok_or_else(malformed)?;
    if date.len() < 5 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let split = date.len() - 4;
    let year: i32 = date[..split].parse().map_err(|_| malformed())?;
    let month: u32 = date[split..split + 2].parse().map_err(|_| malformed())?;
    let day: u32 = date[split + 2..].parse().map_err(|_| malformed())?;
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(malformed)?;

    let (whole, fraction) = match secs.split_once('.') {
        Some((w, f)) => (w, f),
        None => (secs, ""),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(whole) || !(fraction.is_empty() || digits(fraction)) {
        return Err(malformed());
    }
    let whole: u64 = whole.parse().map_err(|_| malformed())?;
    let micros = fraction
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(6)
        .fold(0u32, |acc, b| acc * 10 + (b - b'0') as u32);

    let time = time_from_seconds(whole % SECONDS_PER_DAY, micros).ok_or_else(malformed)?;
    Ok(date.and_time(time))
}

fn time_from_seconds(secs: u64, micros: u32) -> Option<NaiveTime> {
    let h = (secs / 3600) as u32;
    let m = (secs % 3600 / 60) as u32;
    let s = (secs % 60) as u32;
    NaiveTime::from_hms_micro_opt(h, m, s, micros)
}

/// Convert a 1/128 s tick count since midnight to a time of day (mod 24 h).
pub fn time_of_day(ticks: u32) -> NaiveTime {
    let micros_total = ticks as u64 * 1_000_000 / 128;
    let secs = (micros_total / 1_000_000) % SECONDS_PER_DAY;
    let micros = (micros_total % 1_000_000) as u32;
    // secs < 86400 and micros < 10^6 always produce a valid time
    time_from_seconds(secs, micros).unwrap_or(NaiveTime::MIN)
}

// ---------------------------------------------------------------------------
// Decoded reports
// ---------------------------------------------------------------------------

/// CAT048 monoradar target report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cat048Report {
    pub sac: Option<u8>,
    pub sic: Option<u8>,
    pub time_of_day: Option<NaiveTime>,
    pub slant_range_m: Option<f64>,
    pub azimuth_deg: Option<f64>,
    pub flight_level_m: Option<f64>,
    pub aircraft_address: Option<u32>,
    pub flight_id: Option<String>,
    pub track_number: Option<u16>,
    pub position_x_m: Option<f64>,
    pub position_y_m: Option<f64>,
    pub ground_speed_ms: Option<f64>,
    pub heading_deg: Option<f64>,
    pub height_3d_m: Option<f64>,
    /// Derived from slant range + azimuth; absent unless both are present.
    pub coordinate: Option<Coordinate>,
}

/// CAT034 monoradar service message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cat034Report {
    pub sac: Option<u8>,
    pub sic: Option<u8>,
    pub message_type: Option<u8>,
    pub time_of_day: Option<NaiveTime>,
    pub sector_number: Option<u8>,
    pub antenna_period_s: Option<f64>,
}

/// Category-specific part of a decoded message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ReportBody {
    Cat034(Cat034Report),
    Cat048(Cat048Report),
}

/// One fully decoded message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedReport {
    pub recv_time: NaiveDateTime,
    pub header: MessageHeader,
    pub body: ReportBody,
}

impl DecodedReport {
    pub fn category(&self) -> u8 {
        self.header.category
    }

    pub fn as_cat048(&self) -> Option<&Cat048Report> {
        match &self.body {
            ReportBody::Cat048(r) => Some(r),
            ReportBody::Cat034(_) => None,
        }
    }

    pub fn as_cat034(&self) -> Option<&Cat034Report> {
        match &self.body {
            ReportBody::Cat034(r) => Some(r),
            ReportBody::Cat048(_) => None,
        }
    }

    pub fn time_of_day(&self) -> Option<NaiveTime> {
        match &self.body {
            ReportBody::Cat034(r) => r.time_of_day,
            ReportBody::Cat048(r) => r.time_of_day,
        }
    }

    pub fn flight_level_m(&self) -> Option<f64> {
        self.as_cat048().and_then(|r| r.flight_level_m)
    }

    /// `(aircraft address, flight identification)` when both were decoded.
    pub fn track_key(&self) -> Option<(u32, &str)> {
        let r = self.as_cat048()?;
        Some((r.aircraft_address?, r.flight_id.as_deref()?))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
