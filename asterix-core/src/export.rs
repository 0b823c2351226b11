//! Flattened records and the sink interface for tabular output.
//!
//! A decoded report is flattened to named fields; a sink receives a fixed
//! column list once, then one row per record with `None` wherever the record
//! lacks that column. Concrete sinks (CSV, SQLite, terminal) live in the CLI.

use std::fmt;

use chrono::{NaiveDateTime, NaiveTime};

use crate::report::{DecodedReport, ReportBody};
use crate::types::{address_to_string, Result};

// ---------------------------------------------------------------------------
// Column sets
// ---------------------------------------------------------------------------

/// CAT048 track exports (landing/departing files).
pub const CAT048_TRACK_COLUMNS: &[&str] = &[
    "cat",
    "sac",
    "sic",
    "time_of_day",
    "longitude",
    "latitude",
    "flight_level_m",
    "icao",
    "flight_id",
    "track_number",
    "ground_speed_ms",
    "heading_deg",
];

/// Every CAT048 field including the header.
pub const CAT048_COLUMNS: &[&str] = &[
    "recv_time",
    "hdlc_address",
    "hdlc_control",
    "cat",
    "len",
    "fspec",
    "sac",
    "sic",
    "time_of_day",
    "slant_range_m",
    "azimuth_deg",
    "flight_level_m",
    "icao",
    "flight_id",
    "track_number",
    "position_x_m",
    "position_y_m",
    "ground_speed_ms",
    "heading_deg",
    "height_3d_m",
    "longitude",
    "latitude",
];

pub const CAT034_COLUMNS: &[&str] = &[
    "recv_time",
    "hdlc_address",
    "hdlc_control",
    "cat",
    "len",
    "fspec",
    "sac",
    "sic",
    "time_of_day",
    "message_type",
    "sector_number",
    "antenna_period_s",
];

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// One typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Text(v) => f.write_str(v),
            FieldValue::Time(v) => write!(f, "{}", v.format("%H:%M:%S%.6f")),
            FieldValue::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.6f")),
        }
    }
}

impl From<u8> for FieldValue {
    fn from(v: u8) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<u16> for FieldValue {
    fn from(v: u16) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<NaiveTime> for FieldValue {
    fn from(v: NaiveTime) -> Self {
        FieldValue::Time(v)
    }
}

/// Named-field access for export.
pub trait Flatten {
    /// Value of `column`, or `None` when absent or unknown.
    fn field(&self, column: &str) -> Option<FieldValue>;
}

fn opt<T: Into<FieldValue>>(v: Option<T>) -> Option<FieldValue> {
    v.map(Into::into)
}

impl Flatten for DecodedReport {
    fn field(&self, column: &str) -> Option<FieldValue> {
        let header = &self.header;
        match column {
            "recv_time" => return Some(FieldValue::DateTime(self.recv_time)),
            "hdlc_address" => return Some(header.link_address.into()),
            "hdlc_control" => return Some(header.link_control.into()),
            "cat" => return Some(header.category.into()),
            "len" => return Some(header.length.into()),
            "fspec" => return Some(FieldValue::Text(header.fspec.to_binary())),
            _ => {}
        }

        match &self.body {
            ReportBody::Cat048(r) => match column {
                "sac" => opt(r.sac),
                "sic" => opt(r.sic),
                "time_of_day" => opt(r.time_of_day),
                "slant_range_m" => opt(r.slant_range_m),
                "azimuth_deg" => opt(r.azimuth_deg),
                "flight_level_m" => opt(r.flight_level_m),
                "icao" => opt(r.aircraft_address.map(address_to_string)),
                "flight_id" => opt(r.flight_id.clone()),
                "track_number" => opt(r.track_number),
                "position_x_m" => opt(r.position_x_m),
                "position_y_m" => opt(r.position_y_m),
                "ground_speed_ms" => opt(r.ground_speed_ms),
                "heading_deg" => opt(r.heading_deg),
                "height_3d_m" => opt(r.height_3d_m),
                "longitude" => opt(r.coordinate.map(|c| c.longitude)),
                "latitude" => opt(r.coordinate.map(|c| c.latitude)),
                _ => None,
            },
            ReportBody::Cat034(r) => match column {
                "sac" => opt(r.sac),
                "sic" => opt(r.sic),
                "time_of_day" => opt(r.time_of_day),
                "message_type" => opt(r.message_type),
                "sector_number" => opt(r.sector_number),
                "antenna_period_s" => opt(r.antenna_period_s),
                _ => None,
            },
        }
    }
}

pub type Row = Vec<Option<FieldValue>>;

/// Flatten `record` into one cell per column.
pub fn to_row<T: Flatten + ?Sized>(record: &T, columns: &[&str]) -> Row {
    columns.iter().map(|c| record.field(c)).collect()
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Tabular output destination.
pub trait ExportSink {
    /// Called once, before any row.
    fn write_header(&mut self, columns: &[&str]) -> Result<()>;
    /// One cell per column, in header order.
    fn write_row(&mut self, row: &[Option<FieldValue>]) -> Result<()>;
    /// Flush/commit. Called once after the last row.
    fn finish(&mut self) -> Result<()>;
}

/// Write header and one row per record. Returns the rows written.
pub fn export<'r, S, T, I>(sink: &mut S, columns: &[&str], records: I) -> Result<usize>
where
    S: ExportSink + ?Sized,
    T: Flatten + 'r,
    I: IntoIterator<Item = &'r T>,
{
    sink.write_header(columns)?;
    let mut count = 0;
    for record in records {
        sink.write_row(&to_row(record, columns))?;
        count += 1;
    }
    sink.finish()?;
    Ok(count)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
