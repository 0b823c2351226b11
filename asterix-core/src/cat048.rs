//! CAT048 monoradar target report decoding.
//!
//! Modelled items are converted to SI units on the way in:
//! - slant range: 1/256 NM → metres
//! - azimuth, heading: 360/2^16 degrees per LSB
//! - flight level: 1/4 FL → metres, absent when the raw code is >= 2^14
//! - cartesian position: signed, 1/128 NM → metres
//! - ground speed: 2^-14 NM/s → m/s
//! - 3D height: 14-bit signed, 25 ft → metres
//!
//! Everything else in the table is consumed by width and discarded.

use crate::coord::{polar_to_geo, Coordinate, NM_TO_M};
use crate::decode::walk_items;
use crate::header::Fspec;
use crate::reader::OctetReader;
use crate::report::{time_of_day, Cat048Report};
use crate::types::Result;
use crate::uap::*;

const FEET_TO_M: f64 = 0.3048;

/// Raw flight level codes at or above this value are garbled.
const FLIGHT_LEVEL_LIMIT: u16 = 1 << 14;

/// 6-bit character codes: 1-26 letters, 48-57 digits. Other codes decode to nothing.
fn callsign_char(code: u8) -> Option<char> {
    match code {
        1..=26 => Some((b'A' + code - 1) as char),
        48..=57 => Some((b'0' + code - 48) as char),
        _ => None,
    }
}

/// Decode 6 octets of aircraft identification (eight 6-bit groups).
pub fn decode_callsign(raw: u64) -> String {
    (0..8)
        .filter_map(|i| callsign_char(((raw >> (42 - i * 6)) & 0x3F) as u8))
        .collect()
}

pub fn flight_level_m(raw: u16) -> Option<f64> {
    if raw < FLIGHT_LEVEL_LIMIT {
        Some(raw as f64 / 4.0 * 30.48)
    } else {
        None
    }
}

fn height_3d_m(raw: u16) -> f64 {
    let mut value = (raw & 0x3FFF) as i32;
    if value & 0x2000 != 0 {
        value -= 0x4000;
    }
    value as f64 * 25.0 * FEET_TO_M
}

/// Decode the first record after the FSPEC.
pub fn decode(
    reader: &mut OctetReader<'_>,
    fspec: &Fspec,
    uap: &Uap,
    reference: Coordinate,
) -> Result<Cat048Report> {
    let mut report = Cat048Report::default();

    walk_items(reader, fspec, uap, |item, r| {
        match item.id {
            I048_010 => {
                report.sac = Some(r.read_u8()?);
                report.sic = Some(r.read_u8()?);
            }
            I048_140 => {
                report.time_of_day = Some(time_of_day(r.read_u24()?));
            }
            I048_040 => {
                let range = r.read_u16()?;
                let azimuth = r.read_u16()?;
                report.slant_range_m = Some(range as f64 / 256.0 * NM_TO_M);
                report.azimuth_deg = Some(azimuth as f64 * 360.0 / 65536.0);
            }
            I048_090 => {
                report.flight_level_m = flight_level_m(r.read_u16()?);
            }
            I048_220 => {
                report.aircraft_address = Some(r.read_u24()?);
            }
            I048_240 => {
                report.flight_id = Some(decode_callsign(r.read_octets(6)?));
            }
            I048_161 => {
                report.track_number = Some(r.read_u16()?);
            }
            I048_042 => {
                let x = r.read_u16()? as i16;
                let y = r.read_u16()? as i16;
                report.position_x_m = Some(x as f64 / 128.0 * NM_TO_M);
                report.position_y_m = Some(y as f64 / 128.0 * NM_TO_M);
            }
            I048_200 => {
                let speed = r.read_u16()?;
                let heading = r.read_u16()?;
                report.ground_speed_ms = Some(speed as f64 * NM_TO_M / 16384.0);
                report.heading_deg = Some(heading as f64 * 360.0 / 65536.0);
            }
            I048_110 => {
                report.height_3d_m = Some(height_3d_m(r.read_u16()?));
            }
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    if let (Some(range), Some(azimuth)) = (report.slant_range_m, report.azimuth_deg) {
        report.coordinate = polar_to_geo(reference, range, azimuth);
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
