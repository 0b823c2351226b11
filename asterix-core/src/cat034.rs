//! CAT034 monoradar service message decoding.

use crate::decode::walk_items;
use crate::header::Fspec;
use crate::reader::OctetReader;
use crate::report::{time_of_day, Cat034Report};
use crate::types::Result;
use crate::uap::*;

/// Decode the first record after the FSPEC.
pub fn decode(reader: &mut OctetReader<'_>, fspec: &Fspec, uap: &Uap) -> Result<Cat034Report> {
    let mut report = Cat034Report::default();

    walk_items(reader, fspec, uap, |item, r| {
        match item.id {
            I034_010 => {
                report.sac = Some(r.read_u8()?);
                report.sic = Some(r.read_u8()?);
            }
            I034_000 => report.message_type = Some(r.read_u8()?),
            I034_030 => report.time_of_day = Some(time_of_day(r.read_u24()?)),
            I034_020 => report.sector_number = Some(r.read_u8()?),
            // 1/128 s
            I034_041 => report.antenna_period_s = Some(r.read_u16()? as f64 / 128.0),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::parse_header;
    use crate::types::{hex_decode, AsterixError};
    use chrono::NaiveTime;

    fn decode_hex(hex: &str) -> Result<Cat034Report> {
        let buf = hex_decode(hex).unwrap();
        let mut r = OctetReader::new(&buf);
        let header = parse_header(&mut r)?;
        assert_eq!(header.category, 34);
        decode(&mut r, &header.fspec, &CAT034_UAP)
    }

    #[test]
    fn test_north_marker() {
        // FSPEC 0xF0: items 1-4. SAC/SIC 02/0B, type 1, ToD 1 s, sector 0
        let report = decode_hex("000322000BF0020B0100008000").unwrap();
        assert_eq!(report.sac, Some(2));
        assert_eq!(report.sic, Some(11));
        assert_eq!(report.message_type, Some(1));
        assert_eq!(report.time_of_day, NaiveTime::from_hms_opt(0, 0, 1));
        assert_eq!(report.sector_number, Some(0));
        assert_eq!(report.antenna_period_s, None);
    }

    #[test]
    fn test_sector_crossing_without_time() {
        // FSPEC 0x50: items 2 and 4
        let report = decode_hex("0003220006500240").unwrap();
        assert_eq!(report.message_type, Some(2));
        assert_eq!(report.sector_number, Some(0x40));
        assert_eq!(report.time_of_day, None);
        assert_eq!(report.sac, None);
    }

    #[test]
    fn test_antenna_period() {
        // FSPEC 0x08: item 5. 0x0200 / 128 = 4 s
        let report = decode_hex("0003220006080200").unwrap();
        assert_eq!(report.antenna_period_s, Some(4.0));
    }

    #[test]
    fn test_truncated() {
        // Time of day announced but LEN stops after one octet of it
        let err = decode_hex("000322000520000080").unwrap_err();
        assert!(matches!(err, AsterixError::TruncatedInput { .. }));
    }
}
