//! Decode raw messages into typed category reports.
//!
//! Routing is a closed set: the header's category octet selects a
//! `Category`, and each category walks its own item table:
//! - CAT048: monoradar target reports (position, flight level, identity, track)
//! - CAT034: monoradar service messages (sector crossings, antenna period)
//!
//! Items are visited in FSPEC order. An item is only read when its bit is
//! set and the FSPEC has an octet for it; an item the category does not
//! model is consumed by width so the next item starts on the right octet.

use tracing::trace;

use crate::cat034;
use crate::cat048;
use crate::coord::{Coordinate, RADAR_REFERENCE};
use crate::header::{parse_header, Fspec, MessageHeader};
use crate::reader::OctetReader;
use crate::report::{DecodedReport, RawMessage, ReportBody};
use crate::types::{AsterixError, Result};
use crate::uap::{Uap, UapItem, CAT034_UAP, CAT048_UAP};

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Supported message categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Cat034,
    Cat048,
}

impl Category {
    pub fn id(self) -> u8 {
        match self {
            Category::Cat034 => 34,
            Category::Cat048 => 48,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            34 => Some(Category::Cat034),
            48 => Some(Category::Cat048),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Category {
    type Error = AsterixError;

    fn try_from(id: u8) -> Result<Self> {
        Category::from_id(id).ok_or(AsterixError::UnsupportedCategory(id))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CAT{:03}", self.id())
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Stateless message decoder. Immutable after construction; share by reference.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    cat048: &'static Uap,
    cat034: &'static Uap,
    reference: Coordinate,
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new(RADAR_REFERENCE)
    }
}

impl Decoder {
    /// Decoder with the standard item tables around radar site `reference`.
    pub fn new(reference: Coordinate) -> Self {
        Decoder::with_tables(&CAT048_UAP, &CAT034_UAP, reference)
    }

    pub fn with_tables(cat048: &'static Uap, cat034: &'static Uap, reference: Coordinate) -> Self {
        Decoder {
            cat048,
            cat034,
            reference,
        }
    }

    pub fn reference(&self) -> Coordinate {
        self.reference
    }

    pub fn uap(&self, category: Category) -> &'static Uap {
        match category {
            Category::Cat034 => self.cat034,
            Category::Cat048 => self.cat048,
        }
    }

    /// Decode header and first record of a payload.
    pub fn decode_payload(&self, payload: &[u8]) -> Result<(MessageHeader, ReportBody)> {
        let mut reader = OctetReader::new(payload);
        let header = parse_header(&mut reader)?;
        let category = Category::try_from(header.category)?;
        let uap = self.uap(category);

        let body = match category {
            Category::Cat048 => {
                ReportBody::Cat048(cat048::decode(&mut reader, &header.fspec, uap, self.reference)?)
            }
            Category::Cat034 => ReportBody::Cat034(cat034::decode(&mut reader, &header.fspec, uap)?),
        };
        Ok((header, body))
    }

    /// Decode one recorded message.
    pub fn decode(&self, raw: &RawMessage) -> Result<DecodedReport> {
        let (header, body) = self.decode_payload(&raw.payload)?;
        Ok(DecodedReport {
            recv_time: raw.recv_time,
            header,
            body,
        })
    }
}

/// Walk the present items of `fspec` in table order.
///
/// `decode_item` returns `Ok(true)` when it consumed the item itself, or
/// `Ok(false)` to have the item skipped by its table width. A present item
/// past the end of the table stops the walk: its width is unknown, so
/// nothing after it can be located.
pub(crate) fn walk_items<'a, F>(
    reader: &mut OctetReader<'a>,
    fspec: &Fspec,
    uap: &Uap,
    mut decode_item: F,
) -> Result<()>
where
    F: FnMut(&UapItem, &mut OctetReader<'a>) -> Result<bool>,
{
    for frn in fspec.items() {
        let Some(item) = uap.item(frn) else {
            trace!(
                category = uap.category,
                frn,
                "item outside table, ignoring rest of record"
            );
            break;
        };
        let start = reader.position();
        if !decode_item(item, reader)? {
            item.format.consume(reader)?;
        }
        trace!(
            item = item.id,
            octets = reader.position() - start,
            "decoded item"
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::parse_timestamp;
    use crate::types::hex_decode;

    fn payload(hex: &str) -> Vec<u8> {
        hex_decode(hex).expect("valid hex")
    }

    #[test]
    fn test_category_ids() {
        assert_eq!(Category::from_id(48), Some(Category::Cat048));
        assert_eq!(Category::from_id(34), Some(Category::Cat034));
        assert_eq!(Category::from_id(21), None);
        assert_eq!(Category::Cat048.id(), 48);
        assert_eq!(Category::Cat034.to_string(), "CAT034");
    }

    #[test]
    fn test_unsupported_category() {
        let decoder = Decoder::default();
        let err = decoder.decode_payload(&payload("0003150004800102")).unwrap_err();
        assert!(matches!(err, AsterixError::UnsupportedCategory(21)));
    }

    #[test]
    fn test_routes_cat048() {
        let decoder = Decoder::default();
        // FSPEC 0x80: only I048/010
        let (header, body) = decoder.decode_payload(&payload("000330000680020B")).unwrap();
        assert_eq!(header.category, 48);
        assert!(matches!(body, ReportBody::Cat048(_)));
    }

    #[test]
    fn test_routes_cat034() {
        let decoder = Decoder::default();
        // FSPEC 0x40: only I034/000
        let (_, body) = decoder.decode_payload(&payload("00032200054002")).unwrap();
        match body {
            ReportBody::Cat034(r) => assert_eq!(r.message_type, Some(2)),
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn test_decode_keeps_recv_time() {
        let decoder = Decoder::default();
        let raw = RawMessage {
            recv_time: parse_timestamp("20200801:100.0").unwrap(),
            payload: payload("000330000680020B"),
        };
        let report = decoder.decode(&raw).unwrap();
        assert_eq!(report.recv_time, raw.recv_time);
        assert_eq!(report.category(), 48);
    }

    #[test]
    fn test_walk_stops_outside_table() {
        // Three FSPEC octets with item 20 set; CAT034 table has 5 items.
        let fspec = Fspec::from_octets(vec![0x41, 0x01, 0x04]);
        let buf = [0x07, 0xFF];
        let mut r = OctetReader::new(&buf);
        let mut seen = Vec::new();
        walk_items(&mut r, &fspec, &CAT034_UAP, |item, _| {
            seen.push(item.frn);
            Ok(false)
        })
        .unwrap();
        assert_eq!(seen, vec![2]);
        assert_eq!(r.position(), 1);
    }

    #[test]
    fn test_with_tables_uses_reference() {
        let reference = Coordinate::new(1.0, 2.0);
        let decoder = Decoder::with_tables(&CAT048_UAP, &CAT034_UAP, reference);
        assert_eq!(decoder.reference(), reference);
        assert_eq!(decoder.uap(Category::Cat048).category, 48);
    }
}
