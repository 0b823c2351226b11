//! Leading fields shared by every message category.
//!
//! Layout: link address (1), link control (1), category (1), length (2),
//! then the FSPEC presence map read with the FX convention, one octet at a
//! time. The declared length counts from the category octet; the reader is
//! clamped to it so no item can run past the end of the data block.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::reader::{to_binary, OctetReader};
use crate::types::Result;

/// Octets of link framing (address + control) ahead of the category.
pub const LINK_OCTETS: usize = 2;

/// Presence bits per FSPEC octet; the eighth bit is FX.
const ITEMS_PER_OCTET: usize = 7;

// ---------------------------------------------------------------------------
// FSPEC
// ---------------------------------------------------------------------------

/// Field specification: which data items of the category table follow.
///
/// Item `k` (1-indexed) is bit `(k - 1) % 7` (MSB first) of octet
/// `(k - 1) / 7`. Items past the last octet are absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fspec {
    octets: Vec<u8>,
}

impl Fspec {
    pub fn from_octets(octets: Vec<u8>) -> Self {
        Fspec { octets }
    }

    pub fn octets(&self) -> &[u8] {
        &self.octets
    }

    /// Octets the extension read consumed.
    pub fn octet_count(&self) -> usize {
        self.octets.len()
    }

    pub fn bit_len(&self) -> usize {
        self.octets.len() * 8
    }

    /// True if the map is long enough to describe item `frn`.
    pub fn reaches(&self, frn: usize) -> bool {
        frn >= 1 && (frn - 1) / ITEMS_PER_OCTET < self.octets.len()
    }

    /// Presence bit for item `frn` (1-indexed). FX bits are never items.
    pub fn has_item(&self, frn: usize) -> bool {
        if !self.reaches(frn) {
            return false;
        }
        let octet = self.octets[(frn - 1) / ITEMS_PER_OCTET];
        let bit = (frn - 1) % ITEMS_PER_OCTET;
        octet & (0x80 >> bit) != 0
    }

    /// Highest item index this map can describe.
    pub fn max_item(&self) -> usize {
        self.octets.len() * ITEMS_PER_OCTET
    }

    /// Present item indices in ascending order.
    pub fn items(&self) -> impl Iterator<Item = usize> + '_ {
        (1..=self.max_item()).filter(|&frn| self.has_item(frn))
    }

    /// Raw bit string, FX bits included.
    pub fn to_binary(&self) -> String {
        to_binary(&self.octets)
    }
}

impl fmt::Display for Fspec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_binary())
    }
}

impl Serialize for Fspec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_binary())
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Parsed leading fields of one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageHeader {
    pub link_address: u8,
    pub link_control: u8,
    pub category: u8,
    /// Declared data block length, counted from the category octet.
    pub length: u16,
    pub fspec: Fspec,
}

/// Read the header and FSPEC, leaving the reader on the first data item.
pub fn parse_header(reader: &mut OctetReader<'_>) -> Result<MessageHeader> {
    let link_address = reader.read_u8()?;
    let link_control = reader.read_u8()?;
    let category = reader.read_u8()?;
    let length = reader.read_u16()?;

    reader.limit_to(LINK_OCTETS + length as usize);

    let fspec = Fspec::from_octets(reader.read_extended(1, 1)?.as_bytes().to_vec());

    Ok(MessageHeader {
        link_address,
        link_control,
        category,
        length,
        fspec,
    })
}

/// Category octet only, for demultiplexing without a full decode.
pub fn get_category(payload: &[u8]) -> Result<u8> {
    let mut reader = OctetReader::new(payload);
    reader.read_octets_raw(LINK_OCTETS)?;
    reader.read_u8()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{hex_decode, AsterixError};

    #[test]
    fn test_fspec_single_octet() {
        let fspec = Fspec::from_octets(vec![0b1010_0000]);
        assert_eq!(fspec.bit_len(), 8);
        assert!(fspec.has_item(1));
        assert!(!fspec.has_item(2));
        assert!(fspec.has_item(3));
        assert!(!fspec.has_item(8)); // beyond first octet
        assert_eq!(fspec.items().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_fspec_fx_bit_is_not_an_item() {
        // Octet 1: only FX. Octet 2: item 8 (its first bit).
        let fspec = Fspec::from_octets(vec![0b0000_0001, 0b1000_0000]);
        assert_eq!(fspec.items().collect::<Vec<_>>(), vec![8]);
        assert!(!fspec.has_item(7));
    }

    #[test]
    fn test_fspec_item_to_bit_mapping() {
        // Raw bit position of item k is k + ceil(k/7) - 1 (1-indexed).
        let fspec = Fspec::from_octets(vec![0xFF, 0xFF, 0xFE]);
        let bits: Vec<char> = fspec.to_binary().chars().collect();
        for k in 1..=21usize {
            let pos = k + k.div_ceil(7) - 1;
            assert_eq!(bits[pos - 1], '1');
            assert!(fspec.has_item(k));
        }
        assert_eq!(fspec.max_item(), 21);
    }

    #[test]
    fn test_fspec_reaches() {
        let fspec = Fspec::from_octets(vec![0x01, 0x00]);
        assert!(fspec.reaches(14));
        assert!(!fspec.reaches(15));
        assert!(!fspec.reaches(0));
    }

    #[test]
    fn test_parse_header() {
        let buf = hex_decode("0203300010F78200").unwrap();
        let mut r = OctetReader::new(&buf);
        let header = parse_header(&mut r).unwrap();
        assert_eq!(header.link_address, 0x02);
        assert_eq!(header.link_control, 0x03);
        assert_eq!(header.category, 48);
        assert_eq!(header.length, 0x10);
        // 0xF7 has FX, 0x82 has none: two octets
        assert_eq!(header.fspec.octet_count(), 2);
        assert_eq!(header.fspec.bit_len(), 16);
        assert_eq!(r.position(), 7);
    }

    #[test]
    fn test_fspec_octets_match_extension_read() {
        for hex in ["00033000FF00", "0003300020FFFF00", "000330002000"] {
            let buf = hex_decode(hex).unwrap();
            let mut r = OctetReader::new(&buf);
            let header = parse_header(&mut r).unwrap();
            assert_eq!(header.fspec.bit_len() / 8, r.position() - 5);
        }
    }

    #[test]
    fn test_declared_length_clamps_reader() {
        // LEN = 4: category, two length octets, one FSPEC octet. Trailing octets ignored.
        let buf = hex_decode("0003300004800102").unwrap();
        let mut r = OctetReader::new(&buf);
        parse_header(&mut r).unwrap();
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_declared_length_too_short_for_fspec() {
        let buf = hex_decode("000330000380").unwrap();
        let mut r = OctetReader::new(&buf);
        assert!(matches!(
            parse_header(&mut r),
            Err(AsterixError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_truncated_header() {
        let buf = hex_decode("000330").unwrap();
        let mut r = OctetReader::new(&buf);
        assert!(matches!(
            parse_header(&mut r),
            Err(AsterixError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_get_category() {
        let buf = hex_decode("0003220010").unwrap();
        assert_eq!(get_category(&buf).unwrap(), 34);
        assert!(get_category(&buf[..2]).is_err());
    }

    #[test]
    fn test_fspec_display() {
        let fspec = Fspec::from_octets(vec![0xF7, 0x02]);
        assert_eq!(fspec.to_string(), "1111011100000010");
    }
}
