//! User Application Profiles: the per-category data item tables.
//!
//! Each entry fixes the field reference number (FRN, the FSPEC item index),
//! the item identifier, and how many octets the item occupies on the wire.
//! Decoders use the format to consume items they do not model, so the cursor
//! stays aligned for whatever follows.

use crate::reader::OctetReader;
use crate::types::Result;

/// Wire layout of a data item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFormat {
    /// Exactly this many octets.
    Fixed(usize),
    /// FX-extended: `min` octets, then `step` more while FX is set.
    Extended { min: usize, step: usize },
    /// One-octet repetition count followed by that many `block`-octet blocks.
    Repetitive { block: usize },
    /// FX-extended primary, then one octet per set bit of the primary.
    PerBitSubfields,
}

impl ItemFormat {
    /// Consume one item of this format. Returns the octets consumed.
    pub fn consume(&self, reader: &mut OctetReader<'_>) -> Result<usize> {
        let start = reader.position();
        match *self {
            ItemFormat::Fixed(n) => {
                reader.read_octets_raw(n)?;
            }
            ItemFormat::Extended { min, step } => {
                reader.read_extended(min, step)?;
            }
            ItemFormat::Repetitive { block } => {
                let rep = reader.read_u8()? as usize;
                reader.read_octets_raw(rep * block)?;
            }
            ItemFormat::PerBitSubfields => {
                let primary = reader.read_extended(1, 1)?;
                reader.read_octets_raw(primary.count_ones() as usize)?;
            }
        }
        Ok(reader.position() - start)
    }
}

/// One row of a category table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UapItem {
    pub frn: usize,
    pub id: &'static str,
    pub name: &'static str,
    pub format: ItemFormat,
}

/// Complete item table for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uap {
    pub category: u8,
    pub items: &'static [UapItem],
}

impl Uap {
    /// Look up the item at `frn`. Returns `None` past the end of the table.
    pub fn item(&self, frn: usize) -> Option<&'static UapItem> {
        self.items.iter().find(|item| item.frn == frn)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

const fn item(frn: usize, id: &'static str, name: &'static str, format: ItemFormat) -> UapItem {
    UapItem {
        frn,
        id,
        name,
        format,
    }
}

// ---------------------------------------------------------------------------
// CAT048: monoradar target reports
// ---------------------------------------------------------------------------

pub const I048_010: &str = "I048/010";
pub const I048_140: &str = "I048/140";
pub const I048_020: &str = "I048/020";
pub const I048_040: &str = "I048/040";
pub const I048_070: &str = "I048/070";
pub const I048_090: &str = "I048/090";
pub const I048_130: &str = "I048/130";
pub const I048_220: &str = "I048/220";
pub const I048_240: &str = "I048/240";
pub const I048_250: &str = "I048/250";
pub const I048_161: &str = "I048/161";
pub const I048_042: &str = "I048/042";
pub const I048_200: &str = "I048/200";
pub const I048_170: &str = "I048/170";
pub const I048_210: &str = "I048/210";
pub const I048_030: &str = "I048/030";
pub const I048_080: &str = "I048/080";
pub const I048_100: &str = "I048/100";
pub const I048_110: &str = "I048/110";

const EXT1: ItemFormat = ItemFormat::Extended { min: 1, step: 1 };

pub static CAT048_ITEMS: [UapItem; 19] = [
    item(1, I048_010, "Data Source Identifier", ItemFormat::Fixed(2)),
    item(2, I048_140, "Time-of-Day", ItemFormat::Fixed(3)),
    item(3, I048_020, "Target Report Descriptor", EXT1),
    item(4, I048_040, "Measured Position in Slant Polar Coordinates", ItemFormat::Fixed(4)),
    item(5, I048_070, "Mode-3/A Code in Octal Representation", ItemFormat::Fixed(2)),
    item(6, I048_090, "Flight Level in Binary Representation", ItemFormat::Fixed(2)),
    item(7, I048_130, "Radar Plot Characteristics", ItemFormat::PerBitSubfields),
    item(8, I048_220, "Aircraft Address", ItemFormat::Fixed(3)),
    item(9, I048_240, "Aircraft Identification", ItemFormat::Fixed(6)),
    item(10, I048_250, "Mode S MB Data", ItemFormat::Repetitive { block: 8 }),
    item(11, I048_161, "Track Number", ItemFormat::Fixed(2)),
    item(12, I048_042, "Calculated Position in Cartesian Coordinates", ItemFormat::Fixed(4)),
    item(13, I048_200, "Calculated Track Velocity in Polar Representation", ItemFormat::Fixed(4)),
    item(14, I048_170, "Track Status", EXT1),
    item(15, I048_210, "Track Quality", ItemFormat::Fixed(4)),
    item(16, I048_030, "Warning/Error Conditions", EXT1),
    item(17, I048_080, "Mode-3/A Code Confidence Indicator", ItemFormat::Fixed(2)),
    item(18, I048_100, "Mode-C Code and Confidence Indicator", ItemFormat::Fixed(4)),
    item(19, I048_110, "Height Measured by 3D Radar", ItemFormat::Fixed(2)),
];

pub static CAT048_UAP: Uap = Uap {
    category: 48,
    items: &CAT048_ITEMS,
};

// ---------------------------------------------------------------------------
// CAT034: monoradar service messages
// ---------------------------------------------------------------------------

pub const I034_010: &str = "I034/010";
pub const I034_000: &str = "I034/000";
pub const I034_030: &str = "I034/030";
pub const I034_020: &str = "I034/020";
pub const I034_041: &str = "I034/041";

pub static CAT034_ITEMS: [UapItem; 5] = [
    item(1, I034_010, "Data Source Identifier", ItemFormat::Fixed(2)),
    item(2, I034_000, "Message Type", ItemFormat::Fixed(1)),
    item(3, I034_030, "Time-of-Day", ItemFormat::Fixed(3)),
    item(4, I034_020, "Sector Number", ItemFormat::Fixed(1)),
    item(5, I034_041, "Antenna Rotation Period", ItemFormat::Fixed(2)),
];

pub static CAT034_UAP: Uap = Uap {
    category: 34,
    items: &CAT034_ITEMS,
};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AsterixError;

    #[test]
    fn test_tables_are_dense_and_ordered() {
        for uap in [&CAT048_UAP, &CAT034_UAP] {
            for (i, item) in uap.items.iter().enumerate() {
                assert_eq!(item.frn, i + 1, "{} out of order", item.id);
            }
        }
        assert_eq!(CAT048_UAP.len(), 19);
        assert_eq!(CAT034_UAP.len(), 5);
    }

    #[test]
    fn test_item_lookup() {
        assert_eq!(CAT048_UAP.item(9).unwrap().id, I048_240);
        assert_eq!(CAT034_UAP.item(4).unwrap().id, I034_020);
        assert!(CAT048_UAP.item(20).is_none());
        assert!(CAT048_UAP.item(0).is_none());
    }

    #[test]
    fn test_consume_fixed() {
        let buf = [1, 2, 3, 4, 5];
        let mut r = OctetReader::new(&buf);
        assert_eq!(ItemFormat::Fixed(4).consume(&mut r).unwrap(), 4);
        assert_eq!(r.remaining(), 1);
    }

    #[test]
    fn test_consume_extended() {
        let buf = [0x41, 0x40, 0xAA];
        let mut r = OctetReader::new(&buf);
        assert_eq!(EXT1.consume(&mut r).unwrap(), 2);
    }

    #[test]
    fn test_consume_repetitive() {
        // REP = 2 → 16 octets of blocks
        let mut buf = vec![0x02];
        buf.extend_from_slice(&[0xEE; 16]);
        buf.push(0x55);
        let mut r = OctetReader::new(&buf);
        let fmt = ItemFormat::Repetitive { block: 8 };
        assert_eq!(fmt.consume(&mut r).unwrap(), 17);
        assert_eq!(r.read_u8().unwrap(), 0x55);
    }

    #[test]
    fn test_consume_repetitive_zero() {
        let buf = [0x00, 0x55];
        let mut r = OctetReader::new(&buf);
        let fmt = ItemFormat::Repetitive { block: 8 };
        assert_eq!(fmt.consume(&mut r).unwrap(), 1);
    }

    #[test]
    fn test_consume_per_bit_subfields() {
        // Primary 0b1010_0000: two subfields, one octet each
        let buf = [0b1010_0000, 0x11, 0x22, 0x99];
        let mut r = OctetReader::new(&buf);
        assert_eq!(ItemFormat::PerBitSubfields.consume(&mut r).unwrap(), 3);
        assert_eq!(r.read_u8().unwrap(), 0x99);
    }

    #[test]
    fn test_consume_per_bit_counts_fx() {
        // Primary 0b1000_0001 extends into 0b0100_0000: three set bits
        let buf = [0b1000_0001, 0b0100_0000, 0x01, 0x02, 0x03, 0x99];
        let mut r = OctetReader::new(&buf);
        assert_eq!(ItemFormat::PerBitSubfields.consume(&mut r).unwrap(), 5);
        assert_eq!(r.read_u8().unwrap(), 0x99);
    }

    #[test]
    fn test_consume_repetitive_truncated() {
        let buf = [0x01, 0x00, 0x00];
        let mut r = OctetReader::new(&buf);
        let fmt = ItemFormat::Repetitive { block: 8 };
        assert!(matches!(
            fmt.consume(&mut r),
            Err(AsterixError::TruncatedInput { .. })
        ));
    }
}
