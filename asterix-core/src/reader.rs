//! Cursor over an octet buffer with bounded big-endian reads.
//!
//! Every read either consumes exactly the requested octets or fails with
//! `TruncatedInput` and leaves the cursor where it was. The extension read
//! implements the FX convention: keep consuming while the low bit of the
//! most recently read chunk is set.

use crate::types::{AsterixError, Result};

/// Read cursor over one message. Owns nothing but its position.
#[derive(Debug, Clone)]
pub struct OctetReader<'a> {
    buf: &'a [u8],
    pos: usize,
    end: usize,
}

/// Octets consumed by an extension-continuation read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedField<'a> {
    octets: &'a [u8],
}

impl<'a> OctetReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        OctetReader {
            buf,
            pos: 0,
            end: buf.len(),
        }
    }

    /// Octets consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Octets left before the read limit.
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Lower the read limit to absolute offset `end`.
    ///
    /// The limit never grows past the buffer and never drops below the cursor.
    pub fn limit_to(&mut self, end: usize) {
        self.end = end.clamp(self.pos, self.end);
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(AsterixError::TruncatedInput {
                wanted: n,
                remaining: self.remaining(),
            });
        }
        let chunk = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(chunk)
    }

    /// Consume `n` octets (at most 8) as a big-endian unsigned integer.
    pub fn read_octets(&mut self, n: usize) -> Result<u64> {
        debug_assert!(n <= 8, "read_octets supports at most 8 octets");
        Ok(be_value(self.take(n)?))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u24(&mut self) -> Result<u32> {
        let b = self.take(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    /// Consume `n` octets and return them untouched.
    pub fn read_octets_raw(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// Consume `n` octets as a zero-padded binary digit string of length `8n`.
    pub fn read_octets_binary(&mut self, n: usize) -> Result<String> {
        Ok(to_binary(self.take(n)?))
    }

    /// Extension-continuation read.
    ///
    /// Consumes `min` octets, then `step` more for as long as the last octet
    /// read has its low (FX) bit set. Both sizes are at least one octet.
    /// On truncation the cursor is restored to where the read started.
    pub fn read_extended(&mut self, min: usize, step: usize) -> Result<ExtendedField<'a>> {
        let start = self.pos;
        let step = step.max(1);
        let mut chunk = self.take(min.max(1))?;
        while chunk[chunk.len() - 1] & 1 != 0 {
            chunk = match self.take(step) {
                Ok(c) => c,
                Err(e) => {
                    self.pos = start;
                    return Err(e);
                }
            };
        }
        Ok(ExtendedField {
            octets: &self.buf[start..self.pos],
        })
    }
}

impl<'a> ExtendedField<'a> {
    /// Number of octets the read consumed.
    pub fn len(&self) -> usize {
        self.octets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.octets.is_empty()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.octets
    }

    /// Concatenated value, `None` when it does not fit in 128 bits.
    pub fn value(&self) -> Option<u128> {
        if self.octets.len() > 16 {
            return None;
        }
        Some(
            self.octets
                .iter()
                .fold(0u128, |acc, &b| (acc << 8) | b as u128),
        )
    }

    /// Set bits across all octets, FX bits included.
    pub fn count_ones(&self) -> u32 {
        self.octets.iter().map(|b| b.count_ones()).sum()
    }

    pub fn to_binary(&self) -> String {
        to_binary(self.octets)
    }
}

/// Big-endian fold of up to 8 octets.
fn be_value(octets: &[u8]) -> u64 {
    octets.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

pub(crate) fn to_binary(octets: &[u8]) -> String {
    let mut s = String::with_capacity(octets.len() * 8);
    for b in octets {
        s.push_str(&format!("{b:08b}"));
    }
    s
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
