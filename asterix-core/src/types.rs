//! Shared error enum, result alias, and hex/address helpers for asterix-core.

use thiserror::Error;

/// All errors produced by asterix-core.
#[derive(Debug, Error)]
pub enum AsterixError {
    #[error("truncated input: wanted {wanted} octets, {remaining} remaining")]
    TruncatedInput { wanted: usize, remaining: usize },
    #[error("invalid hex payload: {0}")]
    InvalidHex(String),
    #[error("malformed timestamp: {0}")]
    MalformedTimestamp(String),
    #[error("malformed line: {0}")]
    MalformedLine(String),
    #[error("unsupported category: {0}")]
    UnsupportedCategory(u8),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("export error: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, AsterixError>;

// ---------------------------------------------------------------------------
// Aircraft address helpers
// ---------------------------------------------------------------------------

/// Format a 24-bit aircraft address as 6-char uppercase hex.
pub fn address_to_string(address: u32) -> String {
    format!("{:06X}", address & 0xFF_FFFF)
}

// ---------------------------------------------------------------------------
// Hex utilities
// ---------------------------------------------------------------------------

/// Decode a hex string into octets. Case-insensitive, must be even length.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if !hex.len().is_multiple_of(2) {
        return None;
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for chunk in hex.as_bytes().chunks(2) {
        let high = hex_digit(chunk[0])?;
        let low = hex_digit(chunk[1])?;
        bytes.push((high << 4) | low);
    }
    Some(bytes)
}

/// Encode octets as an uppercase hex string.
pub fn hex_encode(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for &b in data {
        s.push(HEX_CHARS[(b >> 4) as usize] as char);
        s.push(HEX_CHARS[(b & 0x0F) as usize] as char);
    }
    s
}

const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
