//! Scanned token decoding.
//!
//! QR payloads carry the user identity as a hex-encoded string so badge
//! printers never embed the raw ID. Decoding is core-internal because it
//! determines identity semantics: a payload that does not decode to valid
//! UTF-8 is not an identity at all.

use thiserror::Error;

/// Errors from decoding a raw scanned payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The payload had an odd number of hex digits.
    #[error("hex payload has odd length {len}")]
    OddLength { len: usize },
    /// The payload contained a non-hex character.
    #[error("invalid hex digit {byte:#04x} at offset {offset}")]
    InvalidDigit { byte: u8, offset: usize },
    /// The decoded bytes were not valid UTF-8.
    #[error("decoded payload is not valid UTF-8")]
    NotUtf8,
    /// The payload was empty.
    #[error("empty payload")]
    Empty,
}

/// Decodes a hex-encoded QR payload into the identity string it carries.
pub fn decode_token(raw: &str) -> Result<String, TokenError> {
    let digits = raw.as_bytes();
    if digits.is_empty() {
        return Err(TokenError::Empty);
    }
    if digits.len() % 2 != 0 {
        return Err(TokenError::OddLength { len: digits.len() });
    }

    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for (i, pair) in digits.chunks_exact(2).enumerate() {
        let hi = hex_value(pair[0]).ok_or(TokenError::InvalidDigit {
            byte: pair[0],
            offset: i * 2,
        })?;
        let lo = hex_value(pair[1]).ok_or(TokenError::InvalidDigit {
            byte: pair[1],
            offset: i * 2 + 1,
        })?;
        bytes.push((hi << 4) | lo);
    }

    String::from_utf8(bytes).map_err(|_| TokenError::NotUtf8)
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
