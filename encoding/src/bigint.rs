//! Signed big-integer hex text conversion.
//!
//! The text form is a `0x`-prefixed hex magnitude with a leading `-`
//! for negative values. The byte form is minimal-length two's-complement
//! big-endian: a positive value whose top bit would otherwise be set
//! gains one zero byte (128 encodes as `00 80`), and a negative value
//! whose sign byte already carries the sign is not over-padded (-128
//! encodes as exactly `80`).

use num_bigint::BigInt;

/// Decodes signed hex text to two's-complement big-endian bytes.
///
/// Characters outside `[-0-9a-fA-F]` are stripped, so `0x1f`, `1f` and
/// `0x 1F` all decode alike. Empty input decodes to the single byte `00`.
pub fn decode(s: &str) -> Vec<u8> {
    let filtered: String = s
        .chars()
        .filter(|c| c.is_ascii_hexdigit() || *c == '-')
        .collect();
    let (negative, magnitude) = match filtered.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, filtered.as_str()),
    };
    let digits: String = magnitude.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    let value = if digits.is_empty() {
        BigInt::from(0)
    } else {
        BigInt::parse_bytes(digits.as_bytes(), 16).unwrap_or_default()
    };
    let value = if negative { -value } else { value };
    value.to_signed_bytes_be()
}

/// Encodes two's-complement big-endian bytes as signed hex text.
pub fn encode(data: &[u8]) -> String {
    if data.is_empty() {
        return "0x00".to_string();
    }
    let value = BigInt::from_signed_bytes_be(data);
    format!("{:#x}", value)
}
