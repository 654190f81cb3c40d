//! Lenient base64 conversion.
//!
//! Decoding strips every character outside the 64-symbol alphabet and
//! `=` before handing the rest to the engine, so whitespace, line
//! breaks and stray punctuation in the input are skipped rather than
//! rejected. Encoding wraps the output at 76 characters, the classic
//! PEM-compatible line width.

use ::base64::Engine;
use ::base64::alphabet;
use ::base64::engine::general_purpose::GeneralPurpose;
use ::base64::engine::{DecodePaddingMode, GeneralPurposeConfig};

use crate::error::Error;

/// Output line width used by [`encode`].
const LINE_WIDTH: usize = 76;

/// Standard alphabet, padding accepted but not required, trailing bits
/// tolerated.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes base64 text to bytes, skipping unrecognized characters.
pub fn decode(s: &str) -> Result<Vec<u8>, Error> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '+' || *c == '/')
        .collect();
    LENIENT.decode(cleaned).map_err(Error::Base64Decode)
}

/// Encodes bytes as base64 text, wrapped at 76 characters with `\r\n`.
pub fn encode(data: &[u8]) -> String {
    let raw = LENIENT.encode(data);
    let mut out = String::with_capacity(raw.len() + raw.len() / LINE_WIDTH * 2);
    for (i, chunk) in raw.as_bytes().chunks(LINE_WIDTH).enumerate() {
        if i > 0 {
            out.push_str("\r\n");
        }
        // chunks of an ASCII string are valid UTF-8
        out.push_str(&String::from_utf8_lossy(chunk));
    }
    out
}
