//! Error types for the primitive conversions.

use thiserror::Error;

use crate::charset::Charset;

/// Errors that can occur during primitive text/binary conversions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Failed to decode base64 data (after stripping foreign characters)
    #[error("base64 decode: {0}")]
    Base64Decode(::base64::DecodeError),

    /// The charset name is not one of the recognized aliases
    #[error("unknown charset '{0}'")]
    UnknownCharset(String),

    /// A multi-byte group ended before all of its bytes arrived
    #[error("{charset}: truncated multi-byte sequence at byte {position}")]
    TruncatedSequence { charset: Charset, position: usize },

    /// A UTF-16 surrogate without its partner
    #[error("utf16: unpaired surrogate 0x{0:04X}")]
    UnpairedSurrogate(u16),

    /// A decoded code point outside the Unicode scalar range
    #[error("code point 0x{0:X} is not representable as a character")]
    CodePointOutOfRange(u32),
}
