//! Error types for ASN.1 value conversion.

use std::num::ParseIntError;

use thiserror::Error;

/// Errors that can occur converting between TLV nodes and typed elements.
#[derive(Debug, Error)]
pub enum Error {
    // Boolean errors
    #[error("invalid boolean")]
    InvalidBoolean,

    // Integer errors
    #[error("INTEGER: no data")]
    IntegerNoData,
    #[error("INTEGER: value out of range for i64")]
    IntegerOutOfRangeI64,
    #[error("INTEGER: value out of range for u64")]
    IntegerOutOfRangeU64,
    #[error("parse int error: {0}")]
    ParseInt(ParseIntError),

    // ObjectIdentifier errors
    #[error("OBJECT IDENTIFIER: no data")]
    ObjectIdentifierNoData,
    #[error("OBJECT IDENTIFIER: incomplete encoding")]
    ObjectIdentifierIncompleteEncoding,
    #[error("OBJECT IDENTIFIER: arc value overflows 64 bits")]
    ObjectIdentifierArcOverflow,
    #[error("OBJECT IDENTIFIER: too few components (need at least 2)")]
    ObjectIdentifierTooFewComponents,
    #[error("OBJECT IDENTIFIER: empty string")]
    ObjectIdentifierEmptyString,

    // BitString errors
    #[error("BIT STRING: no data")]
    BitStringNoData,
    #[error("BIT STRING: unused bits {0} out of range (must be 0-7)")]
    BitStringUnusedBitsOutOfRange(u8),

    // String type errors
    #[error("string payload: {0}")]
    Charset(#[source] encoding::Error),

    // Time errors
    #[error("UTCTime: no data")]
    UtcTimeNoData,
    #[error("UTCTime: unrecognized time format '{0}'")]
    UtcTimeInvalidFormat(String),
    #[error("GeneralizedTime: no data")]
    GeneralizedTimeNoData,
    #[error("GeneralizedTime: unrecognized time format '{0}'")]
    GeneralizedTimeInvalidFormat(String),

    // Context-specific errors
    #[error("invalid context-specific value: [{slot}], {msg}")]
    InvalidContextSpecific { slot: u64, msg: String },

    // TLV errors
    #[error("invalid BER encoding: {0}")]
    FailedToDecodeBer(#[source] ber::Error),

    // Element errors
    #[error("element: cannot encode {0}")]
    ElementCannotEncode(&'static str),
}
