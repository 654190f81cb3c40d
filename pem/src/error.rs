use thiserror::Error;

/// Errors that can occur when parsing or decoding PEM data.
///
/// Decoding is deliberately lenient (a bare base64 blob, a block under
/// the requested label, or a block under any label are all accepted),
/// so the only unrecoverable states are no recognizable block at all,
/// mismatched boundary labels, and broken payloads.
#[derive(Debug, Error)]
pub enum Error {
    /// No bare base64 blob and no labelled block found
    #[error("not a valid PEM format")]
    NotPem,

    /// The BEGIN and END labels do not match
    #[error("label doesn't match: BEGIN {begin}, END {end}")]
    LabelMismatch { begin: String, end: String },

    /// No data found between boundary markers
    #[error("missing PEM data")]
    MissingData,

    /// Failed to decode the base64 body
    #[error("base64 decode: {0}")]
    Base64Decode(#[source] encoding::Error),

    /// The recovered bytes are not a valid BER encoding (deep decode)
    #[error("invalid BER payload: {0}")]
    Ber(#[source] ber::Error),
}
