use thiserror::Error;

/// Errors raised while reading or writing the tag-length-value grammar.
///
/// Everything here is fatal for the node being decoded; recovery (trying
/// another alternative, treating a field as absent) happens in the schema
/// layer, never down here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("parser error {0:?}")]
    Parser(nom::error::ErrorKind),
    #[error("parser incomplete: {0:?}")]
    ParserIncomplete(nom::Needed),
    #[error("tag number exceeds the supported range (2^53 - 1)")]
    TagNumberOverflow,
    #[error("length over 48 bits not supported")]
    LengthOverflow,
    #[error("content size is not correct for container")]
    LengthMismatch,
    #[error("indefinite length requires a constructed tag")]
    PrimitiveIndefiniteLength,
    #[error("unterminated indefinite-length content")]
    UnterminatedIndefinite,
}

impl<'a> nom::error::ParseError<&'a [u8]> for Error {
    fn from_error_kind(_input: &'a [u8], kind: nom::error::ErrorKind) -> Self {
        Error::Parser(kind)
    }

    fn append(_input: &'a [u8], _kind: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

impl From<nom::Err<Error>> for Error {
    fn from(e: nom::Err<Error>) -> Self {
        match e {
            nom::Err::Incomplete(needed) => Error::ParserIncomplete(needed),
            nom::Err::Error(e) | nom::Err::Failure(e) => e,
        }
    }
}
