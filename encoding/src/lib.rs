//! Reversible conversions between byte buffers and their text forms.
//!
//! Four families, each a module with a symmetric `decode`/`encode` pair:
//!
//! - [`base64`]: lenient base64 (unrecognized input characters are
//!   skipped, output wrapped for PEM compatibility)
//! - [`hex`]: hexadecimal with selectable byte order
//! - [`bigint`]: signed arbitrary-precision integers as `0x`-prefixed
//!   hex text, stored as minimal two's-complement big-endian bytes
//! - [`charset`]: text in one of six named character sets
//!
//! "decode" always goes from text to bytes and "encode" from bytes to
//! text, matching the orientation of the wire codec these feed into.

pub mod base64;
pub mod bigint;
pub mod charset;
pub mod error;
pub mod hex;

pub use charset::Charset;
pub use error::Error;
pub use hex::Endian;
