//! Encoder trait for type-safe conversions.
//!
//! The `Encoder` trait is the reverse direction of `Decoder`: it converts
//! a value back towards its wire representation, one pipeline stage at a
//! time (`Element → Tlv → Vec<u8> → PEM`).
//!
//! The same two-trait pattern as the decoder applies: `Encoder<T, E>`
//! performs the conversion and `EncodableTo<T>` marks valid target types.

/// Encoder trait for converting from type `T` to type `E`.
///
/// Implemented by the source type `T` to enable conversion to the
/// destination type `E`. The destination type must implement
/// `EncodableTo<T>`.
pub trait Encoder<T, E: EncodableTo<T>> {
    /// The error type returned when encoding fails.
    type Error;

    /// Encodes `self` into type `E`.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversion fails.
    fn encode(&self) -> Result<E, Self::Error>;
}

/// Marker trait indicating that type `E` can be encoded from type `T`.
///
/// Has no methods; serves only to constrain `Encoder` implementations
/// at compile time.
pub trait EncodableTo<T> {}
