//! # kumiki
//!
//! Core traits for encoding and decoding in the kumiki ASN.1 toolkit.
//!
//! This crate defines the fundamental `Decoder` and `Encoder` traits that
//! establish a type-safe conversion pattern used throughout kumiki.
//!
//! ## Overview
//!
//! The conversion pattern flows like this:
//! ```text
//! PEM → Vec<u8> → Tlv → Element
//! ```
//!
//! Each step uses the `Decoder` trait to convert from one type to the next,
//! and the `Encoder` trait to convert in the reverse direction.
//!
//! ## Type Safety
//!
//! The traits use marker traits (`DecodableFrom` and `EncodableTo`) to ensure
//! type safety at compile time. This prevents invalid conversions and catches
//! errors early in the development process.
//!
//! ## Example
//!
//! The following example demonstrates the decoding pattern. Note that specific
//! implementations are provided by the `ber`, `asn1`, and `pem` crates:
//!
//! ```ignore
//! use kumiki::decoder::Decoder;
//! use ber::Tlv;
//! use asn1::Element;
//!
//! // Decode raw bytes to a TLV tree
//! let bytes = vec![0x30, 0x00];
//! let tlv: Tlv = bytes.decode().unwrap();
//!
//! // Decode the TLV tree to a typed element
//! let element: Element = (&tlv).try_into().unwrap();
//! ```
//!
//! Encoding works in the reverse direction:
//!
//! ```ignore
//! use kumiki::encoder::Encoder;
//! use ber::{Ber, Ruleset, Tag, Tlv, UniversalTag};
//!
//! // Encode a TLV tree to bytes
//! let tlv = Tlv::new_constructed(Tag::constructed(UniversalTag::Sequence), vec![]);
//! let bytes = Ber::new(vec![tlv]).to_bytes(Ruleset::Der);
//! ```

#![forbid(unsafe_code)]

pub mod decoder;
pub mod encoder;
