use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDateTime;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use ber::{Ber, Class, Ruleset, Tag, Tlv, UniversalTag};
use encoding::charset::{self, Charset};
use kumiki::decoder::{DecodableFrom, Decoder};
use kumiki::encoder::{EncodableTo, Encoder};

pub mod error;
mod time;

pub use error::Error;

/// The decoded form of one buffer: an ordered list of top-level elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asn1Object {
    elements: Vec<Element>,
}

impl Asn1Object {
    pub fn new(elements: Vec<Element>) -> Self {
        Asn1Object { elements }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }
}

impl DecodableFrom<Ber> for Asn1Object {}

impl Decoder<Ber, Asn1Object> for Ber {
    type Error = Error;

    fn decode(&self) -> Result<Asn1Object, Error> {
        let mut elements = Vec::new();
        for tlv in self.elements() {
            let element = Element::try_from(tlv)?;
            elements.push(element);
        }
        Ok(Asn1Object { elements })
    }
}

impl EncodableTo<Asn1Object> for Ber {}

impl Encoder<Asn1Object, Ber> for Asn1Object {
    type Error = Error;

    fn encode(&self) -> Result<Ber, Self::Error> {
        let mut tlvs = Vec::new();
        for element in &self.elements {
            tlvs.push(element.encode()?);
        }
        Ok(Ber::new(tlvs))
    }
}

/// One typed ASN.1 value.
///
/// This is the closed set of native forms the codec produces and
/// consumes. Tags outside the set survive as `Unimplemented` carrying
/// their raw TLV node, so an unknown value re-encodes byte-for-byte
/// instead of being dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Boolean(bool),
    Integer(Integer),
    Enumerated(Integer),
    BitString(BitString),
    OctetString(OctetString),
    Null,
    ObjectIdentifier(ObjectIdentifier),
    Utf8String(String),
    NumericString(String),
    PrintableString(String),
    TeletexString(String),
    VideotexString(String),
    IA5String(String),
    GraphicString(String),
    VisibleString(String),
    GeneralString(String),
    BMPString(String),
    UniversalString(String),
    UTCTime(NaiveDateTime),
    GeneralizedTime(NaiveDateTime),
    Sequence(Vec<Element>),
    Set(Vec<Element>),
    ContextSpecific {
        slot: u64,
        constructed: bool,
        elements: Vec<Element>,
    },
    Unimplemented(Tlv),
}

impl TryFrom<&Tlv> for Element {
    type Error = Error;

    fn try_from(tlv: &Tlv) -> Result<Self, Self::Error> {
        match tlv.tag().class {
            Class::Universal => universal_from_tlv(tlv),
            Class::ContextSpecific => context_from_tlv(tlv),
            Class::Application | Class::Private => Ok(Element::Unimplemented(tlv.clone())),
        }
    }
}

fn universal_from_tlv(tlv: &Tlv) -> Result<Element, Error> {
    let universal = match tlv.tag().universal_tag() {
        Some(universal) => universal,
        None => return Ok(Element::Unimplemented(tlv.clone())),
    };
    match universal {
        UniversalTag::Boolean => match tlv.data().and_then(|d| d.first()) {
            Some(0x00) => Ok(Element::Boolean(false)),
            Some(_) => Ok(Element::Boolean(true)),
            None => Err(Error::InvalidBoolean),
        },
        UniversalTag::Integer => {
            let data = tlv.data().filter(|d| !d.is_empty()).ok_or(Error::IntegerNoData)?;
            Ok(Element::Integer(Integer::from(data)))
        }
        UniversalTag::Enumerated => {
            let data = tlv.data().filter(|d| !d.is_empty()).ok_or(Error::IntegerNoData)?;
            Ok(Element::Enumerated(Integer::from(data)))
        }
        UniversalTag::BitString => {
            let data = tlv.data().ok_or(Error::BitStringNoData)?;
            Ok(Element::BitString(BitString::try_from(data)?))
        }
        UniversalTag::OctetString => Ok(Element::OctetString(OctetString::from(
            tlv.data().unwrap_or(&[]),
        ))),
        UniversalTag::Null => Ok(Element::Null),
        UniversalTag::ObjectIdentifier => {
            let data = tlv.data().ok_or(Error::ObjectIdentifierNoData)?;
            Ok(Element::ObjectIdentifier(ObjectIdentifier::try_from(data)?))
        }
        UniversalTag::Utf8String => Ok(Element::Utf8String(string_from(tlv, Charset::Utf8)?)),
        UniversalTag::NumericString => Ok(Element::NumericString(string_from(tlv, Charset::Ascii)?)),
        UniversalTag::PrintableString => {
            Ok(Element::PrintableString(string_from(tlv, Charset::Ascii)?))
        }
        UniversalTag::TeletexString => Ok(Element::TeletexString(string_from(tlv, Charset::Ascii)?)),
        UniversalTag::VideotexString => {
            Ok(Element::VideotexString(string_from(tlv, Charset::Ascii)?))
        }
        UniversalTag::Ia5String => Ok(Element::IA5String(string_from(tlv, Charset::Ascii)?)),
        UniversalTag::GraphicString => Ok(Element::GraphicString(string_from(tlv, Charset::Ascii)?)),
        UniversalTag::VisibleString => Ok(Element::VisibleString(string_from(tlv, Charset::Ascii)?)),
        UniversalTag::GeneralString => Ok(Element::GeneralString(string_from(tlv, Charset::Ascii)?)),
        UniversalTag::BmpString => Ok(Element::BMPString(string_from(tlv, Charset::Utf16)?)),
        UniversalTag::UniversalString => {
            Ok(Element::UniversalString(string_from(tlv, Charset::Utf32)?))
        }
        UniversalTag::UtcTime => {
            let data = tlv.data().ok_or(Error::UtcTimeNoData)?;
            Ok(Element::UTCTime(time::parse_utc_time(data)?))
        }
        UniversalTag::GeneralizedTime => {
            let data = tlv.data().ok_or(Error::GeneralizedTimeNoData)?;
            Ok(Element::GeneralizedTime(time::parse_generalized_time(data)?))
        }
        UniversalTag::Sequence => {
            let mut elements = Vec::new();
            for sub_tlv in tlv.tlvs().unwrap_or(&[]) {
                elements.push(Element::try_from(sub_tlv)?);
            }
            Ok(Element::Sequence(elements))
        }
        UniversalTag::Set => {
            let mut elements = Vec::new();
            for sub_tlv in tlv.tlvs().unwrap_or(&[]) {
                elements.push(Element::try_from(sub_tlv)?);
            }
            Ok(Element::Set(elements))
        }
        UniversalTag::EndOfContents | UniversalTag::Unimplemented(_) => {
            Ok(Element::Unimplemented(tlv.clone()))
        }
    }
}

fn context_from_tlv(tlv: &Tlv) -> Result<Element, Error> {
    let slot = tlv.tag().number;
    if tlv.tag().constructed {
        let mut elements = Vec::new();
        for sub_tlv in tlv.tlvs().unwrap_or(&[]) {
            elements.push(Element::try_from(sub_tlv)?);
        }
        Ok(Element::ContextSpecific {
            slot,
            constructed: true,
            elements,
        })
    } else {
        // IMPLICIT tagging: keep the raw payload for the schema layer
        // to reinterpret under its declared inner type
        let data = tlv.data().unwrap_or(&[]);
        Ok(Element::ContextSpecific {
            slot,
            constructed: false,
            elements: vec![Element::OctetString(OctetString::from(data))],
        })
    }
}

fn string_from(tlv: &Tlv, charset: Charset) -> Result<String, Error> {
    charset::encode(tlv.data().unwrap_or(&[]), charset).map_err(Error::Charset)
}

impl TryFrom<&Element> for Tlv {
    type Error = Error;

    fn try_from(element: &Element) -> Result<Self, Self::Error> {
        match element {
            Element::Boolean(b) => Ok(primitive(
                UniversalTag::Boolean,
                vec![if *b { 0xFF } else { 0x00 }],
            )),
            Element::Integer(i) => Ok(primitive(UniversalTag::Integer, i.to_signed_bytes_be())),
            Element::Enumerated(i) => {
                Ok(primitive(UniversalTag::Enumerated, i.to_signed_bytes_be()))
            }
            Element::BitString(bs) => Ok(primitive(
                UniversalTag::BitString,
                Vec::from(bs.clone()),
            )),
            Element::OctetString(os) => {
                Ok(primitive(UniversalTag::OctetString, os.as_bytes().to_vec()))
            }
            Element::Null => Ok(primitive(UniversalTag::Null, vec![])),
            Element::ObjectIdentifier(oid) => Ok(primitive(
                UniversalTag::ObjectIdentifier,
                Vec::try_from(oid.clone())?,
            )),
            Element::Utf8String(s) => Ok(primitive(
                UniversalTag::Utf8String,
                charset::decode(s, Charset::Utf8),
            )),
            Element::NumericString(s) => Ok(primitive(
                UniversalTag::NumericString,
                charset::decode(s, Charset::Ascii),
            )),
            Element::PrintableString(s) => Ok(primitive(
                UniversalTag::PrintableString,
                charset::decode(s, Charset::Ascii),
            )),
            Element::TeletexString(s) => Ok(primitive(
                UniversalTag::TeletexString,
                charset::decode(s, Charset::Ascii),
            )),
            Element::VideotexString(s) => Ok(primitive(
                UniversalTag::VideotexString,
                charset::decode(s, Charset::Ascii),
            )),
            Element::IA5String(s) => Ok(primitive(
                UniversalTag::Ia5String,
                charset::decode(s, Charset::Ascii),
            )),
            Element::GraphicString(s) => Ok(primitive(
                UniversalTag::GraphicString,
                charset::decode(s, Charset::Ascii),
            )),
            Element::VisibleString(s) => Ok(primitive(
                UniversalTag::VisibleString,
                charset::decode(s, Charset::Ascii),
            )),
            Element::GeneralString(s) => Ok(primitive(
                UniversalTag::GeneralString,
                charset::decode(s, Charset::Ascii),
            )),
            Element::BMPString(s) => Ok(primitive(
                UniversalTag::BmpString,
                charset::decode(s, Charset::Utf16),
            )),
            Element::UniversalString(s) => Ok(primitive(
                UniversalTag::UniversalString,
                charset::decode(s, Charset::Utf32),
            )),
            Element::UTCTime(dt) => Ok(primitive(
                UniversalTag::UtcTime,
                dt.format("%y%m%d%H%M%SZ").to_string().into_bytes(),
            )),
            Element::GeneralizedTime(dt) => Ok(primitive(
                UniversalTag::GeneralizedTime,
                dt.format("%Y%m%d%H%M%SZ").to_string().into_bytes(),
            )),
            Element::Sequence(elements) => {
                let tlvs = elements
                    .iter()
                    .map(Tlv::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Tlv::new_constructed(
                    Tag::constructed(UniversalTag::Sequence),
                    tlvs,
                ))
            }
            Element::Set(elements) => {
                let tlvs = elements
                    .iter()
                    .map(Tlv::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Tlv::new_constructed(
                    Tag::constructed(UniversalTag::Set),
                    tlvs,
                ))
            }
            Element::ContextSpecific {
                slot,
                constructed,
                elements,
            } => {
                if *constructed {
                    let tlvs = elements
                        .iter()
                        .map(Tlv::try_from)
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Tlv::new_constructed(Tag::context(*slot, true), tlvs))
                } else {
                    // IMPLICIT tagging: re-tag the single inner element's
                    // payload under the context tag
                    if elements.len() != 1 {
                        return Err(Error::InvalidContextSpecific {
                            slot: *slot,
                            msg: "implicit tagging requires exactly one inner element".to_string(),
                        });
                    }
                    match &elements[0] {
                        Element::OctetString(os) => Ok(Tlv::new_primitive(
                            Tag::context(*slot, false),
                            os.as_bytes().to_vec(),
                        )),
                        inner => {
                            let inner_tlv = Tlv::try_from(inner)?;
                            match inner_tlv.data() {
                                Some(data) => Ok(Tlv::new_primitive(
                                    Tag::context(*slot, false),
                                    data.to_vec(),
                                )),
                                None => Err(Error::InvalidContextSpecific {
                                    slot: *slot,
                                    msg: "implicit tagging requires a primitive inner element"
                                        .to_string(),
                                }),
                            }
                        }
                    }
                }
            }
            Element::Unimplemented(tlv) => Ok(tlv.clone()),
        }
    }
}

fn primitive(tag: UniversalTag, data: Vec<u8>) -> Tlv {
    Tlv::new_primitive(Tag::universal(tag), data)
}

impl EncodableTo<Element> for Tlv {}

impl Encoder<Element, Tlv> for Element {
    type Error = Error;

    fn encode(&self) -> Result<Tlv, Self::Error> {
        Tlv::try_from(self)
    }
}

impl Element {
    /// Classifies untyped text into an element, in this fixed order:
    /// empty → NULL; signed `0x` hex → INTEGER; dotted digits → OBJECT
    /// IDENTIFIER; only `0`/`1` → BIT STRING; `true`/`false` → BOOLEAN;
    /// only hex digits → OCTET STRING; every char below U+0100 →
    /// PrintableString; anything else → UTF8String.
    pub fn classify(s: &str) -> Element {
        if s.is_empty() {
            return Element::Null;
        }
        if matches_pattern(r"^-?0x[0-9a-fA-F]+$", s) {
            return Element::Integer(Integer::from_signed_hex(s));
        }
        if matches_pattern(r"^(\d+\.)+\d+$", s) {
            if let Ok(oid) = ObjectIdentifier::from_str(s) {
                return Element::ObjectIdentifier(oid);
            }
        }
        if matches_pattern(r"^[01]+$", s) {
            return Element::BitString(BitString::from_bits(s));
        }
        if s == "true" || s == "false" {
            return Element::Boolean(s == "true");
        }
        if matches_pattern(r"^[0-9a-fA-F]+$", s) {
            return Element::OctetString(OctetString::from(encoding::hex::decode(
                s,
                encoding::Endian::Big,
            )));
        }
        if s.chars().all(|c| (c as u32) < 0x100) {
            Element::PrintableString(s.to_string())
        } else {
            Element::Utf8String(s.to_string())
        }
    }

    /// Serializes this element under the given ruleset.
    pub fn to_bytes(&self, ruleset: Ruleset) -> Result<Vec<u8>, Error> {
        Ok(Tlv::try_from(self)?.to_bytes(ruleset))
    }

    /// Parses one element from a complete buffer.
    pub fn from_bytes(data: &[u8]) -> Result<Element, Error> {
        let ber = Ber::from_bytes(data).map_err(Error::FailedToDecodeBer)?;
        match ber.elements().first() {
            Some(tlv) => Element::try_from(tlv),
            None => Ok(Element::Null),
        }
    }
}

fn matches_pattern(pattern: &str, s: &str) -> bool {
    regex::Regex::new(pattern)
        .map(|re| re.is_match(s))
        .unwrap_or(false)
}

impl Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Element::Boolean(b) => write!(f, "Boolean({})", b),
            Element::Integer(i) => write!(f, "Integer({})", i),
            Element::Enumerated(i) => write!(f, "Enumerated({})", i),
            Element::BitString(bs) => write!(f, "BitString({})", bs),
            Element::OctetString(os) => write!(f, "OctetString({})", os),
            Element::Null => write!(f, "Null"),
            Element::ObjectIdentifier(oid) => write!(f, "ObjectIdentifier({})", oid),
            Element::Utf8String(s) => write!(f, "UTF8String({})", s),
            Element::NumericString(s) => write!(f, "NumericString({})", s),
            Element::PrintableString(s) => write!(f, "PrintableString({})", s),
            Element::TeletexString(s) => write!(f, "TeletexString({})", s),
            Element::VideotexString(s) => write!(f, "VideotexString({})", s),
            Element::IA5String(s) => write!(f, "IA5String({})", s),
            Element::GraphicString(s) => write!(f, "GraphicString({})", s),
            Element::VisibleString(s) => write!(f, "VisibleString({})", s),
            Element::GeneralString(s) => write!(f, "GeneralString({})", s),
            Element::BMPString(s) => write!(f, "BMPString({})", s),
            Element::UniversalString(s) => write!(f, "UniversalString({})", s),
            Element::UTCTime(dt) => write!(f, "UTCTime({})", dt),
            Element::GeneralizedTime(dt) => write!(f, "GeneralizedTime({})", dt),
            Element::Sequence(seq) => write!(f, "Sequence({:?})", seq),
            Element::Set(set) => write!(f, "Set({:?})", set),
            Element::ContextSpecific {
                slot,
                constructed,
                elements,
            } => write!(
                f,
                "ContextSpecific(slot: {}, constructed: {}, elements: {:?})",
                slot, constructed, elements
            ),
            Element::Unimplemented(tlv) => write!(f, "Unimplemented({:?})", tlv),
        }
    }
}

// ASN.1 INTEGER can be a positive or negative value of arbitrary size.
// One BigInt-backed representation covers both the small range callers
// usually want (see the to_* accessors) and the multi-hundred-bit values
// that show up in key material.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Integer {
    inner: BigInt,
}

impl Integer {
    /// Returns a reference to the inner BigInt
    pub fn as_bigint(&self) -> &BigInt {
        &self.inner
    }

    /// The minimal two's-complement big-endian byte form
    pub fn to_signed_bytes_be(&self) -> Vec<u8> {
        self.inner.to_signed_bytes_be()
    }

    /// Parses the `0x`/`-0x` signed hex text form
    pub fn from_signed_hex(s: &str) -> Self {
        Integer::from(encoding::bigint::decode(s))
    }

    /// The `0x`/`-0x` signed hex text form
    pub fn to_signed_hex(&self) -> String {
        encoding::bigint::encode(&self.inner.to_signed_bytes_be())
    }

    /// Converts the Integer to u32 if it fits in the range
    pub fn to_u32(&self) -> Option<u32> {
        self.inner.to_u32()
    }

    /// Converts the Integer to i32 if it fits in the range
    pub fn to_i32(&self) -> Option<i32> {
        self.inner.to_i32()
    }

    /// Converts the Integer to i64 if it fits in the range
    pub fn to_i64(&self) -> Option<i64> {
        self.inner.to_i64()
    }

    /// Converts the Integer to u64 if it fits in the range
    pub fn to_u64(&self) -> Option<u64> {
        self.inner.to_u64()
    }
}

impl Serialize for Integer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.inner.to_string())
    }
}

impl<'de> Deserialize<'de> for Integer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let inner = s.parse::<BigInt>().map_err(serde::de::Error::custom)?;
        Ok(Integer { inner })
    }
}

impl From<BigInt> for Integer {
    fn from(value: BigInt) -> Self {
        Integer { inner: value }
    }
}

impl From<i64> for Integer {
    fn from(value: i64) -> Self {
        Integer {
            inner: BigInt::from(value),
        }
    }
}

impl From<&[u8]> for Integer {
    fn from(value: &[u8]) -> Self {
        Integer {
            inner: BigInt::from_signed_bytes_be(value),
        }
    }
}

impl From<Vec<u8>> for Integer {
    fn from(value: Vec<u8>) -> Self {
        Integer {
            inner: BigInt::from_signed_bytes_be(&value),
        }
    }
}

impl TryFrom<&Integer> for i64 {
    type Error = Error;

    fn try_from(value: &Integer) -> Result<Self, Self::Error> {
        value.inner.to_i64().ok_or(Error::IntegerOutOfRangeI64)
    }
}

impl TryFrom<&Integer> for u64 {
    type Error = Error;

    fn try_from(value: &Integer) -> Result<Self, Self::Error> {
        value.inner.to_u64().ok_or(Error::IntegerOutOfRangeU64)
    }
}

impl Display for Integer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

/// An object identifier as its sequence of arcs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdentifier {
    inner: Vec<u64>,
}

impl ObjectIdentifier {
    pub fn arcs(&self) -> &[u64] {
        &self.inner
    }
}

impl Serialize for ObjectIdentifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ObjectIdentifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ObjectIdentifier::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<Vec<u8>> for ObjectIdentifier {
    type Error = Error;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::try_from(value.as_slice())
    }
}

impl TryFrom<&[u8]> for ObjectIdentifier {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(Error::ObjectIdentifierNoData);
        }

        let mut arcs = Vec::new();
        let mut val = 0u64;
        let mut pending = false;
        let mut first_done = false;
        for b in value {
            if val > u64::MAX >> 7 {
                return Err(Error::ObjectIdentifierArcOverflow);
            }
            val = (val << 7) | (*b & 0x7F) as u64;
            if *b & 0x80 != 0 {
                pending = true;
                continue;
            }
            if first_done {
                arcs.push(val);
            } else {
                // the first group folds the two leading arcs together
                let m = if val < 40 {
                    0
                } else if val < 80 {
                    1
                } else {
                    2
                };
                arcs.push(m);
                arcs.push(val - m * 40);
                first_done = true;
            }
            val = 0;
            pending = false;
        }
        if pending {
            return Err(Error::ObjectIdentifierIncompleteEncoding);
        }

        Ok(ObjectIdentifier { inner: arcs })
    }
}

impl TryFrom<ObjectIdentifier> for Vec<u8> {
    type Error = Error;

    fn try_from(oid: ObjectIdentifier) -> Result<Self, Self::Error> {
        if oid.inner.len() < 2 {
            return Err(Error::ObjectIdentifierTooFewComponents);
        }

        let first = oid.inner[0]
            .checked_mul(40)
            .and_then(|v| v.checked_add(oid.inner[1]))
            .ok_or(Error::ObjectIdentifierArcOverflow)?;

        let mut result = Vec::new();
        push_base128(&mut result, first);
        for v in oid.inner[2..].iter() {
            push_base128(&mut result, *v);
        }

        Ok(result)
    }
}

fn push_base128(out: &mut Vec<u8>, mut value: u64) {
    let mut groups = Vec::new();
    loop {
        groups.push((value & 0x7F) as u8);
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    while let Some(b) = groups.pop() {
        if groups.is_empty() {
            out.push(b);
        } else {
            out.push(b | 0x80);
        }
    }
}

impl Display for ObjectIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self.inner.first() {
            Some(n) => self.inner[1..]
                .iter()
                .fold(n.to_string(), |s, n| s + "." + &n.to_string()),
            None => String::new(),
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ObjectIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::ObjectIdentifierEmptyString);
        }
        let arcs = s
            .split('.')
            .map(|part| part.parse::<u64>().map_err(Error::ParseInt))
            .collect::<Result<Vec<u64>, Error>>()?;
        Ok(ObjectIdentifier { inner: arcs })
    }
}

impl PartialEq<&str> for ObjectIdentifier {
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

impl PartialEq<ObjectIdentifier> for &str {
    fn eq(&self, other: &ObjectIdentifier) -> bool {
        *self == other.to_string()
    }
}

/// Trait for types that can be converted to an ObjectIdentifier
pub trait AsOid {
    fn as_oid(&self) -> Result<ObjectIdentifier, Error>;
}

impl AsOid for ObjectIdentifier {
    fn as_oid(&self) -> Result<ObjectIdentifier, Error> {
        Ok(self.clone())
    }
}

impl AsOid for &str {
    fn as_oid(&self) -> Result<ObjectIdentifier, Error> {
        ObjectIdentifier::from_str(self)
    }
}

impl AsOid for String {
    fn as_oid(&self) -> Result<ObjectIdentifier, Error> {
        self.as_str().as_oid()
    }
}

/// A BIT STRING: packed bits plus the count of unused bits in the last
/// byte. One representation serves both views: `as_bytes` for payloads
/// like key material and the `Display`/[`BitString::bits`] bit-pattern
/// text for flag sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitString {
    unused: u8,
    data: Vec<u8>,
}

impl BitString {
    /// Creates a new BitString with the specified number of unused bits and data
    pub fn new(unused: u8, data: Vec<u8>) -> Self {
        BitString { unused, data }
    }

    /// Packs bit-pattern text like `"101"` from the high bit down.
    pub fn from_bits(s: &str) -> Self {
        let len = s.len();
        let unused = ((8 - len % 8) % 8) as u8;
        let mut data = vec![0u8; len.div_ceil(8)];
        for (i, c) in s.chars().enumerate() {
            if c == '1' {
                data[i / 8] |= 0x80 >> (i % 8);
            }
        }
        BitString { unused, data }
    }

    /// Returns the number of unused bits in the last byte
    pub fn unused_bits(&self) -> u8 {
        self.unused
    }

    /// Returns a reference to the underlying byte data
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the BitString and returns the underlying byte data
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// The bit-pattern text form, e.g. `"101"`.
    pub fn bits(&self) -> String {
        self.to_string()
    }

    /// Returns the total number of bits (excluding unused bits)
    pub fn bit_len(&self) -> usize {
        if self.data.is_empty() {
            0
        } else {
            self.data.len() * 8 - self.unused as usize
        }
    }
}

impl Serialize for BitString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            use serde::ser::SerializeStruct;
            let mut state = serializer.serialize_struct("BitString", 2)?;
            state.serialize_field("bit_length", &self.bit_len())?;

            let hex_string = self
                .data
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect::<Vec<_>>()
                .join(":");
            state.serialize_field("bits", &hex_string)?;

            state.end()
        } else {
            (self.unused, &self.data).serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for BitString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let _ = String::deserialize(deserializer)?;
            Err(serde::de::Error::custom(
                "BitString deserialization from bit string not supported",
            ))
        } else {
            let (unused, data) = <(u8, Vec<u8>)>::deserialize(deserializer)?;
            Ok(BitString { unused, data })
        }
    }
}

impl AsRef<[u8]> for BitString {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl TryFrom<Vec<u8>> for BitString {
    type Error = Error;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::try_from(value.as_slice())
    }
}

impl TryFrom<&[u8]> for BitString {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        match value.first() {
            Some(&unused) => {
                if unused > 7 {
                    return Err(Error::BitStringUnusedBitsOutOfRange(unused));
                }
                Ok(BitString {
                    unused,
                    data: value[1..].to_vec(),
                })
            }
            None => Err(Error::BitStringNoData),
        }
    }
}

impl From<BitString> for Vec<u8> {
    fn from(value: BitString) -> Self {
        let mut result = Vec::with_capacity(value.data.len() + 1);
        result.push(value.unused);
        result.extend(value.data);
        result
    }
}

impl Display for BitString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut result = String::new();

        for (i, byte) in self.data.iter().enumerate() {
            if i == self.data.len() - 1 && self.unused > 0 {
                let valid_bits = byte >> self.unused;
                let bit_count = 8 - self.unused as usize;
                result.push_str(&format!(
                    "{:0bit_count$b}",
                    valid_bits,
                    bit_count = bit_count
                ));
            } else {
                result.push_str(&format!("{:08b}", byte));
            }
        }

        write!(f, "{}", result)
    }
}

/// An OCTET STRING payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OctetString {
    inner: Vec<u8>,
}

impl OctetString {
    /// Returns the inner bytes as a slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Consumes self and returns the inner bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.inner
    }
}

impl Serialize for OctetString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&encoding::hex::encode(&self.inner, encoding::Endian::Big))
        } else {
            self.inner.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for OctetString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let hex_string = String::deserialize(deserializer)?;
            Ok(OctetString {
                inner: encoding::hex::decode(&hex_string, encoding::Endian::Big),
            })
        } else {
            let inner = Vec::<u8>::deserialize(deserializer)?;
            Ok(OctetString { inner })
        }
    }
}

impl TryFrom<&OctetString> for Asn1Object {
    type Error = Error;

    fn try_from(value: &OctetString) -> Result<Self, Self::Error> {
        let ber = Ber::from_bytes(value.as_ref()).map_err(Error::FailedToDecodeBer)?;
        ber.decode()
    }
}

impl AsRef<[u8]> for OctetString {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}

impl From<Vec<u8>> for OctetString {
    fn from(value: Vec<u8>) -> Self {
        OctetString { inner: value }
    }
}

impl From<&[u8]> for OctetString {
    fn from(value: &[u8]) -> Self {
        OctetString {
            inner: value.to_vec(),
        }
    }
}

impl Display for OctetString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            encoding::hex::encode(&self.inner, encoding::Endian::Big)
        )
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDateTime;
    use num_bigint::BigInt;
    use rstest::rstest;

    use ber::{Ber, Ruleset, Tag, Tlv, UniversalTag};
    use kumiki::decoder::Decoder;
    use kumiki::encoder::Encoder;

    use crate::{Asn1Object, BitString, Element, Integer, ObjectIdentifier, OctetString};

    #[rstest(input, expected, case(vec![0x01], "1"), case(vec![0x03, 0xd4, 0x15, 0x31, 0x8e, 0x2c, 0x57, 0x1d, 0x29, 0x05, 0xfc, 0x3e, 0x05, 0x27, 0x68, 0x9d, 0x0d, 0x09], "333504890676592408951587385614406537514249"))]
    fn test_integer_from_bytes(input: Vec<u8>, expected: &str) {
        let expected = Integer::from(BigInt::from_str(expected).unwrap());
        assert_eq!(expected, Integer::from(input.as_slice()));
    }

    #[rstest(
        value,
        expected,
        // the top-bit padding boundary
        case(127, vec![0x7f]),
        case(128, vec![0x00, 0x80]),
        case(-128, vec![0x80]),
        case(-129, vec![0xff, 0x7f]),
        case(0, vec![0x00]),
        case(-1, vec![0xff])
    )]
    fn test_integer_wire_form(value: i64, expected: Vec<u8>) {
        let tlv = Tlv::try_from(&Element::Integer(Integer::from(value))).unwrap();
        assert_eq!(Some(expected.as_slice()), tlv.data());
    }

    #[rstest(
        input,
        expected_json,
        case(Integer::from(0), r#""0""#),
        case(Integer::from(255), r#""255""#),
        case(Integer::from(-1), r#""-1""#),
        case(Integer::from(BigInt::from_str("333504890676592408951587385614406537514249").unwrap()), r#""333504890676592408951587385614406537514249""#)
    )]
    fn test_integer_serialize(input: Integer, expected_json: &str) {
        let json = serde_json::to_string(&input).unwrap();
        assert_eq!(expected_json, json);
    }

    #[rstest(
        input,
        case(Integer::from(0)),
        case(Integer::from(255)),
        case(Integer::from(-1)),
        case(Integer::from(BigInt::from_str("12345678901234567890").unwrap()))
    )]
    fn test_integer_serde_roundtrip(input: Integer) {
        let json = serde_json::to_string(&input).unwrap();
        let deserialized: Integer = serde_json::from_str(&json).unwrap();
        assert_eq!(input, deserialized);
    }

    #[rstest(input, expected, case("0x7f", 127), case("-0x80", -128), case("0x80", 128))]
    fn test_integer_signed_hex(input: &str, expected: i64) {
        let integer = Integer::from_signed_hex(input);
        assert_eq!(Some(expected), integer.to_i64());
        assert_eq!(input, integer.to_signed_hex());
    }

    #[rstest(input, expected, case(ObjectIdentifier { inner: vec![1, 2, 3, 4]}, "1.2.3.4"))]
    fn test_object_identifier_to_string(input: ObjectIdentifier, expected: &str) {
        assert_eq!(expected, input.to_string());
    }

    #[rstest(input, expected, case("1.2.3.4", ObjectIdentifier { inner: vec![1, 2, 3, 4]}))]
    fn test_object_identifier_from_string(input: &str, expected: ObjectIdentifier) {
        assert_eq!(expected, ObjectIdentifier::from_str(input).unwrap());
    }

    #[rstest(input, expected,
        // the first byte 0x2A folds the two leading arcs: 1.2
        case(vec![0x2A], ObjectIdentifier { inner: vec![1, 2] }),
        case(vec![0x2B, 0x06, 0x01, 0x04, 0x01], ObjectIdentifier { inner: vec![1, 3, 6, 1, 4, 1] }),
        case(vec![0x09, 0x92, 0x26, 0x89, 0x93, 0xf2, 0x2c, 0x64, 0x01, 0x01], ObjectIdentifier { inner: vec![0, 9, 2342, 19200300, 100, 1, 1] }),
        case(vec![0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D], ObjectIdentifier { inner: vec![1, 2, 840, 113549] }),
        case(vec![0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x05], ObjectIdentifier { inner: vec![1, 2, 840, 113549, 1, 1, 5] }),
        // a first group of 80 or more belongs to the joint arc 2
        case(vec![0x81, 0x34, 0x03], ObjectIdentifier { inner: vec![2, 100, 3] }),
    )]
    fn test_object_identifier_from_bytes(input: Vec<u8>, expected: ObjectIdentifier) {
        assert_eq!(expected, ObjectIdentifier::try_from(input).unwrap());
    }

    #[rstest(input, expected,
        case(ObjectIdentifier { inner: vec![1, 2] }, vec![0x2A]),
        case(ObjectIdentifier { inner: vec![1, 3, 6, 1, 4, 1] }, vec![0x2B, 0x06, 0x01, 0x04, 0x01]),
        case(ObjectIdentifier { inner: vec![0, 9, 2342, 19200300, 100, 1, 1] }, vec![0x09, 0x92, 0x26, 0x89, 0x93, 0xf2, 0x2c, 0x64, 0x01, 0x01]),
        case(ObjectIdentifier { inner: vec![1, 2, 840, 113549] }, vec![0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D]),
        case(ObjectIdentifier { inner: vec![2, 100, 3] }, vec![0x81, 0x34, 0x03]),
    )]
    fn test_object_identifier_to_bytes(input: ObjectIdentifier, expected: Vec<u8>) {
        assert_eq!(expected, Vec::<u8>::try_from(input).unwrap());
    }

    #[test]
    fn test_object_identifier_incomplete_encoding() {
        // trailing continuation bit with no final byte
        let err = ObjectIdentifier::try_from(vec![0x2A, 0x86]).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::ObjectIdentifierIncompleteEncoding
        ));
    }

    #[test]
    fn test_object_identifier_roundtrip_through_element() {
        let text = "1.2.840.113549.1.1.1";
        let element = Element::ObjectIdentifier(ObjectIdentifier::from_str(text).unwrap());
        let bytes = element.to_bytes(Ruleset::Der).unwrap();
        let decoded = Element::from_bytes(&bytes).unwrap();
        match decoded {
            Element::ObjectIdentifier(oid) => assert_eq!(text, oid.to_string()),
            other => panic!("expected ObjectIdentifier, got {}", other),
        }
    }

    #[rstest(input, expected,
        case(BitString::new(0, vec![0b10101010]), "10101010"),
        case(BitString::new(0, vec![0b10101010, 0b11001100]), "1010101011001100"),
        case(BitString::new(2, vec![0b10101010, 0b11001100]), "10101010110011"),
        case(BitString::new(0, vec![]), ""),
        case(BitString::new(4, vec![0b10100000]), "1010")
    )]
    fn test_bitstring_to_string(input: BitString, expected: &str) {
        assert_eq!(expected, input.to_string());
    }

    #[test]
    fn test_bitstring_from_bits_packs_high_first() {
        let bs = BitString::from_bits("101");
        assert_eq!(5, bs.unused_bits());
        assert_eq!(&[0xA0], bs.as_bytes());
        assert_eq!("101", bs.bits());
        // wire content carries the unused-bit count first
        let tlv = Tlv::try_from(&Element::BitString(bs)).unwrap();
        assert_eq!(Some([0x05, 0xA0].as_slice()), tlv.data());
    }

    #[test]
    fn test_bitstring_unused_bits_out_of_range() {
        let err = BitString::try_from(vec![0x08, 0xff]).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::BitStringUnusedBitsOutOfRange(0x08)
        ));
    }

    #[rstest(input, expected,
        case(OctetString::from(vec![0x01]), "01"),
        case(OctetString::from(vec![0x01, 0x02, 0x03]), "010203"),
        case(OctetString::from(vec![]), ""),
        case(OctetString::from(vec![0x00, 0x7f, 0x80, 0xff]), "007f80ff")
    )]
    fn test_octetstring_to_string(input: OctetString, expected: &str) {
        assert_eq!(expected, input.to_string());
    }

    #[rstest(json_input, expected,
        case(r#""""#, OctetString::from(vec![])),
        case(r#""010203""#, OctetString::from(vec![0x01, 0x02, 0x03])),
        case(r#""FfAbCd""#, OctetString::from(vec![0xff, 0xab, 0xcd])),
    )]
    fn test_octetstring_deserialize(json_input: &str, expected: OctetString) {
        let octet_string: OctetString = serde_json::from_str(json_input).unwrap();
        assert_eq!(expected, octet_string);
    }

    #[rstest(
        input,
        case(Element::Null),
        case(Element::Boolean(true)),
        case(Element::Boolean(false)),
        case(Element::Integer(Integer::from(127))),
        case(Element::Integer(Integer::from(128))),
        case(Element::Integer(Integer::from(-128))),
        case(Element::BitString(BitString::from_bits("10111"))),
        case(Element::OctetString(OctetString::from(vec![0xde, 0xad, 0xbe, 0xef]))),
        case(Element::ObjectIdentifier(ObjectIdentifier::from_str("1.2.840.113549.1.1.1").unwrap())),
        case(Element::Utf8String("日本語".to_string())),
        case(Element::PrintableString("hello".to_string())),
        case(Element::IA5String("user@example.com".to_string())),
        case(Element::BMPString("😎".to_string())),
        case(Element::UniversalString("wide".to_string())),
        case(Element::UTCTime(NaiveDateTime::parse_from_str("2019-12-16 03:02:10", "%Y-%m-%d %H:%M:%S").unwrap())),
        case(Element::GeneralizedTime(NaiveDateTime::parse_from_str("2050-01-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap())),
        case(Element::Sequence(vec![Element::Integer(Integer::from(7)), Element::Null])),
        case(Element::Set(vec![Element::PrintableString("a".to_string())])),
        case(Element::ContextSpecific { slot: 0, constructed: true, elements: vec![Element::Integer(Integer::from(2))] }),
        case(Element::ContextSpecific { slot: 3, constructed: false, elements: vec![Element::OctetString(OctetString::from(vec![0x01, 0x02]))] })
    )]
    fn test_element_roundtrip_der(input: Element) {
        let bytes = input.to_bytes(Ruleset::Der).unwrap();
        let decoded = Element::from_bytes(&bytes).unwrap();
        assert_eq!(input, decoded);
    }

    #[rstest(
        input,
        case(Element::Sequence(vec![Element::Integer(Integer::from(7)), Element::Null])),
        case(Element::Sequence(vec![Element::Sequence(vec![Element::Boolean(true)])]))
    )]
    fn test_element_roundtrip_cer(input: Element) {
        let bytes = input.to_bytes(Ruleset::Cer).unwrap();
        let decoded = Element::from_bytes(&bytes).unwrap();
        assert_eq!(input, decoded);
    }

    #[test]
    fn test_boolean_decode_is_lenient_about_true_bytes() {
        let tlv = Tlv::new_primitive(Tag::universal(UniversalTag::Boolean), vec![0x01]);
        assert_eq!(Element::Boolean(true), Element::try_from(&tlv).unwrap());
    }

    #[rstest(
        input,
        expected,
        case("", Element::Null),
        case("0x7f", Element::Integer(Integer::from(127))),
        case("-0x80", Element::Integer(Integer::from(-128))),
        case("1.2.840.113549.1.1.1", Element::ObjectIdentifier(ObjectIdentifier { inner: vec![1, 2, 840, 113549, 1, 1, 1] })),
        case("101", Element::BitString(BitString::from_bits("101"))),
        case("true", Element::Boolean(true)),
        case("false", Element::Boolean(false)),
        case("deadbeef", Element::OctetString(OctetString::from(vec![0xde, 0xad, 0xbe, 0xef]))),
        case("hello world.", Element::PrintableString("hello world.".to_string())),
        case("héllo", Element::PrintableString("héllo".to_string())),
        case("日本語", Element::Utf8String("日本語".to_string()))
    )]
    fn test_classify(input: &str, expected: Element) {
        assert_eq!(expected, Element::classify(input));
    }

    #[test]
    fn test_unimplemented_element_reencodes() {
        let input = vec![0x47, 0x02, 0xca, 0xfe]; // application class 7
        let (_, tlv) = Tlv::parse(&input).unwrap();
        let element = Element::try_from(&tlv).unwrap();
        assert!(matches!(element, Element::Unimplemented(_)));
        let back = Tlv::try_from(&element).unwrap();
        assert_eq!(input, back.to_bytes(Ruleset::Der));
    }

    #[test]
    fn test_asn1_object_pipeline() {
        let bytes: Vec<u8> = vec![0x30, 0x06, 0x02, 0x01, 0x07, 0x01, 0x01, 0xff, 0x05, 0x00];
        let ber: Ber = bytes.decode().unwrap();
        let object: Asn1Object = ber.decode().unwrap();
        assert_eq!(2, object.elements().len());
        assert_eq!(
            Element::Sequence(vec![
                Element::Integer(Integer::from(7)),
                Element::Boolean(true)
            ]),
            object.elements()[0]
        );
        assert_eq!(Element::Null, object.elements()[1]);

        let encoded: Ber = object.encode().unwrap();
        assert_eq!(bytes, encoded.to_bytes(Ruleset::Der));
    }

    const TEST_PEM_CERT: &str = r"-----BEGIN CERTIFICATE-----
MIICLDCCAdKgAwIBAgIBADAKBggqhkjOPQQDAjB9MQswCQYDVQQGEwJCRTEPMA0G
A1UEChMGR251VExTMSUwIwYDVQQLExxHbnVUTFMgY2VydGlmaWNhdGUgYXV0aG9y
aXR5MQ8wDQYDVQQIEwZMZXV2ZW4xJTAjBgNVBAMTHEdudVRMUyBjZXJ0aWZpY2F0
ZSBhdXRob3JpdHkwHhcNMTEwNTIzMjAzODIxWhcNMTIxMjIyMDc0MTUxWjB9MQsw
CQYDVQQGEwJCRTEPMA0GA1UEChMGR251VExTMSUwIwYDVQQLExxHbnVUTFMgY2Vy
dGlmaWNhdGUgYXV0aG9yaXR5MQ8wDQYDVQQIEwZMZXV2ZW4xJTAjBgNVBAMTHEdu
dVRMUyBjZXJ0aWZpY2F0ZSBhdXRob3JpdHkwWTATBgcqhkjOPQIBBggqhkjOPQMB
BwNCAARS2I0jiuNn14Y2sSALCX3IybqiIJUvxUpj+oNfzngvj/Niyv2394BWnW4X
uQ4RTEiywK87WRcWMGgJB5kX/t2no0MwQTAPBgNVHRMBAf8EBTADAQH/MA8GA1Ud
DwEB/wQFAwMHBgAwHQYDVR0OBBYEFPC0gf6YEr+1KLlkQAPLzB9mTigDMAoGCCqG
SM49BAMCA0gAMEUCIDGuwD1KPyG+hRf88MeyMQcqOFZD0TbVleF+UsAGQ4enAiEA
l4wOuDwKQa+upc8GftXE2C//4mKANBC6It01gUaTIpo=
-----END CERTIFICATE-----";

    #[test]
    fn test_certificate_decodes_through_the_whole_pipeline() {
        let pem: pem::Pem = TEST_PEM_CERT.decode().unwrap();
        let bytes: Vec<u8> = pem.decode().unwrap();
        let ber: Ber = bytes.decode().unwrap();
        let object: Asn1Object = ber.decode().unwrap();
        assert_eq!(1, object.elements().len());
        match &object.elements()[0] {
            Element::Sequence(parts) => assert_eq!(3, parts.len()),
            other => panic!("expected certificate Sequence, got {}", other),
        }
        // a certificate re-encodes byte-for-byte under DER
        let encoded: Ber = object.encode().unwrap();
        assert_eq!(bytes, encoded.to_bytes(Ruleset::Der));
    }
}
