//! Leaf descriptors for the universal primitive types.

use std::sync::Arc;

use asn1::{BitString, Element, Integer, ObjectIdentifier, OctetString};
use ber::{Class, Tag, Tlv, UniversalTag};

use crate::error::Error;
use crate::registry::AlgorithmCatalog;
use crate::value::Value;
use crate::{Syntax, SyntaxRef};

/// Checks class and number against an expected universal tag. A failure
/// here is mismatch-class: CHOICE and OPTIONAL may recover from it.
pub(crate) fn expect_universal<'a>(
    tlv: Option<&'a Tlv>,
    tag: UniversalTag,
) -> Result<&'a Tlv, Error> {
    let tlv = tlv.ok_or(Error::Missing)?;
    if tlv.tag().class != Class::Universal || tlv.tag().number != u64::from(tag) {
        return Err(Error::TagMismatch {
            expected: format!("{:?}", tag),
            found: format!("{:?}", tlv.tag()),
        });
    }
    Ok(tlv)
}

pub(crate) fn required(value: Option<&Value>) -> Result<&Value, Error> {
    value.ok_or(Error::Missing)
}

/// NULL. Encodes regardless of the native value being present, the way
/// a fixed grammar slot does.
pub struct Null;

impl Syntax for Null {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        match value {
            None | Some(Value::Null) => Ok(Some(Tlv::try_from(&Element::Null)?)),
            Some(_) => Err(Error::ValueMismatch("NULL expects no value")),
        }
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        expect_universal(tlv, UniversalTag::Null)?;
        Ok(Some(Value::Null))
    }

    fn wire_tag(&self) -> Option<Tag> {
        Some(Tag::universal(UniversalTag::Null))
    }
}

pub struct Boolean;

impl Syntax for Boolean {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        match required(value)? {
            Value::Boolean(b) => Ok(Some(Tlv::try_from(&Element::Boolean(*b))?)),
            _ => Err(Error::ValueMismatch("BOOLEAN expects a boolean")),
        }
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        let tlv = expect_universal(tlv, UniversalTag::Boolean)?;
        match Element::try_from(tlv)? {
            Element::Boolean(b) => Ok(Some(Value::Boolean(b))),
            _ => Err(Error::ValueMismatch("not a boolean payload")),
        }
    }

    fn wire_tag(&self) -> Option<Tag> {
        Some(Tag::universal(UniversalTag::Boolean))
    }
}

/// INTEGER or ENUMERATED, optionally with a named-value substitution
/// table: the native form is then the symbolic name rather than the
/// number, and an unknown number decodes to absent.
pub struct IntegerSyntax {
    tag: UniversalTag,
    names: Vec<(String, i64)>,
}

impl IntegerSyntax {
    pub fn new(tag: UniversalTag) -> Self {
        IntegerSyntax {
            tag,
            names: Vec::new(),
        }
    }

    pub fn with_names(tag: UniversalTag, names: &[(&str, i64)]) -> Self {
        IntegerSyntax {
            tag,
            names: names
                .iter()
                .map(|(n, v)| (n.to_string(), *v))
                .collect(),
        }
    }

    fn element(&self, integer: Integer) -> Element {
        match self.tag {
            UniversalTag::Enumerated => Element::Enumerated(integer),
            _ => Element::Integer(integer),
        }
    }
}

impl Syntax for IntegerSyntax {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        let integer = match required(value)? {
            Value::Integer(i) => i.clone(),
            Value::Text(name) if !self.names.is_empty() => {
                let found = self
                    .names
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| Integer::from(*v));
                found.ok_or(Error::ValueMismatch("unknown named integer value"))?
            }
            _ => return Err(Error::ValueMismatch("INTEGER expects an integer")),
        };
        Ok(Some(Tlv::try_from(&self.element(integer))?))
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        let tlv = expect_universal(tlv, self.tag)?;
        let integer = match Element::try_from(tlv)? {
            Element::Integer(i) | Element::Enumerated(i) => i,
            _ => return Err(Error::ValueMismatch("not an integer payload")),
        };
        if self.names.is_empty() {
            return Ok(Some(Value::Integer(integer)));
        }
        let name = integer
            .to_i64()
            .and_then(|v| self.names.iter().find(|(_, n)| *n == v))
            .map(|(name, _)| Value::Text(name.clone()));
        // an unlisted number is absent, letting the caller fall through
        Ok(name)
    }

    fn wire_tag(&self) -> Option<Tag> {
        Some(Tag::universal(self.tag))
    }
}

pub struct OctetStringSyntax;

impl Syntax for OctetStringSyntax {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        match required(value)? {
            Value::Bytes(bytes) => Ok(Some(Tlv::try_from(&Element::OctetString(
                OctetString::from(bytes.clone()),
            ))?)),
            _ => Err(Error::ValueMismatch("OCTET STRING expects bytes")),
        }
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        let tlv = expect_universal(tlv, UniversalTag::OctetString)?;
        match Element::try_from(tlv)? {
            Element::OctetString(os) => Ok(Some(Value::Bytes(os.into_bytes()))),
            _ => Err(Error::ValueMismatch("not an octet string payload")),
        }
    }

    fn wire_tag(&self) -> Option<Tag> {
        Some(Tag::universal(UniversalTag::OctetString))
    }
}

/// BIT STRING, optionally as a named-flag mask: the native form is then
/// the list of set flag names, and trailing zero bits are trimmed on
/// encode.
pub struct BitStringSyntax {
    flags: Vec<(String, usize)>,
}

impl BitStringSyntax {
    pub fn new() -> Self {
        BitStringSyntax { flags: Vec::new() }
    }

    pub fn with_flags(flags: &[(&str, usize)]) -> Self {
        BitStringSyntax {
            flags: flags
                .iter()
                .map(|(n, bit)| (n.to_string(), *bit))
                .collect(),
        }
    }

    fn flag_name(&self, bit: usize) -> Option<&str> {
        self.flags
            .iter()
            .find(|(_, b)| *b == bit)
            .map(|(n, _)| n.as_str())
    }
}

impl Default for BitStringSyntax {
    fn default() -> Self {
        Self::new()
    }
}

impl Syntax for BitStringSyntax {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        let bits = match required(value)? {
            Value::Bits(bits) => bits.clone(),
            Value::List(names) if !self.flags.is_empty() => {
                let width = self
                    .flags
                    .iter()
                    .map(|(_, bit)| *bit + 1)
                    .max()
                    .unwrap_or(0);
                let mut pattern = vec!['0'; width];
                for name in names {
                    let Value::Text(name) = name else {
                        return Err(Error::ValueMismatch("flag names must be text"));
                    };
                    match self.flags.iter().find(|(n, _)| n == name) {
                        Some((_, bit)) => pattern[*bit] = '1',
                        None => return Err(Error::ValueMismatch("unknown flag name")),
                    }
                }
                while pattern.len() > 1 && pattern.last() == Some(&'0') {
                    pattern.pop();
                }
                BitString::from_bits(&pattern.into_iter().collect::<String>())
            }
            _ => return Err(Error::ValueMismatch("BIT STRING expects bits")),
        };
        Ok(Some(Tlv::try_from(&Element::BitString(bits))?))
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        let tlv = expect_universal(tlv, UniversalTag::BitString)?;
        let bits = match Element::try_from(tlv)? {
            Element::BitString(bits) => bits,
            _ => return Err(Error::ValueMismatch("not a bit string payload")),
        };
        if self.flags.is_empty() {
            return Ok(Some(Value::Bits(bits)));
        }
        let names = bits
            .bits()
            .chars()
            .enumerate()
            .filter(|(_, c)| *c == '1')
            .filter_map(|(i, _)| self.flag_name(i))
            .map(|name| Value::Text(name.to_string()))
            .collect();
        Ok(Some(Value::List(names)))
    }

    fn wire_tag(&self) -> Option<Tag> {
        Some(Tag::universal(UniversalTag::BitString))
    }
}

/// OBJECT IDENTIFIER, optionally resolving symbolic names through an
/// injected catalog: dotted text always works, a known name encodes to
/// its identifier, and a known identifier decodes to its name.
pub struct ObjectIdentifierSyntax {
    catalog: Option<Arc<dyn AlgorithmCatalog>>,
}

impl ObjectIdentifierSyntax {
    pub fn new() -> Self {
        ObjectIdentifierSyntax { catalog: None }
    }

    pub fn with_catalog(catalog: Arc<dyn AlgorithmCatalog>) -> Self {
        ObjectIdentifierSyntax {
            catalog: Some(catalog),
        }
    }
}

impl Default for ObjectIdentifierSyntax {
    fn default() -> Self {
        Self::new()
    }
}

impl Syntax for ObjectIdentifierSyntax {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        let oid = match required(value)? {
            Value::Oid(oid) => oid.clone(),
            Value::Text(text) => match text.parse::<ObjectIdentifier>() {
                Ok(oid) => oid,
                Err(_) => {
                    let resolved = self
                        .catalog
                        .as_ref()
                        .and_then(|c| c.identifier(text))
                        .and_then(|id| id.parse::<ObjectIdentifier>().ok());
                    resolved.ok_or(Error::ValueMismatch("unknown object identifier name"))?
                }
            },
            _ => return Err(Error::ValueMismatch("OBJECT IDENTIFIER expects an oid")),
        };
        Ok(Some(Tlv::try_from(&Element::ObjectIdentifier(oid))?))
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        let tlv = expect_universal(tlv, UniversalTag::ObjectIdentifier)?;
        match Element::try_from(tlv)? {
            Element::ObjectIdentifier(oid) => {
                if let Some(name) = self
                    .catalog
                    .as_ref()
                    .and_then(|c| c.name(&oid.to_string()))
                {
                    return Ok(Some(Value::Text(name)));
                }
                Ok(Some(Value::Oid(oid)))
            }
            _ => Err(Error::ValueMismatch("not an object identifier payload")),
        }
    }

    fn wire_tag(&self) -> Option<Tag> {
        Some(Tag::universal(UniversalTag::ObjectIdentifier))
    }
}

/// One of the character string types, selected by tag.
pub struct StringSyntax {
    tag: UniversalTag,
}

impl StringSyntax {
    pub fn new(tag: UniversalTag) -> Self {
        StringSyntax { tag }
    }

    fn element(&self, s: &str) -> Result<Element, Error> {
        let s = s.to_string();
        match self.tag {
            UniversalTag::Utf8String => Ok(Element::Utf8String(s)),
            UniversalTag::NumericString => Ok(Element::NumericString(s)),
            UniversalTag::PrintableString => Ok(Element::PrintableString(s)),
            UniversalTag::TeletexString => Ok(Element::TeletexString(s)),
            UniversalTag::VideotexString => Ok(Element::VideotexString(s)),
            UniversalTag::Ia5String => Ok(Element::IA5String(s)),
            UniversalTag::GraphicString => Ok(Element::GraphicString(s)),
            UniversalTag::VisibleString => Ok(Element::VisibleString(s)),
            UniversalTag::GeneralString => Ok(Element::GeneralString(s)),
            UniversalTag::BmpString => Ok(Element::BMPString(s)),
            UniversalTag::UniversalString => Ok(Element::UniversalString(s)),
            _ => Err(Error::ValueMismatch("not a string tag")),
        }
    }
}

impl Syntax for StringSyntax {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        match required(value)? {
            Value::Text(s) => Ok(Some(Tlv::try_from(&self.element(s)?)?)),
            _ => Err(Error::ValueMismatch("string syntax expects text")),
        }
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        let tlv = expect_universal(tlv, self.tag)?;
        match element_text(Element::try_from(tlv)?) {
            Some(s) => Ok(Some(Value::Text(s))),
            None => Err(Error::ValueMismatch("not a string payload")),
        }
    }

    fn wire_tag(&self) -> Option<Tag> {
        Some(Tag::universal(self.tag))
    }
}

fn element_text(element: Element) -> Option<String> {
    match element {
        Element::Utf8String(s)
        | Element::NumericString(s)
        | Element::PrintableString(s)
        | Element::TeletexString(s)
        | Element::VideotexString(s)
        | Element::IA5String(s)
        | Element::GraphicString(s)
        | Element::VisibleString(s)
        | Element::GeneralString(s)
        | Element::BMPString(s)
        | Element::UniversalString(s) => Some(s),
        _ => None,
    }
}

/// UTCTime or GeneralizedTime, selected by tag.
pub struct TimeSyntax {
    tag: UniversalTag,
}

impl TimeSyntax {
    pub fn new(tag: UniversalTag) -> Self {
        TimeSyntax { tag }
    }
}

impl Syntax for TimeSyntax {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        match required(value)? {
            Value::Time(t) => {
                let element = match self.tag {
                    UniversalTag::UtcTime => Element::UTCTime(*t),
                    _ => Element::GeneralizedTime(*t),
                };
                Ok(Some(Tlv::try_from(&element)?))
            }
            _ => Err(Error::ValueMismatch("time syntax expects a time")),
        }
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        let tlv = expect_universal(tlv, self.tag)?;
        match Element::try_from(tlv)? {
            Element::UTCTime(t) | Element::GeneralizedTime(t) => Ok(Some(Value::Time(t))),
            _ => Err(Error::ValueMismatch("not a time payload")),
        }
    }

    fn wire_tag(&self) -> Option<Tag> {
        Some(Tag::universal(self.tag))
    }
}

/// ANY: passes the raw node through untouched on decode; on encode a raw
/// node re-encodes as-is and an untyped value goes through the ordered
/// classification.
pub struct AnySyntax;

impl Syntax for AnySyntax {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        match required(value)? {
            Value::Raw(tlv) => Ok(Some(tlv.clone())),
            other => Ok(Some(Tlv::try_from(&other.to_element()?)?)),
        }
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        let tlv = tlv.ok_or(Error::Missing)?;
        Ok(Some(Value::Raw(tlv.clone())))
    }
}

pub fn null() -> SyntaxRef {
    Arc::new(Null)
}

pub fn boolean() -> SyntaxRef {
    Arc::new(Boolean)
}

pub fn integer() -> SyntaxRef {
    Arc::new(IntegerSyntax::new(UniversalTag::Integer))
}

pub fn integer_named(names: &[(&str, i64)]) -> SyntaxRef {
    Arc::new(IntegerSyntax::with_names(UniversalTag::Integer, names))
}

pub fn enumerated() -> SyntaxRef {
    Arc::new(IntegerSyntax::new(UniversalTag::Enumerated))
}

pub fn enumerated_named(names: &[(&str, i64)]) -> SyntaxRef {
    Arc::new(IntegerSyntax::with_names(UniversalTag::Enumerated, names))
}

pub fn octet_string() -> SyntaxRef {
    Arc::new(OctetStringSyntax)
}

pub fn bit_string() -> SyntaxRef {
    Arc::new(BitStringSyntax::new())
}

/// BIT STRING interpreted as a set of named flags.
pub fn bit_flags(flags: &[(&str, usize)]) -> SyntaxRef {
    Arc::new(BitStringSyntax::with_flags(flags))
}

pub fn object_identifier() -> SyntaxRef {
    Arc::new(ObjectIdentifierSyntax::new())
}

pub fn object_identifier_named(catalog: Arc<dyn AlgorithmCatalog>) -> SyntaxRef {
    Arc::new(ObjectIdentifierSyntax::with_catalog(catalog))
}

pub fn utf8_string() -> SyntaxRef {
    Arc::new(StringSyntax::new(UniversalTag::Utf8String))
}

pub fn numeric_string() -> SyntaxRef {
    Arc::new(StringSyntax::new(UniversalTag::NumericString))
}

pub fn printable_string() -> SyntaxRef {
    Arc::new(StringSyntax::new(UniversalTag::PrintableString))
}

pub fn teletex_string() -> SyntaxRef {
    Arc::new(StringSyntax::new(UniversalTag::TeletexString))
}

pub fn ia5_string() -> SyntaxRef {
    Arc::new(StringSyntax::new(UniversalTag::Ia5String))
}

pub fn visible_string() -> SyntaxRef {
    Arc::new(StringSyntax::new(UniversalTag::VisibleString))
}

pub fn bmp_string() -> SyntaxRef {
    Arc::new(StringSyntax::new(UniversalTag::BmpString))
}

pub fn universal_string() -> SyntaxRef {
    Arc::new(StringSyntax::new(UniversalTag::UniversalString))
}

pub fn utc_time() -> SyntaxRef {
    Arc::new(TimeSyntax::new(UniversalTag::UtcTime))
}

pub fn generalized_time() -> SyntaxRef {
    Arc::new(TimeSyntax::new(UniversalTag::GeneralizedTime))
}

pub fn any() -> SyntaxRef {
    Arc::new(AnySyntax)
}
