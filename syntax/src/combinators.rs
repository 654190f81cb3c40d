//! Structural descriptors: SEQUENCE, CHOICE, optionality, context tags,
//! repetition, encapsulation and lazy recursion.

use std::sync::{Arc, OnceLock};

use ber::{Class, Content, Ruleset, Tag, Tlv, UniversalTag};

use crate::error::Error;
use crate::value::{Record, Value};
use crate::{Syntax, SyntaxRef};

/// SEQUENCE with named fields in declaration order.
///
/// Encoding walks the fields in order and omits any whose descriptor
/// returns absent. Decoding walks the declared fields against the
/// children in order; a field consumes one child only when its
/// descriptor produces a value from it, so optional and defaulted
/// fields skip themselves rather than being skipped by name.
pub struct Sequence {
    fields: Vec<(String, SyntaxRef)>,
}

impl Sequence {
    pub fn new(fields: Vec<(&str, SyntaxRef)>) -> Self {
        Sequence {
            fields: fields
                .into_iter()
                .map(|(name, syntax)| (name.to_string(), syntax))
                .collect(),
        }
    }
}

impl Syntax for Sequence {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        let record = match value {
            Some(Value::Record(record)) => record,
            Some(_) => return Err(Error::ValueMismatch("SEQUENCE expects a record")),
            None => return Err(Error::Missing),
        };
        let mut children = Vec::new();
        for (name, syntax) in &self.fields {
            if let Some(tlv) = syntax.encode(record.get(name))? {
                children.push(tlv);
            }
        }
        Ok(Some(Tlv::new_constructed(
            Tag::constructed(UniversalTag::Sequence),
            children,
        )))
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        let tlv = crate::primitives::expect_universal(tlv, UniversalTag::Sequence)?;
        let children = tlv.tlvs().unwrap_or(&[]);
        let mut record = Record::new();
        let mut index = 0;
        for (name, syntax) in &self.fields {
            match children.get(index) {
                Some(child) => match syntax.decode(Some(child)) {
                    Ok(Some(value)) => {
                        record.insert(name, value);
                        index += 1;
                    }
                    Ok(None) => {
                        // the field absorbed absence without consuming
                        if let Some(value) = syntax.absent_value() {
                            record.insert(name, value);
                        }
                    }
                    Err(e) => return Err(e),
                },
                None => {
                    if let Some(value) = syntax.decode(None)? {
                        record.insert(name, value);
                    }
                }
            }
        }
        if index < children.len() {
            return Err(Error::TrailingElements(children.len() - index));
        }
        Ok(Some(Value::Record(record)))
    }

    fn wire_tag(&self) -> Option<Tag> {
        Some(Tag::constructed(UniversalTag::Sequence))
    }
}

type Chooser = Arc<dyn Fn(&Value) -> Option<usize> + Send + Sync>;

/// CHOICE over an ordered list of alternatives: the first that fits
/// wins, on both encode and decode. An explicit chooser picks the
/// encode branch directly, avoiding try-each ambiguity.
pub struct Choice {
    alternatives: Vec<SyntaxRef>,
    chooser: Option<Chooser>,
}

impl Choice {
    pub fn new(alternatives: Vec<SyntaxRef>) -> Self {
        Choice {
            alternatives,
            chooser: None,
        }
    }

    pub fn with_chooser(
        alternatives: Vec<SyntaxRef>,
        chooser: impl Fn(&Value) -> Option<usize> + Send + Sync + 'static,
    ) -> Self {
        Choice {
            alternatives,
            chooser: Some(Arc::new(chooser)),
        }
    }
}

impl Syntax for Choice {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        let value = value.ok_or(Error::Missing)?;
        if let Some(chooser) = &self.chooser {
            let index = chooser(value).ok_or(Error::NoAlternative)?;
            let alternative = self.alternatives.get(index).ok_or(Error::NoAlternative)?;
            return alternative.encode(Some(value));
        }
        for alternative in &self.alternatives {
            match alternative.encode(Some(value)) {
                Ok(Some(tlv)) => return Ok(Some(tlv)),
                Ok(None) => continue,
                Err(e) if e.is_mismatch() => continue,
                Err(e) => return Err(e),
            }
        }
        Err(Error::NoAlternative)
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        let tlv = tlv.ok_or(Error::Missing)?;
        for alternative in &self.alternatives {
            match alternative.decode(Some(tlv)) {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => continue,
                Err(e) if e.is_mismatch() => continue,
                Err(e) => return Err(e),
            }
        }
        Err(Error::NoAlternative)
    }
}

/// CHOICE with named branches; decodes into a single-field record naming
/// the branch that matched, encodes the first declared branch present in
/// the record.
pub struct NamedChoice {
    alternatives: Vec<(String, SyntaxRef)>,
}

impl NamedChoice {
    pub fn new(alternatives: Vec<(&str, SyntaxRef)>) -> Self {
        NamedChoice {
            alternatives: alternatives
                .into_iter()
                .map(|(name, syntax)| (name.to_string(), syntax))
                .collect(),
        }
    }
}

impl Syntax for NamedChoice {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        let record = match value.ok_or(Error::Missing)? {
            Value::Record(record) => record,
            _ => return Err(Error::ValueMismatch("named CHOICE expects a record")),
        };
        for (name, syntax) in &self.alternatives {
            if let Some(branch) = record.get(name) {
                return syntax.encode(Some(branch));
            }
        }
        Err(Error::NoAlternative)
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        let tlv = tlv.ok_or(Error::Missing)?;
        for (name, syntax) in &self.alternatives {
            match syntax.decode(Some(tlv)) {
                Ok(Some(value)) => {
                    return Ok(Some(Value::Record(Record::new().with(name, value))));
                }
                Ok(None) => continue,
                Err(e) if e.is_mismatch() => continue,
                Err(e) => return Err(e),
            }
        }
        Err(Error::NoAlternative)
    }
}

/// OPTIONAL: absent native encodes to nothing, unmatched wire decodes to
/// absent instead of failing.
pub struct Optional {
    inner: SyntaxRef,
}

impl Optional {
    pub fn new(inner: SyntaxRef) -> Self {
        Optional { inner }
    }
}

impl Syntax for Optional {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        match value {
            None => Ok(None),
            Some(_) => self.inner.encode(value),
        }
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        match tlv {
            None => Ok(None),
            Some(_) => match self.inner.decode(tlv) {
                Ok(value) => Ok(value),
                Err(e) if e.is_mismatch() => Ok(None),
                Err(e) => Err(e),
            },
        }
    }

    fn wire_tag(&self) -> Option<Tag> {
        self.inner.wire_tag()
    }
}

/// DEFAULT: encoding is suppressed when the value equals the default,
/// and decoding substitutes the default when the wire is absent.
pub struct DefaultTo {
    inner: SyntaxRef,
    default: Value,
}

impl DefaultTo {
    pub fn new(inner: SyntaxRef, default: Value) -> Self {
        DefaultTo { inner, default }
    }
}

impl Syntax for DefaultTo {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        match value {
            None => Ok(None),
            Some(v) if *v == self.default => Ok(None),
            Some(_) => self.inner.encode(value),
        }
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        match tlv {
            None => Ok(Some(self.default.clone())),
            Some(_) => match self.inner.decode(tlv) {
                Ok(value) => Ok(value),
                Err(e) if e.is_mismatch() => Ok(None),
                Err(e) => Err(e),
            },
        }
    }

    fn absent_value(&self) -> Option<Value> {
        Some(self.default.clone())
    }

    fn wire_tag(&self) -> Option<Tag> {
        self.inner.wire_tag()
    }
}

/// Tagging flavor for [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tagging {
    /// Keep the inner content, override the tag.
    Implicit,
    /// Wrap the fully tagged inner node as one nested child.
    Explicit,
}

/// A context-class tag around an inner descriptor.
pub struct Context {
    slot: u64,
    tagging: Tagging,
    inner: SyntaxRef,
}

impl Context {
    pub fn new(slot: u64, tagging: Tagging, inner: SyntaxRef) -> Self {
        Context {
            slot,
            tagging,
            inner,
        }
    }

    fn check<'a>(&self, tlv: Option<&'a Tlv>) -> Result<&'a Tlv, Error> {
        let tlv = tlv.ok_or(Error::Missing)?;
        if tlv.tag().class != Class::ContextSpecific || tlv.tag().number != self.slot {
            return Err(Error::TagMismatch {
                expected: format!("[{}]", self.slot),
                found: format!("{:?}", tlv.tag()),
            });
        }
        Ok(tlv)
    }
}

impl Syntax for Context {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        let inner = match self.inner.encode(value)? {
            Some(tlv) => tlv,
            None => return Ok(None),
        };
        match self.tagging {
            Tagging::Explicit => Ok(Some(Tlv::new_constructed(
                Tag::context(self.slot, true),
                vec![inner],
            ))),
            Tagging::Implicit => match inner.content() {
                Content::Primitive(data) => Ok(Some(Tlv::new_primitive(
                    Tag::context(self.slot, false),
                    data.clone(),
                ))),
                Content::Constructed(children) => Ok(Some(Tlv::new_constructed(
                    Tag::context(self.slot, true),
                    children.clone(),
                ))),
            },
        }
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        let tlv = self.check(tlv)?;
        match self.tagging {
            Tagging::Explicit => self.inner.decode(tlv.tlvs().and_then(|children| children.first())),
            Tagging::Implicit => {
                let inner_tag = self.inner.wire_tag().ok_or(Error::ValueMismatch(
                    "implicit tagging needs a single-tag inner syntax",
                ))?;
                let rebuilt = match tlv.content() {
                    Content::Primitive(data) => Tlv::new_primitive(inner_tag, data.clone()),
                    Content::Constructed(children) => {
                        Tlv::new_constructed(inner_tag, children.clone())
                    }
                };
                self.inner.decode(Some(&rebuilt))
            }
        }
    }

    fn wire_tag(&self) -> Option<Tag> {
        match self.tagging {
            Tagging::Explicit => Some(Tag::context(self.slot, true)),
            Tagging::Implicit => self
                .inner
                .wire_tag()
                .map(|tag| Tag::context(self.slot, tag.constructed)),
        }
    }
}

/// How a repeated type projects between its wire list and a native
/// dictionary: `key` turns a decoded item into its record entry, `unkey`
/// turns a record entry back into the item to encode.
pub struct Projection {
    pub key: Arc<dyn Fn(&Value) -> Option<(String, Value)> + Send + Sync>,
    pub unkey: Arc<dyn Fn(&str, &Value) -> Value + Send + Sync>,
}

/// SEQUENCE OF / SET OF: a homogeneous ordered list of one repeated
/// type, natively a list or, with a [`Projection`], a keyed record.
pub struct Repeated {
    tag: UniversalTag,
    item: SyntaxRef,
    projection: Option<Projection>,
}

impl Repeated {
    pub fn new(tag: UniversalTag, item: SyntaxRef) -> Self {
        Repeated {
            tag,
            item,
            projection: None,
        }
    }

    pub fn keyed(tag: UniversalTag, item: SyntaxRef, projection: Projection) -> Self {
        Repeated {
            tag,
            item,
            projection: Some(projection),
        }
    }
}

impl Syntax for Repeated {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        let mut children = Vec::new();
        match (crate::primitives::required(value)?, &self.projection) {
            (Value::List(items), _) => {
                for item in items {
                    match self.item.encode(Some(item))? {
                        Some(tlv) => children.push(tlv),
                        None => return Err(Error::ValueMismatch("list item encoded to nothing")),
                    }
                }
            }
            (Value::Record(record), Some(projection)) => {
                for (name, entry) in record.fields() {
                    let item = (projection.unkey)(name, entry);
                    match self.item.encode(Some(&item))? {
                        Some(tlv) => children.push(tlv),
                        None => return Err(Error::ValueMismatch("entry encoded to nothing")),
                    }
                }
            }
            _ => return Err(Error::ValueMismatch("repeated syntax expects a list")),
        }
        Ok(Some(Tlv::new_constructed(
            Tag::constructed(self.tag),
            children,
        )))
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        let tlv = crate::primitives::expect_universal(tlv, self.tag)?;
        let children = tlv.tlvs().unwrap_or(&[]);
        match &self.projection {
            None => {
                let mut items = Vec::new();
                for child in children {
                    match self.item.decode(Some(child))? {
                        Some(value) => items.push(value),
                        None => return Err(Error::ValueMismatch("list item decoded to nothing")),
                    }
                }
                Ok(Some(Value::List(items)))
            }
            Some(projection) => {
                let mut record = Record::new();
                for child in children {
                    let value = self
                        .item
                        .decode(Some(child))?
                        .ok_or(Error::ValueMismatch("entry decoded to nothing"))?;
                    let (name, entry) = (projection.key)(&value)
                        .ok_or(Error::ValueMismatch("entry has no key"))?;
                    record.insert(&name, entry);
                }
                Ok(Some(Value::Record(record)))
            }
        }
    }

    fn wire_tag(&self) -> Option<Tag> {
        Some(Tag::constructed(self.tag))
    }
}

/// An OCTET STRING or BIT STRING whose payload is itself a complete DER
/// encoding of the inner type.
pub struct Encapsulated {
    carrier: UniversalTag,
    inner: SyntaxRef,
}

impl Encapsulated {
    pub fn new(carrier: UniversalTag, inner: SyntaxRef) -> Self {
        Encapsulated { carrier, inner }
    }
}

impl Syntax for Encapsulated {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        let inner = match self.inner.encode(value)? {
            Some(tlv) => tlv,
            None => return Ok(None),
        };
        let mut payload = Vec::new();
        if self.carrier == UniversalTag::BitString {
            payload.push(0); // no unused bits
        }
        payload.extend_from_slice(&inner.to_bytes(Ruleset::Der));
        Ok(Some(Tlv::new_primitive(
            Tag::universal(self.carrier),
            payload,
        )))
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        let tlv = crate::primitives::expect_universal(tlv, self.carrier)?;
        let data = tlv.data().unwrap_or(&[]);
        let payload = if self.carrier == UniversalTag::BitString {
            data.get(1..).unwrap_or(&[])
        } else {
            data
        };
        let (_, nested) = Tlv::parse(payload).map_err(ber::Error::from)?;
        self.inner.decode(Some(&nested))
    }

    fn wire_tag(&self) -> Option<Tag> {
        Some(Tag::universal(self.carrier))
    }
}

/// Lazy indirection: binds to its target the first time it is used, so
/// mutually recursive descriptors (a container whose payload can be the
/// same container) can be declared before the full graph exists.
pub struct Lazy {
    thunk: fn() -> SyntaxRef,
    cell: OnceLock<SyntaxRef>,
}

impl Lazy {
    pub fn new(thunk: fn() -> SyntaxRef) -> Self {
        Lazy {
            thunk,
            cell: OnceLock::new(),
        }
    }

    fn resolve(&self) -> &SyntaxRef {
        self.cell.get_or_init(|| (self.thunk)())
    }
}

impl Syntax for Lazy {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        self.resolve().encode(value)
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        self.resolve().decode(tlv)
    }

    fn absent_value(&self) -> Option<Value> {
        self.resolve().absent_value()
    }

    fn wire_tag(&self) -> Option<Tag> {
        self.resolve().wire_tag()
    }
}

pub fn sequence(fields: Vec<(&str, SyntaxRef)>) -> SyntaxRef {
    Arc::new(Sequence::new(fields))
}

pub fn choice(alternatives: Vec<SyntaxRef>) -> SyntaxRef {
    Arc::new(Choice::new(alternatives))
}

pub fn choice_with(
    alternatives: Vec<SyntaxRef>,
    chooser: impl Fn(&Value) -> Option<usize> + Send + Sync + 'static,
) -> SyntaxRef {
    Arc::new(Choice::with_chooser(alternatives, chooser))
}

pub fn named_choice(alternatives: Vec<(&str, SyntaxRef)>) -> SyntaxRef {
    Arc::new(NamedChoice::new(alternatives))
}

pub fn optional(inner: SyntaxRef) -> SyntaxRef {
    Arc::new(Optional::new(inner))
}

pub fn default_to(inner: SyntaxRef, default: Value) -> SyntaxRef {
    Arc::new(DefaultTo::new(inner, default))
}

pub fn implicit(slot: u64, inner: SyntaxRef) -> SyntaxRef {
    Arc::new(Context::new(slot, Tagging::Implicit, inner))
}

pub fn explicit(slot: u64, inner: SyntaxRef) -> SyntaxRef {
    Arc::new(Context::new(slot, Tagging::Explicit, inner))
}

pub fn sequence_of(item: SyntaxRef) -> SyntaxRef {
    Arc::new(Repeated::new(UniversalTag::Sequence, item))
}

pub fn set_of(item: SyntaxRef) -> SyntaxRef {
    Arc::new(Repeated::new(UniversalTag::Set, item))
}

/// SET OF whose native form is a record keyed per element.
pub fn keyed_set_of(item: SyntaxRef, projection: Projection) -> SyntaxRef {
    Arc::new(Repeated::keyed(UniversalTag::Set, item, projection))
}

/// SEQUENCE OF whose native form is a record keyed per element.
pub fn keyed_sequence_of(item: SyntaxRef, projection: Projection) -> SyntaxRef {
    Arc::new(Repeated::keyed(UniversalTag::Sequence, item, projection))
}

/// OCTET STRING encapsulating a nested DER encoding.
pub fn encapsulated_octets(inner: SyntaxRef) -> SyntaxRef {
    Arc::new(Encapsulated::new(UniversalTag::OctetString, inner))
}

/// BIT STRING encapsulating a nested DER encoding.
pub fn encapsulated_bits(inner: SyntaxRef) -> SyntaxRef {
    Arc::new(Encapsulated::new(UniversalTag::BitString, inner))
}

pub fn lazy(thunk: fn() -> SyntaxRef) -> SyntaxRef {
    Arc::new(Lazy::new(thunk))
}

/// The Time production: GeneralizedTime for 2050 and later, UTCTime
/// before, selected by value on encode and by tag on decode.
pub fn time() -> SyntaxRef {
    choice_with(
        vec![
            crate::primitives::generalized_time(),
            crate::primitives::utc_time(),
        ],
        |value| match value {
            Value::Time(t) => {
                use chrono::Datelike;
                Some(if t.year() >= 2050 { 0 } else { 1 })
            }
            _ => None,
        },
    )
}
