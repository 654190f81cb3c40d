//! Discriminator-driven type dispatch.
//!
//! `TypeRegistry` is an immutable mapping from a discriminator value
//! (usually an object identifier in dotted text) to the descriptor for
//! the payload that discriminator selects, with an explicit default
//! branch. `IdentifiedBy` consumes one: the discriminator is computed
//! from the native value on encode and read back from the wire on
//! decode. This is how an algorithm identifier selects the shape of its
//! parameters.

use std::collections::HashMap;
use std::sync::Arc;

use asn1::Element;
use ber::Tlv;

use crate::combinators::sequence;
use crate::error::Error;
use crate::primitives::{object_identifier, object_identifier_named};
use crate::value::Value;
use crate::{Syntax, SyntaxRef};

/// The algorithm lookup interface the schema layer consumes: symbolic
/// name ⇄ object identifier ⇄ default parameter set. Implementations
/// are injected where needed; there is no global registry.
pub trait AlgorithmCatalog: Send + Sync {
    /// Symbolic name → dotted object identifier.
    fn identifier(&self, name: &str) -> Option<String>;
    /// Dotted object identifier → symbolic name.
    fn name(&self, oid: &str) -> Option<String>;
    /// The default parameter set for a named algorithm.
    fn parameters(&self, name: &str) -> Option<Value>;
}

/// A catalog backed by in-memory maps, built once.
#[derive(Default)]
pub struct MapCatalog {
    identifiers: HashMap<String, String>,
    names: HashMap<String, String>,
    parameters: HashMap<String, Value>,
}

impl MapCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_algorithm(mut self, name: &str, oid: &str) -> Self {
        self.identifiers.insert(name.to_string(), oid.to_string());
        self.names.insert(oid.to_string(), name.to_string());
        self
    }

    pub fn with_parameters(mut self, name: &str, parameters: Value) -> Self {
        self.parameters.insert(name.to_string(), parameters);
        self
    }
}

impl AlgorithmCatalog for MapCatalog {
    fn identifier(&self, name: &str) -> Option<String> {
        self.identifiers.get(name).cloned()
    }

    fn name(&self, oid: &str) -> Option<String> {
        self.names.get(oid).cloned()
    }

    fn parameters(&self, name: &str) -> Option<Value> {
        self.parameters.get(name).cloned()
    }
}

/// An immutable discriminator → descriptor mapping with an explicit
/// default branch.
#[derive(Default)]
pub struct TypeRegistry {
    map: HashMap<String, SyntaxRef>,
    default: Option<SyntaxRef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: &str, syntax: SyntaxRef) -> Self {
        self.map.insert(id.to_string(), syntax);
        self
    }

    pub fn with_default(mut self, syntax: SyntaxRef) -> Self {
        self.default = Some(syntax);
        self
    }

    /// The descriptor registered for `id`, or the default branch. An
    /// unrecognized discriminator with no default is fatal.
    pub fn resolve(&self, id: &str) -> Result<SyntaxRef, Error> {
        self.map
            .get(id)
            .cloned()
            .or_else(|| self.default.clone())
            .ok_or_else(|| Error::UnresolvedDiscriminator(id.to_string()))
    }

    pub fn fallback(&self) -> Option<SyntaxRef> {
        self.default.clone()
    }
}

/// How the discriminator is obtained on each side: from the native
/// value when encoding, from the wire node when decoding.
pub struct Discriminant {
    from_value: Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>,
    from_wire: Arc<dyn Fn(&Tlv) -> Option<String> + Send + Sync>,
}

impl Discriminant {
    pub fn new(
        from_value: impl Fn(&Value) -> Option<String> + Send + Sync + 'static,
        from_wire: impl Fn(&Tlv) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Discriminant {
            from_value: Arc::new(from_value),
            from_wire: Arc::new(from_wire),
        }
    }

    /// The attribute shape: the discriminator is the OID stored in the
    /// named record field, wired as the first child of the sequence.
    pub fn attribute_type(field: &str) -> Self {
        let field_name = field.to_string();
        Discriminant::new(
            move |value| match value {
                Value::Record(record) => record.get(field_name.as_str()).and_then(oid_text),
                _ => None,
            },
            first_child_oid,
        )
    }
}

fn oid_text(value: &Value) -> Option<String> {
    match value {
        Value::Oid(oid) => Some(oid.to_string()),
        Value::Text(text) => Some(text.clone()),
        _ => None,
    }
}

fn first_child_oid(tlv: &Tlv) -> Option<String> {
    let child = tlv.tlvs()?.first()?;
    match Element::try_from(child).ok()? {
        Element::ObjectIdentifier(oid) => Some(oid.to_string()),
        _ => None,
    }
}

type Wrap = Arc<dyn Fn(SyntaxRef) -> SyntaxRef + Send + Sync>;

/// Resolves the concrete payload descriptor through a registry, then
/// embeds it into the enclosing shape via `wrap`.
pub struct IdentifiedBy {
    registry: Arc<TypeRegistry>,
    discriminant: Discriminant,
    wrap: Wrap,
}

impl IdentifiedBy {
    pub fn new(
        registry: Arc<TypeRegistry>,
        discriminant: Discriminant,
        wrap: impl Fn(SyntaxRef) -> SyntaxRef + Send + Sync + 'static,
    ) -> Self {
        IdentifiedBy {
            registry,
            discriminant,
            wrap: Arc::new(wrap),
        }
    }

    fn payload_for_value(&self, value: &Value) -> Result<SyntaxRef, Error> {
        match (self.discriminant.from_value)(value) {
            Some(id) => self.registry.resolve(&id),
            None => self
                .registry
                .fallback()
                .ok_or_else(|| Error::UnresolvedDiscriminator("<none>".to_string())),
        }
    }

    fn payload_for_wire(&self, tlv: &Tlv) -> Result<SyntaxRef, Error> {
        match (self.discriminant.from_wire)(tlv) {
            Some(id) => self.registry.resolve(&id),
            None => self
                .registry
                .fallback()
                .ok_or_else(|| Error::UnresolvedDiscriminator("<none>".to_string())),
        }
    }
}

impl Syntax for IdentifiedBy {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error> {
        let value = value.ok_or(Error::Missing)?;
        let payload = self.payload_for_value(value)?;
        (self.wrap)(payload).encode(Some(value))
    }

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error> {
        let tlv = tlv.ok_or(Error::Missing)?;
        let payload = self.payload_for_wire(tlv)?;
        (self.wrap)(payload).decode(Some(tlv))
    }
}

pub fn identified_by(
    registry: Arc<TypeRegistry>,
    discriminant: Discriminant,
    wrap: impl Fn(SyntaxRef) -> SyntaxRef + Send + Sync + 'static,
) -> SyntaxRef {
    Arc::new(IdentifiedBy::new(registry, discriminant, wrap))
}

/// The common `SEQUENCE { type OBJECT IDENTIFIER, value ANY DEFINED BY
/// type }` shape, with the value's descriptor resolved through the
/// registry.
pub fn attribute(registry: Arc<TypeRegistry>) -> SyntaxRef {
    identified_by(
        registry,
        Discriminant::attribute_type("type"),
        |payload| sequence(vec![("type", object_identifier()), ("value", payload)]),
    )
}

/// AlgorithmIdentifier: `SEQUENCE { algorithm OBJECT IDENTIFIER,
/// parameters ANY DEFINED BY algorithm }`. Names resolve through the
/// catalog in both directions; the parameter shape resolves through the
/// registry.
pub fn algorithm_identifier(
    catalog: Arc<dyn AlgorithmCatalog>,
    registry: Arc<TypeRegistry>,
) -> SyntaxRef {
    let for_value = catalog.clone();
    let discriminant = Discriminant::new(
        move |value| match value {
            Value::Record(record) => {
                let algorithm = record.get("algorithm")?;
                match algorithm {
                    Value::Oid(oid) => Some(oid.to_string()),
                    Value::Text(text) => for_value.identifier(text).or_else(|| Some(text.clone())),
                    _ => None,
                }
            }
            _ => None,
        },
        first_child_oid,
    );
    let type_syntax = object_identifier_named(catalog);
    identified_by(registry, discriminant, move |payload| {
        sequence(vec![
            ("algorithm", type_syntax.clone()),
            ("parameters", payload),
        ])
    })
}
