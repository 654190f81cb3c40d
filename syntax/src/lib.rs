//! Composable schema descriptors over the BER codec.
//!
//! A [`Syntax`] is one grammar production: a stateless encode/decode
//! pair between the native [`Value`] model and the TLV tree. Descriptors
//! compose: SEQUENCE owns named fields, CHOICE owns ordered
//! alternatives, OPTIONAL and DEFAULT add absence semantics, context
//! tags re-tag, SEQUENCE-OF/SET-OF repeat, and IDENTIFIED-BY dispatches
//! through a registry keyed by an object identifier. Descriptors are
//! built once at startup and shared read-only; all per-call state lives
//! in the values being converted.
//!
//! ```
//! use syntax::{Record, Syntax, Value, integer, optional, printable_string, sequence};
//! use ber::{Ruleset, Tlv};
//!
//! let person = sequence(vec![
//!     ("age", integer()),
//!     ("name", optional(printable_string())),
//! ]);
//!
//! let value = Value::Record(
//!     Record::new()
//!         .with("age", Value::from(30))
//!         .with("name", Value::from("Ada")),
//! );
//! let tlv = person.encode(Some(&value)).unwrap().unwrap();
//! let bytes = tlv.to_bytes(Ruleset::Der);
//!
//! let (_, parsed) = Tlv::parse(&bytes).unwrap();
//! assert_eq!(Some(value), person.decode(Some(&parsed)).unwrap());
//! ```

use std::sync::Arc;

use ber::{Tag, Tlv};

pub mod combinators;
pub mod error;
pub mod primitives;
pub mod registry;
pub mod value;

pub use combinators::{
    Choice, Context, DefaultTo, Encapsulated, Lazy, NamedChoice, Optional, Projection, Repeated,
    Sequence, Tagging, choice, choice_with, default_to, encapsulated_bits, encapsulated_octets,
    explicit, implicit, keyed_sequence_of, keyed_set_of, lazy, named_choice, optional, sequence,
    sequence_of, set_of, time,
};
pub use error::Error;
pub use primitives::{
    any, bit_flags, bit_string, bmp_string, boolean, enumerated, enumerated_named,
    generalized_time, ia5_string, integer, integer_named, null, numeric_string, object_identifier,
    object_identifier_named, octet_string, printable_string, teletex_string, universal_string,
    utc_time, utf8_string, visible_string,
};
pub use registry::{
    AlgorithmCatalog, Discriminant, IdentifiedBy, MapCatalog, TypeRegistry, algorithm_identifier,
    attribute, identified_by,
};
pub use value::{Record, Value};

/// One grammar production: a symmetric encode/decode pair.
///
/// `Ok(None)` means "absent" in both directions. On encode it tells the
/// enclosing SEQUENCE to omit the field; on decode it tells it the
/// presented child was not consumed. Required descriptors never return
/// it; they fail with a mismatch-class error instead, which CHOICE,
/// OPTIONAL and DEFAULT absorb to drive alternative selection.
pub trait Syntax: Send + Sync {
    fn encode(&self, value: Option<&Value>) -> Result<Option<Tlv>, Error>;

    fn decode(&self, tlv: Option<&Tlv>) -> Result<Option<Value>, Error>;

    /// The value a SEQUENCE records for this field when it consumes no
    /// wire content. `None` omits the field; DEFAULT substitutes its
    /// default here.
    fn absent_value(&self) -> Option<Value> {
        None
    }

    /// The single wire tag this descriptor produces, when it has one.
    /// Implicit tagging needs it to rebuild the inner node.
    fn wire_tag(&self) -> Option<Tag> {
        None
    }
}

/// Shared handle to a descriptor; schemas are graphs of these.
pub type SyntaxRef = Arc<dyn Syntax>;
