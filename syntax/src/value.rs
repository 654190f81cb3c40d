//! The native value model descriptors translate to and from.

use chrono::NaiveDateTime;

use asn1::{BitString, Element, Integer, ObjectIdentifier, OctetString};
use ber::Tlv;

use crate::error::Error;

/// A native value as seen by the schema layer.
///
/// `Record` is what a SEQUENCE decodes into: named fields whose
/// insertion order is the wire order. `Raw` carries a TLV node through
/// untouched for ANY positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(Integer),
    Text(String),
    Bits(BitString),
    Bytes(Vec<u8>),
    Oid(ObjectIdentifier),
    Time(NaiveDateTime),
    List(Vec<Value>),
    Record(Record),
    Raw(Tlv),
}

impl Value {
    /// Parses dotted text into an OID value.
    pub fn oid(s: &str) -> Result<Value, Error> {
        let oid = s.parse::<ObjectIdentifier>().map_err(Error::Element)?;
        Ok(Value::Oid(oid))
    }

    /// Converts an untyped value to its natural element. Text goes
    /// through [`Element::classify`], the explicit ordered
    /// classification; a record has no natural element and needs a
    /// schema.
    pub fn to_element(&self) -> Result<Element, Error> {
        match self {
            Value::Null => Ok(Element::Null),
            Value::Boolean(b) => Ok(Element::Boolean(*b)),
            Value::Integer(i) => Ok(Element::Integer(i.clone())),
            Value::Text(s) => Ok(Element::classify(s)),
            Value::Bits(bits) => Ok(Element::BitString(bits.clone())),
            Value::Bytes(bytes) => Ok(Element::OctetString(OctetString::from(bytes.clone()))),
            Value::Oid(oid) => Ok(Element::ObjectIdentifier(oid.clone())),
            Value::Time(t) => Ok(Element::GeneralizedTime(*t)),
            Value::List(items) => {
                let elements = items
                    .iter()
                    .map(Value::to_element)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Element::Sequence(elements))
            }
            Value::Record(_) => Err(Error::ValueMismatch("a record needs a schema to encode")),
            Value::Raw(_) => Err(Error::ValueMismatch("a raw node is already encoded")),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(Integer::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Record(value)
    }
}

/// An ordered mapping of field name to value. Insertion order is
/// preserved exactly; it is the wire order of the enclosing SEQUENCE.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Record { fields: Vec::new() }
    }

    /// Builder-style insertion.
    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts or replaces a field, keeping the original position on
    /// replacement.
    pub fn insert(&mut self, name: &str, value: Value) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<(String, Value)> {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Record {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use asn1::{Element, Integer};

    use super::{Record, Value};

    #[test]
    fn test_record_preserves_insertion_order() {
        let record = Record::new()
            .with("z", Value::from(1))
            .with("a", Value::from(2))
            .with("m", Value::from(3));
        let names: Vec<&str> = record.fields().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(vec!["z", "a", "m"], names);
    }

    #[test]
    fn test_record_replace_keeps_position() {
        let mut record = Record::new().with("a", Value::from(1)).with("b", Value::from(2));
        record.insert("a", Value::from(9));
        assert_eq!(Some(&Value::from(9)), record.get("a"));
        assert_eq!("a", record.fields()[0].0);
    }

    #[rstest(
        value,
        expected,
        case(Value::Null, Element::Null),
        case(Value::from(true), Element::Boolean(true)),
        case(Value::from(7), Element::Integer(Integer::from(7))),
        case(Value::from("1.2.3"), Element::classify("1.2.3")),
        case(Value::from("plain text"), Element::PrintableString("plain text".to_string()))
    )]
    fn test_value_to_element(value: Value, expected: Element) {
        assert_eq!(expected, value.to_element().unwrap());
    }

    #[test]
    fn test_record_has_no_natural_element() {
        assert!(Value::Record(Record::new()).to_element().is_err());
    }
}
