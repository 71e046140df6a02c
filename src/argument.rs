//! Argument values: the tagged union carried by capabilities, statement
//! arguments and option values.

use std::collections::BTreeMap;

/// Object with key-ordered fields.
pub type ArgumentObject = BTreeMap<String, ArgumentValue>;

/// Object keeping fields in insertion order.
pub type ArgumentUObject = Vec<(String, ArgumentValue)>;

pub type ArgumentArray = Vec<ArgumentValue>;

/// A dynamically typed value.
///
/// Consumers serialize these without inspecting the tag by implementing
/// [`ArgumentVisitor`]; there is deliberately no other runtime type query.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    Null,
    SignedInt(i64),
    UnsignedInt(u64),
    Double(f64),
    Float(f32),
    Bool(bool),
    String(String),
    Octets(Vec<u8>),
    /// Decimal number kept in its textual form.
    Decimal(String),
    Array(ArgumentArray),
    Object(ArgumentObject),
    UnorderedObject(ArgumentUObject),
}

pub trait ArgumentVisitor {
    fn visit_null(&mut self);
    fn visit_signed_int(&mut self, value: i64);
    fn visit_unsigned_int(&mut self, value: u64);
    fn visit_double(&mut self, value: f64);
    fn visit_float(&mut self, value: f32);
    fn visit_bool(&mut self, value: bool);
    fn visit_string(&mut self, value: &str);
    fn visit_octets(&mut self, value: &[u8]);
    fn visit_decimal(&mut self, value: &str);
    fn visit_array(&mut self, values: &ArgumentArray);
    fn visit_object(&mut self, object: &ArgumentObject);
    fn visit_uobject(&mut self, object: &ArgumentUObject);
}

impl ArgumentValue {
    pub fn accept<V: ArgumentVisitor>(&self, visitor: &mut V) {
        match self {
            Self::Null => visitor.visit_null(),
            Self::SignedInt(v) => visitor.visit_signed_int(*v),
            Self::UnsignedInt(v) => visitor.visit_unsigned_int(*v),
            Self::Double(v) => visitor.visit_double(*v),
            Self::Float(v) => visitor.visit_float(*v),
            Self::Bool(v) => visitor.visit_bool(*v),
            Self::String(v) => visitor.visit_string(v),
            Self::Octets(v) => visitor.visit_octets(v),
            Self::Decimal(v) => visitor.visit_decimal(v),
            Self::Array(v) => visitor.visit_array(v),
            Self::Object(v) => visitor.visit_object(v),
            Self::UnorderedObject(v) => visitor.visit_uobject(v),
        }
    }
}

impl From<bool> for ArgumentValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ArgumentValue {
    fn from(value: i64) -> Self {
        Self::SignedInt(value)
    }
}

impl From<u64> for ArgumentValue {
    fn from(value: u64) -> Self {
        Self::UnsignedInt(value)
    }
}

impl From<f64> for ArgumentValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for ArgumentValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ArgumentValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for ArgumentValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Octets(value)
    }
}

impl From<ArgumentObject> for ArgumentValue {
    fn from(value: ArgumentObject) -> Self {
        Self::Object(value)
    }
}

impl From<ArgumentUObject> for ArgumentValue {
    fn from(value: ArgumentUObject) -> Self {
        Self::UnorderedObject(value)
    }
}

impl FromIterator<ArgumentValue> for ArgumentValue {
    fn from_iter<I: IntoIterator<Item = ArgumentValue>>(values: I) -> Self {
        Self::Array(values.into_iter().collect())
    }
}
