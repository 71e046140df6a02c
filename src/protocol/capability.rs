//! Building capability payloads: argument values unfolded into
//! `Mysqlx.Datatypes.Any` trees.

use crate::argument::{
    ArgumentArray, ArgumentObject, ArgumentUObject, ArgumentValue, ArgumentVisitor,
};
use crate::proto::connection::{Capabilities, CapabilitiesSet, Capability};
use crate::proto::datatypes::{self, Any, Array, Object, Scalar, object::ObjectField, scalar};

/// Unfold an argument value into an `Any`.
pub fn any_from_argument(value: &ArgumentValue) -> Any {
    let mut filler = AnyFiller::default();
    value.accept(&mut filler);
    filler.finish()
}

/// Visitor writing each argument variant into an `Any`; encoders stay
/// free of per-variant branching.
#[derive(Default)]
struct AnyFiller {
    any: Any,
}

impl AnyFiller {
    fn finish(self) -> Any {
        self.any
    }

    fn put_scalar(&mut self, r#type: scalar::Type) -> &mut Scalar {
        self.any.r#type = datatypes::any::Type::Scalar as i32;
        self.any.scalar.insert(Scalar {
            r#type: r#type as i32,
            ..Scalar::default()
        })
    }
}

impl ArgumentVisitor for AnyFiller {
    fn visit_null(&mut self) {
        self.put_scalar(scalar::Type::VNull);
    }

    fn visit_signed_int(&mut self, value: i64) {
        self.put_scalar(scalar::Type::VSint).v_signed_int = Some(value);
    }

    fn visit_unsigned_int(&mut self, value: u64) {
        self.put_scalar(scalar::Type::VUint).v_unsigned_int = Some(value);
    }

    fn visit_double(&mut self, value: f64) {
        self.put_scalar(scalar::Type::VDouble).v_double = Some(value);
    }

    fn visit_float(&mut self, value: f32) {
        self.put_scalar(scalar::Type::VFloat).v_float = Some(value);
    }

    fn visit_bool(&mut self, value: bool) {
        self.put_scalar(scalar::Type::VBool).v_bool = Some(value);
    }

    fn visit_string(&mut self, value: &str) {
        self.put_scalar(scalar::Type::VString).v_string = Some(scalar::String {
            value: value.as_bytes().to_vec(),
            collation: None,
        });
    }

    fn visit_octets(&mut self, value: &[u8]) {
        self.put_scalar(scalar::Type::VOctets).v_octets = Some(scalar::Octets {
            value: value.to_vec(),
            content_type: None,
        });
    }

    fn visit_decimal(&mut self, value: &str) {
        // Decimals travel as octets holding the textual form.
        self.visit_octets(value.as_bytes());
    }

    fn visit_array(&mut self, values: &ArgumentArray) {
        let value = values.iter().map(any_from_argument).collect();
        self.any.r#type = datatypes::any::Type::Array as i32;
        self.any.array = Some(Array { value });
    }

    fn visit_object(&mut self, object: &ArgumentObject) {
        let fld = object
            .iter()
            .map(|(key, value)| ObjectField {
                key: key.clone(),
                value: Some(any_from_argument(value)),
            })
            .collect();
        self.any.r#type = datatypes::any::Type::Object as i32;
        self.any.obj = Some(Object { fld });
    }

    fn visit_uobject(&mut self, object: &ArgumentUObject) {
        let fld = object
            .iter()
            .map(|(key, value)| ObjectField {
                key: key.clone(),
                value: Some(any_from_argument(value)),
            })
            .collect();
        self.any.r#type = datatypes::any::Type::Object as i32;
        self.any.obj = Some(Object { fld });
    }
}

/// Accumulates named capabilities into a `CapabilitiesSet`.
#[derive(Default)]
pub struct CapabilitiesBuilder {
    capabilities: Vec<Capability>,
}

impl CapabilitiesBuilder {
    pub fn clear(&mut self) -> &mut Self {
        self.capabilities.clear();
        self
    }

    pub fn add_capability(&mut self, name: &str, value: &ArgumentValue) -> &mut Self {
        self.capabilities.push(Capability {
            name: name.to_string(),
            value: Some(any_from_argument(value)),
        });
        self
    }

    pub fn add_capabilities_from_object(&mut self, object: &ArgumentObject) -> &mut Self {
        for (name, value) in object {
            self.add_capability(name, value);
        }
        self
    }

    pub fn build(&mut self) -> CapabilitiesSet {
        CapabilitiesSet {
            capabilities: Some(Capabilities {
                capabilities: std::mem::take(&mut self.capabilities),
            }),
        }
    }
}
