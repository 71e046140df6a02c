//! `Mysqlx.Datatypes`: the scalar/object/array value tree used by
//! capabilities and statement arguments.

/// `Mysqlx.Datatypes.Scalar`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Scalar {
    #[prost(enumeration = "scalar::Type", required, tag = "1")]
    pub r#type: i32,
    #[prost(sint64, optional, tag = "2")]
    pub v_signed_int: Option<i64>,
    #[prost(uint64, optional, tag = "3")]
    pub v_unsigned_int: Option<u64>,
    #[prost(message, optional, tag = "5")]
    pub v_octets: Option<scalar::Octets>,
    #[prost(double, optional, tag = "6")]
    pub v_double: Option<f64>,
    #[prost(float, optional, tag = "7")]
    pub v_float: Option<f32>,
    #[prost(bool, optional, tag = "8")]
    pub v_bool: Option<bool>,
    #[prost(message, optional, tag = "9")]
    pub v_string: Option<scalar::String>,
}

pub mod scalar {
    /// `Mysqlx.Datatypes.Scalar.String`
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct String {
        #[prost(bytes = "vec", required, tag = "1")]
        pub value: Vec<u8>,
        #[prost(uint64, optional, tag = "2")]
        pub collation: Option<u64>,
    }

    /// `Mysqlx.Datatypes.Scalar.Octets`
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Octets {
        #[prost(bytes = "vec", required, tag = "1")]
        pub value: Vec<u8>,
        #[prost(uint32, optional, tag = "2")]
        pub content_type: Option<u32>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
        VSint = 1,
        VUint = 2,
        VNull = 3,
        VOctets = 4,
        VDouble = 5,
        VFloat = 6,
        VBool = 7,
        VString = 8,
    }
}

impl Scalar {
    pub fn scalar_type(&self) -> Option<scalar::Type> {
        scalar::Type::try_from(self.r#type).ok()
    }

    /// The carried unsigned integer, if this is a `V_UINT` scalar.
    pub fn as_unsigned_int(&self) -> Option<u64> {
        if self.scalar_type() == Some(scalar::Type::VUint) {
            self.v_unsigned_int
        } else {
            None
        }
    }

    /// The carried string bytes, if this is a `V_STRING` scalar.
    pub fn as_string(&self) -> Option<&[u8]> {
        if self.scalar_type() == Some(scalar::Type::VString) {
            self.v_string.as_ref().map(|s| s.value.as_slice())
        } else {
            None
        }
    }

    /// The carried octets, if this is a `V_OCTETS` scalar.
    pub fn as_octets(&self) -> Option<&[u8]> {
        if self.scalar_type() == Some(scalar::Type::VOctets) {
            self.v_octets.as_ref().map(|o| o.value.as_slice())
        } else {
            None
        }
    }
}

/// `Mysqlx.Datatypes.Object`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Object {
    #[prost(message, repeated, tag = "1")]
    pub fld: Vec<object::ObjectField>,
}

pub mod object {
    /// `Mysqlx.Datatypes.Object.ObjectField`
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ObjectField {
        #[prost(string, required, tag = "1")]
        pub key: String,
        #[prost(message, optional, tag = "2")]
        pub value: Option<super::Any>,
    }
}

/// `Mysqlx.Datatypes.Array`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Array {
    #[prost(message, repeated, tag = "1")]
    pub value: Vec<Any>,
}

/// `Mysqlx.Datatypes.Any`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Any {
    #[prost(enumeration = "any::Type", required, tag = "1")]
    pub r#type: i32,
    #[prost(message, optional, tag = "2")]
    pub scalar: Option<Scalar>,
    #[prost(message, optional, tag = "3")]
    pub obj: Option<Object>,
    #[prost(message, optional, tag = "4")]
    pub array: Option<Array>,
}

pub mod any {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
        Scalar = 1,
        Object = 2,
        Array = 3,
    }
}

impl Any {
    pub fn from_scalar(scalar: Scalar) -> Self {
        Self {
            r#type: any::Type::Scalar as i32,
            scalar: Some(scalar),
            obj: None,
            array: None,
        }
    }

    pub fn from_object(obj: Object) -> Self {
        Self {
            r#type: any::Type::Object as i32,
            scalar: None,
            obj: Some(obj),
            array: None,
        }
    }

    pub fn from_array(array: Array) -> Self {
        Self {
            r#type: any::Type::Array as i32,
            scalar: None,
            obj: None,
            array: Some(array),
        }
    }

    /// Collect the elements of a string (or octets) array, the format the
    /// server uses to advertise capability lists.
    pub fn as_string_array(&self) -> Option<Vec<String>> {
        if self.r#type != any::Type::Array as i32 {
            return None;
        }
        let mut out = Vec::new();
        for element in &self.array.as_ref()?.value {
            if element.r#type != any::Type::Scalar as i32 {
                return None;
            }
            let scalar = element.scalar.as_ref()?;
            let bytes = scalar.as_string().or_else(|| scalar.as_octets())?;
            out.push(String::from_utf8_lossy(bytes).into_owned());
        }
        Some(out)
    }
}
