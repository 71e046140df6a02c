//! `Mysqlx.Connection`: capability negotiation and the compression
//! envelope.

use super::datatypes::Any;

/// `Mysqlx.Connection.Capability`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Capability {
    #[prost(string, required, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub value: Option<Any>,
}

/// `Mysqlx.Connection.Capabilities`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Capabilities {
    #[prost(message, repeated, tag = "1")]
    pub capabilities: Vec<Capability>,
}

impl Capabilities {
    pub fn get(&self, name: &str) -> Option<&Any> {
        self.capabilities
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.value.as_ref())
    }
}

/// `Mysqlx.Connection.CapabilitiesGet`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CapabilitiesGet {}

/// `Mysqlx.Connection.CapabilitiesSet`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CapabilitiesSet {
    #[prost(message, optional, tag = "1")]
    pub capabilities: Option<Capabilities>,
}

/// `Mysqlx.Connection.Close`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Close {}

/// `Mysqlx.Connection.Compression`
///
/// The payload is a concatenation of inner frames in the outer frame
/// format; an inner frame may not itself be a compression envelope.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Compression {
    #[prost(uint64, optional, tag = "1")]
    pub uncompressed_size: Option<u64>,
    #[prost(int32, optional, tag = "2")]
    pub server_messages: Option<i32>,
    #[prost(int32, optional, tag = "3")]
    pub client_messages: Option<i32>,
    #[prost(bytes = "vec", required, tag = "4")]
    pub payload: Vec<u8>,
}
