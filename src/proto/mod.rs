//! The `Mysqlx.*` Protobuf messages, hand-modeled with their on-wire field
//! tags. Only the fields a client exercises are present; the schemas
//! themselves stay with the server.

pub mod connection;
pub mod crud;
pub mod cursor;
pub mod datatypes;
pub mod expect;
pub mod expr;
pub mod notice;
pub mod prepare;
pub mod resultset;
pub mod session;
pub mod sql;

/// `Mysqlx.Ok`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ok {
    #[prost(string, optional, tag = "1")]
    pub msg: Option<String>,
}

/// `Mysqlx.Error`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Error {
    #[prost(enumeration = "error::Severity", optional, tag = "1", default = "Error")]
    pub severity: Option<i32>,
    #[prost(uint32, required, tag = "2")]
    pub code: u32,
    #[prost(string, required, tag = "4")]
    pub sql_state: String,
    #[prost(string, required, tag = "3")]
    pub msg: String,
}

pub mod error {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Severity {
        Error = 0,
        Fatal = 1,
    }
}

impl Error {
    pub fn is_fatal(&self) -> bool {
        self.severity == Some(error::Severity::Fatal as i32)
    }
}
