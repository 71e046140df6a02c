//! `Mysqlx.Notice`: out-of-band server messages.

use super::datatypes::Scalar;

/// `Mysqlx.Notice.Frame`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Frame {
    #[prost(uint32, required, tag = "1")]
    pub r#type: u32,
    #[prost(enumeration = "frame::Scope", optional, tag = "2", default = "Global")]
    pub scope: Option<i32>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub payload: Option<Vec<u8>>,
}

pub mod frame {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Scope {
        Global = 1,
        Local = 2,
    }
}

impl Frame {
    pub fn is_global(&self) -> bool {
        self.scope.unwrap_or(frame::Scope::Global as i32) == frame::Scope::Global as i32
    }

    pub fn payload_bytes(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or(&[])
    }
}

/// `Mysqlx.Notice.Warning`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Warning {
    #[prost(enumeration = "warning::Level", optional, tag = "1", default = "Warning")]
    pub level: Option<i32>,
    #[prost(uint32, required, tag = "2")]
    pub code: u32,
    #[prost(string, required, tag = "3")]
    pub msg: String,
}

pub mod warning {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Level {
        Note = 1,
        Warning = 2,
        Error = 3,
    }
}

/// `Mysqlx.Notice.SessionVariableChanged`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SessionVariableChanged {
    #[prost(string, optional, tag = "1")]
    pub param: Option<String>,
    #[prost(message, optional, tag = "2")]
    pub value: Option<super::datatypes::Any>,
}

/// `Mysqlx.Notice.SessionStateChanged`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SessionStateChanged {
    #[prost(enumeration = "session_state_changed::Parameter", required, tag = "1")]
    pub param: i32,
    #[prost(message, repeated, tag = "2")]
    pub value: Vec<Scalar>,
}

pub mod session_state_changed {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Parameter {
        CurrentSchema = 1,
        AccountExpired = 2,
        GeneratedInsertId = 3,
        RowsAffected = 4,
        RowsFound = 5,
        RowsMatched = 6,
        TrxCommitted = 7,
        TrxRolledback = 9,
        ProducedMessage = 10,
        ClientIdAssigned = 11,
        GeneratedDocumentIds = 12,
    }
}
