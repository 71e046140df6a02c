//! `Mysqlx.Cursor`: cursor-based fetching over prepared statements.

/// `Mysqlx.Cursor.Open`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Open {
    #[prost(uint32, required, tag = "1")]
    pub cursor_id: u32,
    #[prost(message, optional, tag = "4")]
    pub stmt: Option<open::OneOfMessage>,
    #[prost(uint64, optional, tag = "5")]
    pub fetch_rows: Option<u64>,
}

pub mod open {
    /// `Mysqlx.Cursor.Open.OneOfMessage`
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct OneOfMessage {
        #[prost(enumeration = "one_of_message::Type", required, tag = "1")]
        pub r#type: i32,
        #[prost(message, optional, tag = "2")]
        pub prepare_execute: Option<crate::proto::prepare::Execute>,
    }

    pub mod one_of_message {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum Type {
            PrepareExecute = 0,
        }
    }
}

/// `Mysqlx.Cursor.Fetch`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Fetch {
    #[prost(uint32, required, tag = "1")]
    pub cursor_id: u32,
    #[prost(uint64, optional, tag = "5")]
    pub fetch_rows: Option<u64>,
}

/// `Mysqlx.Cursor.Close`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Close {
    #[prost(uint32, required, tag = "1")]
    pub cursor_id: u32,
}
