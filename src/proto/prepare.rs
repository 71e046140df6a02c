//! `Mysqlx.Prepare`: server-side prepared statements.

use super::datatypes::Any;

/// `Mysqlx.Prepare.Prepare`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Prepare {
    #[prost(uint32, required, tag = "1")]
    pub stmt_id: u32,
    #[prost(message, optional, tag = "2")]
    pub stmt: Option<prepare::OneOfMessage>,
}

pub mod prepare {
    /// `Mysqlx.Prepare.Prepare.OneOfMessage`
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct OneOfMessage {
        #[prost(enumeration = "one_of_message::Type", required, tag = "1")]
        pub r#type: i32,
        #[prost(message, optional, tag = "2")]
        pub find: Option<crate::proto::crud::Find>,
        #[prost(message, optional, tag = "3")]
        pub insert: Option<crate::proto::crud::Insert>,
        #[prost(message, optional, tag = "4")]
        pub update: Option<crate::proto::crud::Update>,
        #[prost(message, optional, tag = "5")]
        pub delete: Option<crate::proto::crud::Delete>,
        #[prost(message, optional, tag = "6")]
        pub stmt_execute: Option<crate::proto::sql::StmtExecute>,
    }

    pub mod one_of_message {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum Type {
            Find = 0,
            Insert = 1,
            Update = 2,
            Delete = 4,
            Stmt = 5,
        }
    }
}

/// `Mysqlx.Prepare.Execute`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Execute {
    #[prost(uint32, required, tag = "1")]
    pub stmt_id: u32,
    #[prost(message, repeated, tag = "2")]
    pub args: Vec<Any>,
    #[prost(bool, optional, tag = "3", default = "false")]
    pub compact_metadata: Option<bool>,
}

/// `Mysqlx.Prepare.Deallocate`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Deallocate {
    #[prost(uint32, required, tag = "1")]
    pub stmt_id: u32,
}
