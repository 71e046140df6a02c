//! `Mysqlx.Sql`: plain statement execution.

use super::datatypes::Any;

/// `Mysqlx.Sql.StmtExecute`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StmtExecute {
    #[prost(string, optional, tag = "3", default = "sql")]
    pub namespace: Option<String>,
    #[prost(bytes = "vec", required, tag = "1")]
    pub stmt: Vec<u8>,
    #[prost(message, repeated, tag = "2")]
    pub args: Vec<Any>,
    #[prost(bool, optional, tag = "4", default = "false")]
    pub compact_metadata: Option<bool>,
}

impl StmtExecute {
    pub fn new(stmt: impl Into<Vec<u8>>) -> Self {
        Self {
            namespace: None,
            stmt: stmt.into(),
            args: Vec::new(),
            compact_metadata: None,
        }
    }
}

/// `Mysqlx.Sql.StmtExecuteOk`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StmtExecuteOk {}
