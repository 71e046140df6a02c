//! `Mysqlx.Crud`: collection-level find/insert/update/delete and view
//! management.

use super::datatypes::Scalar;
use super::expr::{ColumnIdentifier, DocumentPathItem, Expr};

/// `Mysqlx.Crud.Collection`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Collection {
    #[prost(string, required, tag = "1")]
    pub name: String,
    #[prost(string, optional, tag = "2")]
    pub schema: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DataModel {
    Document = 1,
    Table = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ViewAlgorithm {
    Undefined = 1,
    Merge = 2,
    Temptable = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ViewSqlSecurity {
    Invoker = 1,
    Definer = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ViewCheckOption {
    Local = 1,
    Cascaded = 2,
}

/// `Mysqlx.Crud.Column`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Column {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub alias: Option<String>,
    #[prost(message, repeated, tag = "3")]
    pub document_path: Vec<DocumentPathItem>,
}

/// `Mysqlx.Crud.Projection`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Projection {
    #[prost(message, optional, tag = "1")]
    pub source: Option<Expr>,
    #[prost(string, optional, tag = "2")]
    pub alias: Option<String>,
}

/// `Mysqlx.Crud.Limit`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Limit {
    #[prost(uint64, optional, tag = "1")]
    pub row_count: Option<u64>,
    #[prost(uint64, optional, tag = "2")]
    pub offset: Option<u64>,
}

/// `Mysqlx.Crud.Order`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Order {
    #[prost(message, optional, tag = "1")]
    pub expr: Option<Expr>,
    #[prost(enumeration = "order::Direction", optional, tag = "2", default = "Asc")]
    pub direction: Option<i32>,
}

pub mod order {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Direction {
        Asc = 1,
        Desc = 2,
    }
}

/// `Mysqlx.Crud.UpdateOperation`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateOperation {
    #[prost(message, optional, tag = "1")]
    pub source: Option<ColumnIdentifier>,
    #[prost(enumeration = "update_operation::UpdateType", required, tag = "2")]
    pub operation: i32,
    #[prost(message, optional, tag = "3")]
    pub value: Option<Expr>,
}

pub mod update_operation {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum UpdateType {
        Set = 1,
        ItemRemove = 2,
        ItemSet = 3,
        ItemReplace = 4,
        ItemMerge = 5,
        ArrayInsert = 6,
        ArrayAppend = 7,
        MergePatch = 8,
    }
}

/// `Mysqlx.Crud.Find`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Find {
    #[prost(message, optional, tag = "2")]
    pub collection: Option<Collection>,
    #[prost(enumeration = "DataModel", optional, tag = "3")]
    pub data_model: Option<i32>,
    #[prost(message, repeated, tag = "4")]
    pub projection: Vec<Projection>,
    #[prost(message, optional, tag = "5")]
    pub criteria: Option<Expr>,
    #[prost(message, repeated, tag = "11")]
    pub args: Vec<Scalar>,
    #[prost(message, optional, tag = "6")]
    pub limit: Option<Limit>,
    #[prost(message, repeated, tag = "7")]
    pub order: Vec<Order>,
    #[prost(message, repeated, tag = "8")]
    pub grouping: Vec<Expr>,
    #[prost(message, optional, tag = "9")]
    pub grouping_criteria: Option<Expr>,
}

/// `Mysqlx.Crud.Insert`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Insert {
    #[prost(message, optional, tag = "1")]
    pub collection: Option<Collection>,
    #[prost(enumeration = "DataModel", optional, tag = "2")]
    pub data_model: Option<i32>,
    #[prost(message, repeated, tag = "3")]
    pub projection: Vec<Column>,
    #[prost(message, repeated, tag = "4")]
    pub row: Vec<insert::TypedRow>,
    #[prost(message, repeated, tag = "5")]
    pub args: Vec<Scalar>,
    #[prost(bool, optional, tag = "6", default = "false")]
    pub upsert: Option<bool>,
}

pub mod insert {
    /// `Mysqlx.Crud.Insert.TypedRow`
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TypedRow {
        #[prost(message, repeated, tag = "1")]
        pub field: Vec<super::Expr>,
    }
}

/// `Mysqlx.Crud.Update`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Update {
    #[prost(message, optional, tag = "2")]
    pub collection: Option<Collection>,
    #[prost(enumeration = "DataModel", optional, tag = "3")]
    pub data_model: Option<i32>,
    #[prost(message, optional, tag = "4")]
    pub criteria: Option<Expr>,
    #[prost(message, optional, tag = "5")]
    pub limit: Option<Limit>,
    #[prost(message, repeated, tag = "6")]
    pub order: Vec<Order>,
    #[prost(message, repeated, tag = "7")]
    pub operation: Vec<UpdateOperation>,
    #[prost(message, repeated, tag = "8")]
    pub args: Vec<Scalar>,
}

/// `Mysqlx.Crud.Delete`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Delete {
    #[prost(message, optional, tag = "1")]
    pub collection: Option<Collection>,
    #[prost(enumeration = "DataModel", optional, tag = "2")]
    pub data_model: Option<i32>,
    #[prost(message, optional, tag = "3")]
    pub criteria: Option<Expr>,
    #[prost(message, optional, tag = "4")]
    pub limit: Option<Limit>,
    #[prost(message, repeated, tag = "5")]
    pub order: Vec<Order>,
    #[prost(message, repeated, tag = "6")]
    pub args: Vec<Scalar>,
}

/// `Mysqlx.Crud.CreateView`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateView {
    #[prost(message, optional, tag = "1")]
    pub collection: Option<Collection>,
    #[prost(string, optional, tag = "2")]
    pub definer: Option<String>,
    #[prost(enumeration = "ViewAlgorithm", optional, tag = "3", default = "Undefined")]
    pub algorithm: Option<i32>,
    #[prost(enumeration = "ViewSqlSecurity", optional, tag = "4", default = "Definer")]
    pub security: Option<i32>,
    #[prost(enumeration = "ViewCheckOption", optional, tag = "5")]
    pub check: Option<i32>,
    #[prost(string, repeated, tag = "6")]
    pub column: Vec<String>,
    #[prost(message, optional, tag = "7")]
    pub stmt: Option<Find>,
    #[prost(bool, optional, tag = "8", default = "false")]
    pub replace_existing: Option<bool>,
}

/// `Mysqlx.Crud.ModifyView`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModifyView {
    #[prost(message, optional, tag = "1")]
    pub collection: Option<Collection>,
    #[prost(string, optional, tag = "2")]
    pub definer: Option<String>,
    #[prost(enumeration = "ViewAlgorithm", optional, tag = "3")]
    pub algorithm: Option<i32>,
    #[prost(enumeration = "ViewSqlSecurity", optional, tag = "4")]
    pub security: Option<i32>,
    #[prost(enumeration = "ViewCheckOption", optional, tag = "5")]
    pub check: Option<i32>,
    #[prost(string, repeated, tag = "6")]
    pub column: Vec<String>,
    #[prost(message, optional, tag = "7")]
    pub stmt: Option<Find>,
}

/// `Mysqlx.Crud.DropView`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DropView {
    #[prost(message, optional, tag = "1")]
    pub collection: Option<Collection>,
    #[prost(bool, optional, tag = "2", default = "false")]
    pub if_exists: Option<bool>,
}
