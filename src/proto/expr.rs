//! `Mysqlx.Expr`: the expression tree used by CRUD criteria, projections
//! and update operations.

use super::datatypes::Scalar;

/// `Mysqlx.Expr.Expr`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Expr {
    #[prost(enumeration = "expr::Type", required, tag = "1")]
    pub r#type: i32,
    #[prost(message, optional, tag = "2")]
    pub identifier: Option<ColumnIdentifier>,
    #[prost(string, optional, tag = "3")]
    pub variable: Option<String>,
    #[prost(message, optional, tag = "4")]
    pub literal: Option<Scalar>,
    #[prost(message, optional, tag = "5")]
    pub function_call: Option<FunctionCall>,
    #[prost(message, optional, tag = "6")]
    pub operator: Option<Operator>,
    #[prost(uint32, optional, tag = "7")]
    pub position: Option<u32>,
    #[prost(message, optional, tag = "8")]
    pub object: Option<Object>,
    #[prost(message, optional, tag = "9")]
    pub array: Option<Array>,
}

pub mod expr {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
        Ident = 1,
        Literal = 2,
        Variable = 3,
        FuncCall = 4,
        Operator = 5,
        Placeholder = 6,
        Object = 7,
        Array = 8,
    }
}

impl Expr {
    pub fn literal(scalar: Scalar) -> Self {
        Self {
            r#type: expr::Type::Literal as i32,
            literal: Some(scalar),
            ..Self::default()
        }
    }
}

/// `Mysqlx.Expr.Identifier`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Identifier {
    #[prost(string, required, tag = "1")]
    pub name: String,
    #[prost(string, optional, tag = "2")]
    pub schema_name: Option<String>,
}

/// `Mysqlx.Expr.DocumentPathItem`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DocumentPathItem {
    #[prost(enumeration = "document_path_item::Type", required, tag = "1")]
    pub r#type: i32,
    #[prost(string, optional, tag = "2")]
    pub value: Option<String>,
    #[prost(uint32, optional, tag = "3")]
    pub index: Option<u32>,
}

pub mod document_path_item {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
        Member = 1,
        MemberAsterisk = 2,
        ArrayIndex = 3,
        ArrayIndexAsterisk = 4,
        DoubleAsterisk = 5,
    }
}

/// `Mysqlx.Expr.ColumnIdentifier`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ColumnIdentifier {
    #[prost(message, repeated, tag = "1")]
    pub document_path: Vec<DocumentPathItem>,
    #[prost(string, optional, tag = "2")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub table_name: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub schema_name: Option<String>,
}

/// `Mysqlx.Expr.FunctionCall`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FunctionCall {
    #[prost(message, optional, tag = "1")]
    pub name: Option<Identifier>,
    #[prost(message, repeated, tag = "2")]
    pub param: Vec<Expr>,
}

/// `Mysqlx.Expr.Operator`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Operator {
    #[prost(string, required, tag = "1")]
    pub name: String,
    #[prost(message, repeated, tag = "2")]
    pub param: Vec<Expr>,
}

/// `Mysqlx.Expr.Object`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Object {
    #[prost(message, repeated, tag = "1")]
    pub fld: Vec<object::ObjectField>,
}

pub mod object {
    /// `Mysqlx.Expr.Object.ObjectField`
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ObjectField {
        #[prost(string, required, tag = "1")]
        pub key: String,
        #[prost(message, optional, tag = "2")]
        pub value: Option<super::Expr>,
    }
}

/// `Mysqlx.Expr.Array`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Array {
    #[prost(message, repeated, tag = "1")]
    pub value: Vec<Expr>,
}
