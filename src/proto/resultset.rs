//! `Mysqlx.Resultset`: column metadata, rows and the terminal markers.

/// `Mysqlx.Resultset.ColumnMetaData`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ColumnMetaData {
    #[prost(enumeration = "column_meta_data::FieldType", required, tag = "1")]
    pub r#type: i32,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub name: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub original_name: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub table: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "5")]
    pub original_table: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "6")]
    pub schema: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "7")]
    pub catalog: Option<Vec<u8>>,
    #[prost(uint64, optional, tag = "8")]
    pub collation: Option<u64>,
    #[prost(uint32, optional, tag = "9")]
    pub fractional_digits: Option<u32>,
    #[prost(uint32, optional, tag = "10")]
    pub length: Option<u32>,
    #[prost(uint32, optional, tag = "11")]
    pub flags: Option<u32>,
    #[prost(uint32, optional, tag = "12")]
    pub content_type: Option<u32>,
}

pub mod column_meta_data {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum FieldType {
        Sint = 1,
        Uint = 2,
        Double = 5,
        Float = 6,
        Bytes = 7,
        Time = 10,
        Datetime = 12,
        Set = 15,
        Enum = 16,
        Bit = 17,
        Decimal = 18,
    }
}

/// `Mysqlx.Resultset.Row`
///
/// Each field is an opaque byte cell; its interpretation depends on the
/// column type. A zero-length cell is SQL NULL.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Row {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub field: Vec<Vec<u8>>,
}

/// `Mysqlx.Resultset.FetchDone`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FetchDone {}

/// `Mysqlx.Resultset.FetchDoneMoreResultsets`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FetchDoneMoreResultsets {}

/// `Mysqlx.Resultset.FetchDoneMoreOutParams`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FetchDoneMoreOutParams {}

/// `Mysqlx.Resultset.FetchSuspended`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FetchSuspended {}
