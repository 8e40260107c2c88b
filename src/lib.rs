pub(crate) mod common;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod sql;

pub use common::error::{CatalogError, Construct, Result, ValidationReason};
pub use crate::core::{
    codec::{CodecKind, CodecMethod, CompressionCodec},
    types::DataType,
};
pub use db::table::{
    column_def::{ColumnDefault, ColumnDescriptor, ColumnKind, DefaultKind, NameAndType},
    defaults::{DefaultsValidator, SampleBlock, ValidatedDefaults},
    schema::ColumnSet,
    table_def::TableDef,
};
pub use sql::{
    ast::{Expression, Literal, Operator, Subquery, UnsignedFloat, quote_string},
    backquote,
    infer_type::{BuiltinFunctions, FunctionRegistry},
    quote_identifier,
};
