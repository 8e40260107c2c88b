use std::fmt;

use strum::Display;

use crate::{
    core::{codec::CompressionCodec, types::DataType},
    sql::ast::Expression,
};

/// How a column gets its value when a row does not provide one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum DefaultKind {
    /// Stored; the expression fills in values missing from an insert.
    Default,

    /// Stored; always computed from the expression at write time.
    Materialized,

    /// Not stored; computed from the expression at read time.
    Alias,
}

/// A default kind together with its expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefault {
    pub kind: DefaultKind,
    pub expression: Expression,
}

impl ColumnDefault {
    pub fn new(kind: DefaultKind, expression: Expression) -> Self {
        Self { kind, expression }
    }
}

/// Storage classification of a column, derived from its default kind and
/// its virtual flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Ordinary,
    Materialized,
    Alias,
    Virtual,
}

impl ColumnKind {
    /// Ordinary and materialized columns are the ones a storage engine writes.
    pub fn is_physical(self) -> bool {
        matches!(self, ColumnKind::Ordinary | ColumnKind::Materialized)
    }
}

/// Full description of a single table column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// The column name. A dot marks membership in a nested group
    /// (`group.field`).
    pub name: String,

    /// The data type for values in this column.
    pub data_type: DataType,

    /// `None` for a plain column.
    pub default: Option<ColumnDefault>,

    /// Free text; empty when the column has no comment.
    pub comment: String,

    /// `None` means the default codec.
    pub codec: Option<CompressionCodec>,

    pub ttl: Option<Expression>,

    /// Virtual columns are provided by the storage engine and never stored.
    pub is_virtual: bool,
}

impl ColumnDescriptor {
    /// Creates a plain column with no default, comment, codec or TTL.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            default: None,
            comment: String::new(),
            codec: None,
            ttl: None,
            is_virtual: false,
        }
    }

    pub fn virtual_column(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            is_virtual: true,
            ..Self::new(name, data_type)
        }
    }

    pub fn with_default(mut self, kind: DefaultKind, expression: Expression) -> Self {
        self.default = Some(ColumnDefault::new(kind, expression));
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn with_ttl(mut self, ttl: Expression) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Classifies the column. The virtual flag wins over the default kind;
    /// a `DEFAULT` expression does not change how a column is stored.
    pub fn kind(&self) -> ColumnKind {
        if self.is_virtual {
            return ColumnKind::Virtual;
        }

        match self.default.as_ref().map(|default| default.kind) {
            None | Some(DefaultKind::Default) => ColumnKind::Ordinary,
            Some(DefaultKind::Materialized) => ColumnKind::Materialized,
            Some(DefaultKind::Alias) => ColumnKind::Alias,
        }
    }

    pub fn is_physical(&self) -> bool {
        self.kind().is_physical()
    }

    pub fn name_and_type(&self) -> NameAndType {
        NameAndType::new(self.name.clone(), self.data_type.clone())
    }
}

/// A column name with its type; the element of every column view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameAndType {
    pub name: String,
    pub data_type: DataType,
}

impl NameAndType {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

impl fmt::Display for NameAndType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)
    }
}
