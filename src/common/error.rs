use std::fmt;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::core::types::DataType;

/// Errors produced while maintaining or validating column descriptions.
///
/// Every operation either succeeds completely or returns one of these without
/// having changed anything.
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("Column {name} already exists")]
    #[diagnostic(code(catalog::duplicate_name))]
    DuplicateName { name: String },

    #[error("There is no column or nested group named {name}")]
    #[diagnostic(code(catalog::not_found))]
    NotFound { name: String },

    #[error("Cannot modify column {name}: column name cannot be changed (attempted {attempted})")]
    #[diagnostic(code(catalog::immutable_key))]
    ImmutableKeyViolation { name: String, attempted: String },

    /// Malformed column description text. `position` is a byte offset into
    /// the parsed input.
    #[error("Malformed columns description at position {position}: {message}")]
    #[diagnostic(code(catalog::format))]
    Format {
        position: usize,
        message: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("Invalid default expression for column {column}: {reason}")]
    #[diagnostic(code(catalog::validation))]
    Validation {
        column: String,
        reason: ValidationReason,
    },

    #[error("Default expression for column {column} references {reference}, which is not declared before it")]
    #[diagnostic(
        code(catalog::unresolved_reference),
        help("a default expression can only use columns declared earlier in the table")
    )]
    UnresolvedReference { column: String, reference: String },
}

impl CatalogError {
    pub(crate) fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub(crate) fn duplicate(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    pub(crate) fn format(position: usize, message: impl Into<String>) -> Self {
        Self::Format {
            position,
            message: message.into(),
            span: (position, 0).into(),
        }
    }

    pub(crate) fn validation(column: impl Into<String>, reason: ValidationReason) -> Self {
        Self::Validation {
            column: column.into(),
            reason,
        }
    }
}

/// Why a default expression was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationReason {
    /// The expression type cannot be converted to the declared column type.
    TypeMismatch { found: DataType, expected: DataType },

    DisallowedConstruct(Construct),

    /// The expression is well formed but has no type (unknown function,
    /// operator applied to unsupported operands, ...).
    Inference(String),
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationReason::TypeMismatch { found, expected } => write!(
                f,
                "expression of type {found} cannot be converted to column type {expected}"
            ),
            ValidationReason::DisallowedConstruct(construct) => {
                write!(f, "{construct} is not allowed in default expressions")
            }
            ValidationReason::Inference(message) => write!(f, "{message}"),
        }
    }
}

/// Expression constructs that may never appear in a default expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    Subquery,
    ArrayJoin,
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Construct::Subquery => write!(f, "a subquery"),
            Construct::ArrayJoin => write!(f, "arrayJoin"),
        }
    }
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;
