use std::{fmt, str::FromStr};

use strum::EnumString;

use crate::{CatalogError, sql::parser::Parser};

/// Column data types understood by the catalog.
///
/// The names follow the engine's SQL dialect (`UInt8`, `Nullable(String)`,
/// `Nested(a UInt8, b String)`, ...). Parsing goes through [`FromStr`] and
/// [`fmt::Display`] prints the canonical name back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,

    /// Variable-length byte string.
    String,

    /// Byte string of exactly N bytes.
    FixedString(usize),

    /// Calendar day.
    Date,

    /// Unix timestamp with second precision.
    DateTime,

    Array(Box<DataType>),
    Nullable(Box<DataType>),

    /// Compound column made of named sub-fields. Tables never store it
    /// directly: see [`crate::ColumnSet::flatten_nested`].
    Nested(Vec<(String, DataType)>),

    /// Type of a bare `NULL`. Only ever appears wrapped in `Nullable`.
    Nothing,
}

/// Type names as they appear in text, without arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
pub(crate) enum TypeName {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    FixedString,
    Date,
    DateTime,
    Array,
    Nullable,
    Nested,
    Nothing,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::UInt8 => write!(f, "UInt8"),
            DataType::UInt16 => write!(f, "UInt16"),
            DataType::UInt32 => write!(f, "UInt32"),
            DataType::UInt64 => write!(f, "UInt64"),
            DataType::Int8 => write!(f, "Int8"),
            DataType::Int16 => write!(f, "Int16"),
            DataType::Int32 => write!(f, "Int32"),
            DataType::Int64 => write!(f, "Int64"),
            DataType::Float32 => write!(f, "Float32"),
            DataType::Float64 => write!(f, "Float64"),
            DataType::String => write!(f, "String"),
            DataType::FixedString(n) => write!(f, "FixedString({n})"),
            DataType::Date => write!(f, "Date"),
            DataType::DateTime => write!(f, "DateTime"),
            DataType::Array(inner) => write!(f, "Array({inner})"),
            DataType::Nullable(inner) => write!(f, "Nullable({inner})"),
            DataType::Nested(fields) => {
                write!(f, "Nested(")?;
                for (i, (name, data_type)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {data_type}", crate::sql::quote_identifier(name))?;
                }
                write!(f, ")")
            }
            DataType::Nothing => write!(f, "Nothing"),
        }
    }
}

impl FromStr for DataType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parser::new(s).parse_type_only()
    }
}

impl DataType {
    pub fn is_integer(&self) -> bool {
        self.integer_width().is_some()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        ) || self.is_float()
    }

    pub fn is_string(&self) -> bool {
        matches!(self, DataType::String | DataType::FixedString(_))
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, DataType::Nested(_))
    }

    /// Width in bits of an integer type.
    pub fn integer_width(&self) -> Option<u32> {
        match self {
            DataType::UInt8 | DataType::Int8 => Some(8),
            DataType::UInt16 | DataType::Int16 => Some(16),
            DataType::UInt32 | DataType::Int32 => Some(32),
            DataType::UInt64 | DataType::Int64 => Some(64),
            _ => None,
        }
    }

    /// Integer type of the given width, saturating at 64 bits.
    pub fn integer_of_width(bits: u32, signed: bool) -> DataType {
        match (bits, signed) {
            (0..=8, false) => DataType::UInt8,
            (9..=16, false) => DataType::UInt16,
            (17..=32, false) => DataType::UInt32,
            (_, false) => DataType::UInt64,
            (0..=8, true) => DataType::Int8,
            (9..=16, true) => DataType::Int16,
            (17..=32, true) => DataType::Int32,
            (_, true) => DataType::Int64,
        }
    }

    /// Smallest unsigned type able to hold `value`; the type of an integer
    /// literal.
    pub fn smallest_unsigned_for(value: u64) -> DataType {
        if value <= u8::MAX as u64 {
            DataType::UInt8
        } else if value <= u16::MAX as u64 {
            DataType::UInt16
        } else if value <= u32::MAX as u64 {
            DataType::UInt32
        } else {
            DataType::UInt64
        }
    }

    /// The type without a `Nullable` wrapper.
    pub fn strip_nullable(&self) -> &DataType {
        match self {
            DataType::Nullable(inner) => inner,
            other => other,
        }
    }

    /// Whether a value of this type may be stored in a column of type `to`
    /// without an explicit `CAST`.
    pub fn can_convert(&self, to: &DataType) -> bool {
        if self == to {
            return true;
        }

        match (self, to) {
            (DataType::Nothing, DataType::Nullable(_)) => true,
            (DataType::Nullable(from), DataType::Nullable(_)) if **from == DataType::Nothing => {
                true
            }
            (DataType::Nullable(from), DataType::Nullable(to)) => from.can_convert(to),
            (from, DataType::Nullable(to)) => from.can_convert(to),
            (DataType::Array(from), DataType::Array(to)) => from.can_convert(to),
            (from, to) if from.is_numeric() && to.is_numeric() => true,
            (from, to) if from.is_string() && to.is_string() => true,
            (DataType::Date, DataType::DateTime) | (DataType::DateTime, DataType::Date) => true,
            (from, DataType::Date | DataType::DateTime) => from.is_integer() || from.is_string(),
            _ => false,
        }
    }

    /// Whether `CAST(x AS to)` is accepted for an `x` of this type. Wider
    /// than [`DataType::can_convert`]: numbers and dates may be formatted to
    /// strings and a nullable value may be forced to its non-nullable type.
    pub fn can_cast(&self, to: &DataType) -> bool {
        if self.can_convert(to) {
            return true;
        }

        match (self, to) {
            (DataType::Nullable(from), to) => from.can_cast(to),
            (DataType::Array(from), DataType::Array(to)) => from.can_cast(to),
            (from, to) if to.is_string() => {
                from.is_numeric() || matches!(from, DataType::Date | DataType::DateTime)
            }
            (from, to) if to.is_numeric() => {
                from.is_string() || matches!(from, DataType::Date | DataType::DateTime)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_print_type_names() {
        for name in [
            "UInt8",
            "Int64",
            "Float32",
            "String",
            "FixedString(16)",
            "Date",
            "DateTime",
            "Array(Nullable(UInt32))",
            "Nested(a UInt8, b Array(String))",
        ] {
            let data_type: DataType = name.parse().unwrap();
            assert_eq!(data_type.to_string(), name);
        }
    }

    #[test]
    fn test_unknown_type_name_is_rejected() {
        let err = "UInt128".parse::<DataType>().unwrap_err();
        assert!(matches!(err, CatalogError::Format { position: 0, .. }));

        let err = "Array(Strin)".parse::<DataType>().unwrap_err();
        assert!(matches!(err, CatalogError::Format { position: 6, .. }));
    }

    #[test]
    fn test_implicit_conversion() {
        assert!(DataType::UInt16.can_convert(&DataType::UInt8));
        assert!(DataType::UInt8.can_convert(&DataType::Float64));
        assert!(DataType::String.can_convert(&DataType::FixedString(4)));
        assert!(DataType::UInt32.can_convert(&DataType::DateTime));
        let null = DataType::Nullable(Box::new(DataType::Nothing));
        assert!(null.can_convert(&DataType::Nullable(Box::new(DataType::String))));
        assert!(!null.can_convert(&DataType::String));
        assert!(DataType::UInt8.can_convert(&DataType::Nullable(Box::new(DataType::Int64))));
        assert!(
            DataType::Array(Box::new(DataType::UInt8))
                .can_convert(&DataType::Array(Box::new(DataType::Int32)))
        );

        assert!(!DataType::String.can_convert(&DataType::UInt8));
        assert!(!DataType::Nothing.can_convert(&DataType::UInt8));
        assert!(!DataType::Nullable(Box::new(DataType::UInt8)).can_convert(&DataType::UInt8));
        assert!(!DataType::UInt8.can_convert(&DataType::Array(Box::new(DataType::UInt8))));
    }

    #[test]
    fn test_explicit_cast_is_wider() {
        assert!(DataType::UInt8.can_cast(&DataType::String));
        assert!(DataType::String.can_cast(&DataType::UInt8));
        assert!(DataType::Nullable(Box::new(DataType::UInt8)).can_cast(&DataType::UInt8));
        assert!(!DataType::String.can_cast(&DataType::Array(Box::new(DataType::String))));
    }

    #[test]
    fn test_literal_types() {
        assert_eq!(DataType::smallest_unsigned_for(1), DataType::UInt8);
        assert_eq!(DataType::smallest_unsigned_for(256), DataType::UInt16);
        assert_eq!(DataType::smallest_unsigned_for(86_400), DataType::UInt32);
        assert_eq!(DataType::smallest_unsigned_for(u64::MAX), DataType::UInt64);
    }
}
