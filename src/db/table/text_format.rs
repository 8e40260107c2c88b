//! Text serialization of column descriptions.
//!
//! ```text
//! columns format version: 1
//! 2 columns:
//! `id`	UInt64
//! `name`	String	DEFAULT 'n/a'	COMMENT 'user name'
//! ```
//!
//! Each column is one line: the backquoted name, the type, then whichever of
//! `DEFAULT|MATERIALIZED|ALIAS <expr>`, `COMMENT '<text>'`, `CODEC(...)`,
//! `TTL <expr>` and `VIRTUAL` apply, in that order, separated by tabs.

use std::{
    collections::HashSet,
    fmt::{self, Write},
    str::FromStr,
};

use super::{
    column_def::{ColumnDescriptor, DefaultKind},
    schema::ColumnSet,
};
use crate::{
    CatalogError,
    common::error::Result,
    sql::{
        ast::quote_string,
        backquote,
        lexer::Token,
        parser::{Keyword, Parser},
    },
};

const FORMAT_VERSION: u64 = 1;

impl ColumnDescriptor {
    /// Writes the column as a single line, without the trailing newline.
    pub fn write_text(&self, out: &mut impl Write) -> fmt::Result {
        write!(out, "{}\t{}", backquote(&self.name), self.data_type)?;

        if let Some(default) = &self.default {
            write!(out, "\t{} {}", default.kind, default.expression)?;
        }
        if !self.comment.is_empty() {
            write!(out, "\t{} {}", Keyword::Comment, quote_string(&self.comment))?;
        }
        if let Some(codec) = &self.codec {
            write!(out, "\t{codec}")?;
        }
        if let Some(ttl) = &self.ttl {
            write!(out, "\t{} {ttl}", Keyword::Ttl)?;
        }
        if self.is_virtual {
            write!(out, "\t{}", Keyword::Virtual)?;
        }

        Ok(())
    }

    /// Reads one column line as written by [`ColumnDescriptor::write_text`].
    pub fn read_text(text: &str) -> Result<Self> {
        let mut parser = Parser::new(text);
        let (column, _) = read_column(&mut parser)?;
        parser.finish()?;
        Ok(column)
    }
}

/// Parses a column clause, returning it with the position of its name.
fn read_column(parser: &mut Parser<'_>) -> Result<(ColumnDescriptor, usize)> {
    let (name, position) = parser.expect_identifier()?;
    let data_type = parser.parse_type()?;
    let mut column = ColumnDescriptor::new(name, data_type);

    let kind = if parser.consume_keyword(Keyword::Default) {
        Some(DefaultKind::Default)
    } else if parser.consume_keyword(Keyword::Materialized) {
        Some(DefaultKind::Materialized)
    } else if parser.consume_keyword(Keyword::Alias) {
        Some(DefaultKind::Alias)
    } else {
        None
    };
    if let Some(kind) = kind {
        let expression = parser.parse_expression(0)?;
        column = column.with_default(kind, expression);
    }

    if parser.consume_keyword(Keyword::Comment) {
        column.comment = parser.expect_string()?;
    }

    if parser.peek_keyword(Keyword::Codec) {
        column.codec = Some(parser.parse_codec()?);
    }

    if parser.consume_keyword(Keyword::Ttl) {
        column.ttl = Some(parser.parse_expression(0)?);
    }

    column.is_virtual = parser.consume_keyword(Keyword::Virtual);

    Ok((column, position))
}

impl fmt::Display for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_text(f)
    }
}

impl fmt::Display for ColumnSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "columns format version: {FORMAT_VERSION}")?;
        writeln!(f, "{} columns:", self.len())?;

        for column in self {
            column.write_text(f)?;
            writeln!(f)?;
        }

        Ok(())
    }
}

impl ColumnSet {
    /// Parses the text produced by `to_string`.
    ///
    /// Errors report the byte offset of the first malformed token. A column
    /// count that does not match the header and repeated column names are
    /// format errors too.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parser = Parser::new(text);

        parser.expect_keyword(Keyword::Columns)?;
        parser.expect_keyword(Keyword::Format)?;
        parser.expect_keyword(Keyword::Version)?;
        parser.expect_token(Token::Colon)?;
        let (version, version_position) = parser.expect_integer()?;
        if version != FORMAT_VERSION {
            return Err(parser.error_at(
                version_position,
                format!("Unsupported columns format version {version}"),
            ));
        }

        let (count, _) = parser.expect_integer()?;
        parser.expect_keyword(Keyword::Columns)?;
        parser.expect_token(Token::Colon)?;

        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for _ in 0..count {
            let (column, position) = read_column(&mut parser)?;
            if !seen.insert(column.name.clone()) {
                return Err(parser.error_at(
                    position,
                    format!("Duplicate column {}", column.name),
                ));
            }
            columns.push(column);
        }

        if !parser.is_at_end() {
            let position = parser.position();
            return Err(parser.error_at(
                position,
                format!("Expected {count} columns, found more"),
            ));
        }
        parser.finish()?;

        ColumnSet::from_columns(columns)
    }
}

impl FromStr for ColumnSet {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{
            codec::{CodecKind, CodecMethod, CompressionCodec},
            types::DataType,
        },
        sql::ast::Expression,
    };

    fn create_full_set() -> ColumnSet {
        ColumnSet::from_columns([
            ColumnDescriptor::new("id", DataType::UInt64),
            ColumnDescriptor::new("event date", DataType::Date)
                .with_default(DefaultKind::Default, "today()".parse().unwrap()),
            ColumnDescriptor::new("total", DataType::Float64)
                .with_default(DefaultKind::Materialized, "id * 2.5".parse().unwrap())
                .with_comment("it's\tcomputed"),
            ColumnDescriptor::new("label", DataType::Nullable(Box::new(DataType::String)))
                .with_default(DefaultKind::Alias, "toString(id)".parse().unwrap()),
            ColumnDescriptor::new("payload", DataType::String)
                .with_codec(
                    CompressionCodec::new(vec![
                        CodecMethod::new(CodecKind::Delta, Some(4)).unwrap(),
                        CodecMethod::new(CodecKind::Zstd, Some(3)).unwrap(),
                    ])
                    .unwrap(),
                )
                .with_ttl(Expression::identifier("event date")),
            ColumnDescriptor::virtual_column("_part", DataType::String),
        ])
        .unwrap()
    }

    #[test]
    fn test_write_text() {
        let set = ColumnSet::from_columns([
            ColumnDescriptor::new("id", DataType::UInt64),
            ColumnDescriptor::new("name", DataType::String)
                .with_default(DefaultKind::Default, "'n/a'".parse().unwrap())
                .with_comment("user name"),
        ])
        .unwrap();

        assert_eq!(
            set.to_string(),
            "columns format version: 1\n\
             2 columns:\n\
             `id`\tUInt64\n\
             `name`\tString\tDEFAULT 'n/a'\tCOMMENT 'user name'\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let set = create_full_set();
        let text = set.to_string();

        assert_eq!(ColumnSet::parse(&text).unwrap(), set);
    }

    #[test]
    fn test_round_trip_empty() {
        let set = ColumnSet::new();
        assert_eq!(set.to_string().parse::<ColumnSet>().unwrap(), set);
    }

    #[test]
    fn test_read_text_single_column() {
        let column =
            ColumnDescriptor::read_text("`x` UInt8 ALIAS y + 1 COMMENT 'c' TTL d VIRTUAL").unwrap();

        assert_eq!(column.name, "x");
        assert_eq!(column.data_type, DataType::UInt8);
        assert_eq!(
            column.default.as_ref().map(|default| default.kind),
            Some(DefaultKind::Alias)
        );
        assert_eq!(column.comment, "c");
        assert_eq!(column.ttl, Some(Expression::identifier("d")));
        assert!(column.is_virtual);

        assert_eq!(
            ColumnDescriptor::read_text(&column.to_string()).unwrap(),
            column
        );
    }

    #[test]
    fn test_unknown_type_position() {
        let text = "columns format version: 1\n1 columns:\n`x`\tUInt99\n";
        let err = ColumnSet::parse(text).unwrap_err();

        assert!(matches!(err, CatalogError::Format { position, .. } if position == 41));
    }

    #[test]
    fn test_unsupported_version() {
        let err = ColumnSet::parse("columns format version: 2\n0 columns:\n").unwrap_err();
        assert!(matches!(err, CatalogError::Format { position: 24, .. }));
    }

    #[test]
    fn test_column_count_mismatch() {
        let text = "columns format version: 1\n2 columns:\n`x`\tUInt8\n";
        let err = ColumnSet::parse(text).unwrap_err();
        assert!(matches!(err, CatalogError::Format { position, .. } if position == text.len()));

        let text = "columns format version: 1\n1 columns:\n`x`\tUInt8\n`y`\tUInt8\n";
        let err = ColumnSet::parse(text).unwrap_err();
        assert!(matches!(err, CatalogError::Format { position: 47, .. }));
    }

    #[test]
    fn test_duplicate_column_is_format_error() {
        let text = "columns format version: 1\n2 columns:\n`x`\tUInt8\n`x`\tString\n";
        let err = ColumnSet::parse(text).unwrap_err();
        assert!(matches!(err, CatalogError::Format { position: 47, .. }));
    }

    #[test]
    fn test_bad_codec_parameter() {
        let text = "columns format version: 1\n1 columns:\n`x`\tUInt8\tCODEC(LZ4HC(40))\n";
        let err = ColumnSet::parse(text).unwrap_err();
        assert!(matches!(err, CatalogError::Format { position: 59, .. }));
    }
}
