use strum::{Display, EnumString};

/// Keywords recognized by the lexer.
///
/// These keywords are case-insensitive and reserved: a column with one of
/// these names has to be backquoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum Keyword {
    // Column clauses
    Default,
    Materialized,
    Alias,
    Comment,
    Codec,
    Ttl,
    Virtual,

    // Format header
    Columns,
    Format,
    Version,

    // Expressions
    And,
    Or,
    Null,
    Cast,
    As,
    Select,
    From,
}
