use std::str::FromStr;

use crate::sql::parser::Keyword;

pub(crate) mod ast;
pub(crate) mod infer_type;
pub(crate) mod lexer;
pub(crate) mod parser;

/// Prints a column, function or table name so that the lexer reads it back
/// as the same identifier: plain when possible, backquoted otherwise.
pub fn quote_identifier(name: &str) -> String {
    let mut chars = name.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        && Keyword::from_str(name).is_err();

    if plain {
        name.to_string()
    } else {
        backquote(name)
    }
}

/// Backquotes `name` unconditionally.
pub fn backquote(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('`');
    for ch in name.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '`' => quoted.push_str("\\`"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            other => quoted.push(other),
        }
    }
    quoted.push('`');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("id"), "id");
        assert_eq!(quote_identifier("n.x"), "n.x");
        assert_eq!(quote_identifier("comment"), "`comment`");
        assert_eq!(quote_identifier("two words"), "`two words`");
        assert_eq!(quote_identifier("1st"), "`1st`");
        assert_eq!(quote_identifier("a`b"), "`a\\`b`");
        assert_eq!(quote_identifier(""), "``");
        assert_eq!(backquote("id"), "`id`");
    }
}
