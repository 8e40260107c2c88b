use std::{borrow::Cow, str::FromStr};

use crate::{
    CatalogError,
    common::error::Result,
    sql::{ast::UnsignedFloat, parser::Keyword},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    Keyword(Keyword),
    Identifier(&'a str),
    /// Backquoted identifier, escapes already resolved.
    QuotedIdentifier(Cow<'a, str>),
    Integer(u64),
    Float(UnsignedFloat),
    String(Cow<'a, str>),

    Comma,
    Colon,

    Plus,
    Minus,
    Asterisk,
    Slash,
    Percent,

    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,

    LeftParen,
    RightParen,
}

/// A token together with the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<'a> {
    pub token: Token<'a>,
    pub position: usize,
}

pub(crate) struct Lexer<'a> {
    pub rest: &'a str,
    pub position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            rest: input,
            position: 0,
        }
    }

    fn skip_whitespace(&mut self) {
        let non_whitespace_pos = self
            .rest
            .char_indices()
            .find(|(_, ch)| !ch.is_whitespace())
            .map(|(pos, _)| pos)
            .unwrap_or(self.rest.len());

        self.advance(non_whitespace_pos);
    }

    fn advance(&mut self, bytes: usize) {
        self.position += bytes;
        self.rest = &self.rest[bytes..];
    }

    fn consume_word(&mut self) -> &'a str {
        let word_index = self
            .rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(self.rest.len());

        let word = &self.rest[..word_index];
        self.advance(word_index);

        word
    }

    /// Consumes a quoted run starting at the opening `quote`. Backslash
    /// escapes are resolved; the result borrows from the input when there
    /// were none.
    fn consume_quoted(&mut self, quote: char) -> Result<Cow<'a, str>> {
        let start = self.position;
        let body = &self.rest[1..];

        let mut owned: Option<String> = None;
        let mut chars = body.char_indices();

        while let Some((index, ch)) = chars.next() {
            if ch == quote {
                let value = match owned {
                    Some(value) => Cow::Owned(value),
                    None => Cow::Borrowed(&body[..index]),
                };
                self.advance(1 + index + 1);
                return Ok(value);
            }

            if ch == '\\' {
                let Some((_, escaped)) = chars.next() else {
                    break;
                };
                let value = owned.get_or_insert_with(|| body[..index].to_string());
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => other,
                });
                continue;
            }

            if let Some(value) = owned.as_mut() {
                value.push(ch);
            }
        }

        Err(CatalogError::format(
            start,
            format!("Unterminated {quote}-quoted literal"),
        ))
    }

    fn consume_number(&mut self) -> Result<Token<'a>> {
        let start = self.position;
        let bytes = self.rest.as_bytes();

        let mut end = 0;
        let mut is_float = false;
        while end < bytes.len() {
            match bytes[end] {
                b'0'..=b'9' => end += 1,
                b'.' if !is_float => {
                    is_float = true;
                    end += 1;
                }
                b'e' | b'E' => {
                    is_float = true;
                    end += 1;
                    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
                        end += 1;
                    }
                }
                _ => break,
            }
        }

        let number_str = &self.rest[..end];
        self.advance(end);

        if is_float {
            match number_str.parse::<f64>().ok().and_then(UnsignedFloat::new) {
                Some(num) => Ok(Token::Float(num)),
                None => Err(CatalogError::format(
                    start,
                    format!("Invalid number format: {number_str}"),
                )),
            }
        } else {
            number_str.parse::<u64>().map(Token::Integer).map_err(|_| {
                CatalogError::format(start, format!("Integer out of range: {number_str}"))
            })
        }
    }

    fn single(&mut self, token: Token<'a>, len: usize) -> Result<Token<'a>> {
        self.advance(len);
        Ok(token)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Spanned<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();

        let position = self.position;
        let char = self.rest.chars().next()?;
        let second = self.rest.chars().nth(1);

        let token = match char {
            ',' => self.single(Token::Comma, 1),
            ':' => self.single(Token::Colon, 1),
            '+' => self.single(Token::Plus, 1),
            '-' => self.single(Token::Minus, 1),
            '*' => self.single(Token::Asterisk, 1),
            '/' => self.single(Token::Slash, 1),
            '%' => self.single(Token::Percent, 1),
            '(' => self.single(Token::LeftParen, 1),
            ')' => self.single(Token::RightParen, 1),
            '=' if second == Some('=') => self.single(Token::Equal, 2),
            '=' => self.single(Token::Equal, 1),
            '!' if second == Some('=') => self.single(Token::NotEqual, 2),
            '<' if second == Some('>') => self.single(Token::NotEqual, 2),
            '<' if second == Some('=') => self.single(Token::LessThanEqual, 2),
            '<' => self.single(Token::LessThan, 1),
            '>' if second == Some('=') => self.single(Token::GreaterThanEqual, 2),
            '>' => self.single(Token::GreaterThan, 1),
            '\'' => self.consume_quoted('\'').map(Token::String),
            '`' => self.consume_quoted('`').map(Token::QuotedIdentifier),
            _ if char.is_ascii_digit() => self.consume_number(),
            _ if char.is_alphabetic() || char == '_' => {
                let word = self.consume_word();

                match Keyword::from_str(word) {
                    Ok(keyword) => Ok(Token::Keyword(keyword)),
                    Err(_) => Ok(Token::Identifier(word)),
                }
            }
            _ => Err(CatalogError::format(
                position,
                format!("Unexpected character '{char}'"),
            )),
        };

        if token.is_err() {
            // Stop after the first error.
            self.rest = "";
        }

        Some(token.map(|token| Spanned { token, position }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float(value: f64) -> UnsignedFloat {
        UnsignedFloat::new(value).unwrap()
    }

    fn tokens(input: &str) -> Vec<Token<'_>> {
        Lexer::new(input)
            .map(|spanned| spanned.unwrap().token)
            .collect()
    }

    #[test]
    fn test_lexer_default_clause() {
        assert_eq!(
            tokens("DEFAULT (a + 1)"),
            vec![
                Token::Keyword(Keyword::Default),
                Token::LeftParen,
                Token::Identifier("a"),
                Token::Plus,
                Token::Integer(1),
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_lexer_keywords_are_case_insensitive() {
        assert_eq!(
            tokens("materialized Alias codec"),
            vec![
                Token::Keyword(Keyword::Materialized),
                Token::Keyword(Keyword::Alias),
                Token::Keyword(Keyword::Codec),
            ]
        );
    }

    #[test]
    fn test_lexer_dotted_and_quoted_identifiers() {
        assert_eq!(
            tokens("n.x `weird name` `a\\`b`"),
            vec![
                Token::Identifier("n.x"),
                Token::QuotedIdentifier(Cow::Borrowed("weird name")),
                Token::QuotedIdentifier(Cow::Owned("a`b".to_string())),
            ]
        );
    }

    #[test]
    fn test_lexer_strings_and_numbers() {
        assert_eq!(
            tokens("'it\\'s' 42 1.5 2e3 <= <> !="),
            vec![
                Token::String(Cow::Owned("it's".to_string())),
                Token::Integer(42),
                Token::Float(float(1.5)),
                Token::Float(float(2000.0)),
                Token::LessThanEqual,
                Token::NotEqual,
                Token::NotEqual,
            ]
        );
    }

    #[test]
    fn test_lexer_positions() {
        let positions: Vec<usize> = Lexer::new("  `id`\tUInt64")
            .map(|spanned| spanned.unwrap().position)
            .collect();

        assert_eq!(positions, vec![2, 7]);
    }

    #[test]
    fn test_lexer_unterminated_string() {
        let mut lexer = Lexer::new("x 'abc");
        assert!(lexer.next().unwrap().is_ok());

        let err = lexer.next().unwrap().unwrap_err();
        assert!(matches!(err, CatalogError::Format { position: 2, .. }));
        assert!(lexer.next().is_none());
    }

    #[test]
    fn test_lexer_unexpected_character() {
        let err = Lexer::new("a ? b").nth(1).unwrap().unwrap_err();
        assert!(matches!(err, CatalogError::Format { position: 2, .. }));
    }
}
