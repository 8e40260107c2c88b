use std::str::FromStr;

use crate::{
    CatalogError,
    common::error::Result,
    core::{
        codec::{CodecKind, CodecMethod, CompressionCodec},
        types::{DataType, TypeName},
    },
    sql::{
        ast::{Expression, Literal, Operator, Subquery},
        lexer::{Lexer, Spanned, Token},
    },
};

pub(crate) use keyword::Keyword;

pub(crate) mod keyword;

/// Binding power of unary minus; tighter than any binary operator.
const PREFIX_PRECEDENCE: u8 = 11;

/// Recursive descent parser for expressions, data types, codecs and the
/// column description format.
///
/// The input is tokenized up front. A lexer error is kept aside and reported
/// once parsing reaches it, so the error always names the first malformed
/// token.
pub(crate) struct Parser<'src> {
    tokens: Vec<Spanned<'src>>,
    cursor: usize,
    lex_error: Option<CatalogError>,
    end: usize,
}

impl<'src> Parser<'src> {
    pub fn new(input: &'src str) -> Self {
        let mut tokens = Vec::new();
        let mut lex_error = None;

        for item in Lexer::new(input) {
            match item {
                Ok(spanned) => tokens.push(spanned),
                Err(err) => {
                    lex_error = Some(err);
                    break;
                }
            }
        }

        Self {
            tokens,
            cursor: 0,
            lex_error,
            end: input.len(),
        }
    }

    pub fn parse_expression_only(mut self) -> Result<Expression> {
        let expr = self.parse_expression(0)?;
        self.finish()?;
        Ok(expr)
    }

    pub fn parse_type_only(mut self) -> Result<DataType> {
        let data_type = self.parse_type()?;
        self.finish()?;
        Ok(data_type)
    }

    pub fn parse_codec_only(mut self) -> Result<CompressionCodec> {
        let codec = self.parse_codec()?;
        self.finish()?;
        Ok(codec)
    }

    /// Fails unless all input has been consumed.
    pub fn finish(&mut self) -> Result<()> {
        if let Some(spanned) = self.tokens.get(self.cursor) {
            let position = spanned.position;
            let message = format!("Unexpected trailing input {:?}", spanned.token);
            return Err(self.error_at(position, message));
        }

        match self.lex_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn parse_expression(&mut self, min_prec: u8) -> Result<Expression> {
        let mut lhs = self.parse_primary()?;

        while let Some(op) = self.peek_binary_op() {
            if op.precedence() < min_prec {
                break;
            }

            // consume op
            self.cursor += 1;

            let rhs = self.parse_expression(op.precedence() + 1)?;
            lhs = Expression::binary(lhs, op, rhs);
        }

        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let Spanned { token, position } = self.next_token()?;

        let expr = match token {
            Token::Integer(n) => Expression::Literal(Literal::UInt(n)),
            Token::Float(num) => Expression::Literal(Literal::Float(num)),
            Token::String(s) => Expression::Literal(Literal::String(s.into_owned())),
            Token::Keyword(Keyword::Null) => Expression::Literal(Literal::Null),
            Token::Keyword(Keyword::Cast) => self.parse_cast()?,
            Token::Minus => {
                Expression::Negate(Box::new(self.parse_expression(PREFIX_PRECEDENCE)?))
            }
            Token::Identifier(name) => self.parse_identifier_or_call(name.to_string())?,
            Token::QuotedIdentifier(name) => self.parse_identifier_or_call(name.into_owned())?,
            Token::LeftParen => {
                if self.consume_keyword(Keyword::Select) {
                    self.parse_subquery()?
                } else {
                    let expr = self.parse_expression(0)?;
                    self.expect_token(Token::RightParen)?;
                    expr
                }
            }
            t => {
                return Err(self.error_at(
                    position,
                    format!("Expected a column or value, but found {t:?}"),
                ));
            }
        };

        Ok(expr)
    }

    fn parse_identifier_or_call(&mut self, name: String) -> Result<Expression> {
        if !self.consume_if(&Token::LeftParen) {
            return Ok(Expression::Identifier(name));
        }

        let mut args = Vec::new();
        if !self.consume_if(&Token::RightParen) {
            loop {
                args.push(self.parse_expression(0)?);
                if !self.consume_if(&Token::Comma) {
                    break;
                }
            }
            self.expect_token(Token::RightParen)?;
        }

        Ok(Expression::Function { name, args })
    }

    fn parse_cast(&mut self) -> Result<Expression> {
        self.expect_token(Token::LeftParen)?;
        let expr = self.parse_expression(0)?;
        self.expect_keyword(Keyword::As)?;
        let to = self.parse_type()?;
        self.expect_token(Token::RightParen)?;

        Ok(expr.cast(to))
    }

    // `(SELECT` has already been consumed.
    fn parse_subquery(&mut self) -> Result<Expression> {
        let projection = self.parse_expression(0)?;
        let from = if self.consume_keyword(Keyword::From) {
            Some(self.expect_identifier()?.0)
        } else {
            None
        };
        self.expect_token(Token::RightParen)?;

        Ok(Expression::Subquery(Box::new(Subquery { projection, from })))
    }

    fn peek_binary_op(&self) -> Option<Operator> {
        let op = match self.peek()? {
            Token::Equal => Operator::Equal,
            Token::NotEqual => Operator::NotEqual,
            Token::GreaterThan => Operator::GreaterThan,
            Token::LessThan => Operator::LessThan,
            Token::GreaterThanEqual => Operator::GreaterThanEqual,
            Token::LessThanEqual => Operator::LessThanEqual,

            Token::Plus => Operator::Add,
            Token::Minus => Operator::Subtract,
            Token::Asterisk => Operator::Multiply,
            Token::Slash => Operator::Divide,
            Token::Percent => Operator::Modulo,

            Token::Keyword(Keyword::And) => Operator::And,
            Token::Keyword(Keyword::Or) => Operator::Or,

            _ => return None,
        };

        Some(op)
    }

    pub fn parse_type(&mut self) -> Result<DataType> {
        let (name, position) = self.expect_identifier()?;
        let type_name = TypeName::from_str(&name)
            .map_err(|_| self.error_at(position, format!("Unknown data type {name}")))?;

        let data_type = match type_name {
            TypeName::UInt8 => DataType::UInt8,
            TypeName::UInt16 => DataType::UInt16,
            TypeName::UInt32 => DataType::UInt32,
            TypeName::UInt64 => DataType::UInt64,
            TypeName::Int8 => DataType::Int8,
            TypeName::Int16 => DataType::Int16,
            TypeName::Int32 => DataType::Int32,
            TypeName::Int64 => DataType::Int64,
            TypeName::Float32 => DataType::Float32,
            TypeName::Float64 => DataType::Float64,
            TypeName::String => DataType::String,
            TypeName::Date => DataType::Date,
            TypeName::DateTime => DataType::DateTime,
            TypeName::Nothing => DataType::Nothing,
            TypeName::FixedString => {
                self.expect_token(Token::LeftParen)?;
                let (size, size_position) = self.expect_integer()?;
                if size == 0 {
                    return Err(self.error_at(size_position, "FixedString size must be positive"));
                }
                self.expect_token(Token::RightParen)?;
                DataType::FixedString(size as usize)
            }
            TypeName::Array => {
                self.expect_token(Token::LeftParen)?;
                let inner = self.parse_type()?;
                self.expect_token(Token::RightParen)?;
                DataType::Array(Box::new(inner))
            }
            TypeName::Nullable => {
                self.expect_token(Token::LeftParen)?;
                let inner_position = self.position();
                let inner = self.parse_type()?;
                if matches!(
                    inner,
                    DataType::Nullable(_) | DataType::Array(_) | DataType::Nested(_)
                ) {
                    return Err(self.error_at(
                        inner_position,
                        format!("Nested type {inner} cannot be inside Nullable type"),
                    ));
                }
                self.expect_token(Token::RightParen)?;
                DataType::Nullable(Box::new(inner))
            }
            TypeName::Nested => self.parse_nested_fields()?,
        };

        Ok(data_type)
    }

    fn parse_nested_fields(&mut self) -> Result<DataType> {
        self.expect_token(Token::LeftParen)?;

        let mut fields: Vec<(String, DataType)> = Vec::new();
        if self.consume_if(&Token::RightParen) {
            return Ok(DataType::Nested(fields));
        }

        loop {
            let (field, position) = self.expect_identifier()?;
            if fields.iter().any(|(existing, _)| *existing == field) {
                return Err(self.error_at(position, format!("Duplicate nested field {field}")));
            }
            let data_type = self.parse_type()?;
            fields.push((field, data_type));

            if !self.consume_if(&Token::Comma) {
                break;
            }
        }

        self.expect_token(Token::RightParen)?;
        Ok(DataType::Nested(fields))
    }

    /// Parses `CODEC(method[, method...])`.
    pub fn parse_codec(&mut self) -> Result<CompressionCodec> {
        let start = self.expect_keyword(Keyword::Codec)?;
        self.expect_token(Token::LeftParen)?;

        let mut methods = Vec::new();
        loop {
            let (name, position) = self.expect_identifier()?;
            let kind = CodecKind::from_str(&name)
                .map_err(|_| self.error_at(position, format!("Unknown codec {name}")))?;

            let mut parameter = None;
            let mut parameter_position = position;
            if self.consume_if(&Token::LeftParen) {
                let (value, value_position) = self.expect_integer()?;
                parameter = Some(value);
                parameter_position = value_position;
                self.expect_token(Token::RightParen)?;
            }

            let method = CodecMethod::new(kind, parameter)
                .map_err(|message| self.error_at(parameter_position, message))?;
            methods.push(method);

            if !self.consume_if(&Token::Comma) {
                break;
            }
        }

        self.expect_token(Token::RightParen)?;
        CompressionCodec::new(methods).map_err(|message| self.error_at(start, message))
    }

    /// Byte offset of the next token, or of the end of input.
    pub fn position(&self) -> usize {
        match self.tokens.get(self.cursor) {
            Some(spanned) => spanned.position,
            None => self.lex_position().unwrap_or(self.end),
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor >= self.tokens.len() && self.lex_error.is_none()
    }

    fn lex_position(&self) -> Option<usize> {
        match &self.lex_error {
            Some(CatalogError::Format { position, .. }) => Some(*position),
            _ => None,
        }
    }

    /// Builds a format error at `position`, unless the lexer already failed
    /// at or before that point; the lexer error is the first malformed token
    /// then.
    pub fn error_at(&mut self, position: usize, message: impl Into<String>) -> CatalogError {
        if self.lex_position().is_some_and(|lexed| position >= lexed) {
            if let Some(err) = self.lex_error.take() {
                return err;
            }
        }

        CatalogError::format(position, message)
    }

    pub fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.cursor).map(|spanned| &spanned.token)
    }

    pub fn next_token(&mut self) -> Result<Spanned<'src>> {
        match self.tokens.get(self.cursor) {
            Some(spanned) => {
                let spanned = spanned.clone();
                self.cursor += 1;
                Ok(spanned)
            }
            None => {
                let position = self.position();
                Err(self.error_at(position, "Unexpected end of input"))
            }
        }
    }

    pub fn expect_token(&mut self, expected: Token<'src>) -> Result<usize> {
        let Spanned { token, position } = self.next_token()?;
        if token == expected {
            Ok(position)
        } else {
            Err(self.error_at(
                position,
                format!("Expected {expected:?}, found {token:?}"),
            ))
        }
    }

    pub fn peek_is(&self, expected: &Token<'src>) -> bool {
        self.peek() == Some(expected)
    }

    pub fn peek_keyword(&self, expected: Keyword) -> bool {
        matches!(self.peek(), Some(Token::Keyword(kw)) if *kw == expected)
    }

    pub fn consume_if(&mut self, expected: &Token<'src>) -> bool {
        if self.peek_is(expected) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    pub fn consume_keyword(&mut self, expected: Keyword) -> bool {
        if self.peek_keyword(expected) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    pub fn expect_keyword(&mut self, expected: Keyword) -> Result<usize> {
        let Spanned { token, position } = self.next_token()?;
        match token {
            Token::Keyword(kw) if kw == expected => Ok(position),
            other => Err(self.error_at(
                position,
                format!("Expected {expected}, found {other:?}"),
            )),
        }
    }

    /// Plain or backquoted identifier, with its position.
    pub fn expect_identifier(&mut self) -> Result<(String, usize)> {
        let Spanned { token, position } = self.next_token()?;
        match token {
            Token::Identifier(ident) => Ok((ident.to_string(), position)),
            Token::QuotedIdentifier(ident) => Ok((ident.into_owned(), position)),
            got => Err(self.error_at(
                position,
                format!("Expected IDENTIFIER, but found {got:?}"),
            )),
        }
    }

    pub fn expect_integer(&mut self) -> Result<(u64, usize)> {
        let Spanned { token, position } = self.next_token()?;
        match token {
            Token::Integer(n) => Ok((n, position)),
            other => Err(self.error_at(position, format!("Expected integer, found {other:?}"))),
        }
    }

    pub fn expect_string(&mut self) -> Result<String> {
        let Spanned { token, position } = self.next_token()?;
        match token {
            Token::String(s) => Ok(s.into_owned()),
            other => Err(self.error_at(position, format!("Expected string, found {other:?}"))),
        }
    }
}
