use std::{fmt, str::FromStr};

use crate::{
    CatalogError, DataType,
    sql::{
        ast::{Literal, Operator},
        parser::Parser,
        quote_identifier,
    },
};

/// A default, materialized, alias or TTL expression.
///
/// Expressions are only type checked, never evaluated. Printing an
/// expression yields text that parses back into an equal tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Column reference (e.g., `age`, `n.x`)
    Identifier(String),

    /// Literal value (e.g., `25`, `'Alice'`)
    Literal(Literal),

    /// Unary minus
    Negate(Box<Expression>),

    BinaryOp {
        left: Box<Expression>,
        op: Operator,
        right: Box<Expression>,
    },

    /// Function call (e.g., `now()`, `toString(id)`)
    Function { name: String, args: Vec<Expression> },

    /// `CAST(expr AS Type)`
    Cast {
        expr: Box<Expression>,
        to: DataType,
    },

    /// Scalar subquery, `(SELECT expr [FROM table])`
    Subquery(Box<Subquery>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subquery {
    pub projection: Expression,
    pub from: Option<String>,
}

impl Expression {
    pub fn identifier(name: impl Into<String>) -> Self {
        Expression::Identifier(name.into())
    }

    pub fn binary(left: Expression, op: Operator, right: Expression) -> Self {
        Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn function(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Function {
            name: name.into(),
            args,
        }
    }

    /// Wraps this expression in an explicit conversion.
    pub fn cast(self, to: DataType) -> Self {
        Expression::Cast {
            expr: Box::new(self),
            to,
        }
    }

    /// Calls `visit` on this expression and every sub-expression, parents
    /// first. Subquery bodies are visited too.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expression)) {
        visit(self);
        match self {
            Expression::Identifier(_) | Expression::Literal(_) => {}
            Expression::Negate(expr) | Expression::Cast { expr, .. } => expr.walk(visit),
            Expression::BinaryOp { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expression::Function { args, .. } => args.iter().for_each(|arg| arg.walk(visit)),
            Expression::Subquery(subquery) => subquery.projection.walk(visit),
        }
    }

    /// Column names this expression reads, in order of first appearance.
    /// Identifiers inside a subquery belong to the subquery's own table and
    /// are not reported.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expression::Identifier(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expression::Literal(_) | Expression::Subquery(_) => {}
            Expression::Negate(expr) | Expression::Cast { expr, .. } => {
                expr.collect_references(names)
            }
            Expression::BinaryOp { left, right, .. } => {
                left.collect_references(names);
                right.collect_references(names);
            }
            Expression::Function { args, .. } => {
                args.iter().for_each(|arg| arg.collect_references(names))
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier(name) => write!(f, "{}", quote_identifier(name)),
            Expression::Literal(literal) => write!(f, "{literal}"),
            Expression::Negate(expr) => write!(f, "(-{expr})"),
            Expression::BinaryOp { left, op, right } => write!(f, "({left} {op} {right})"),
            Expression::Function { name, args } => {
                write!(f, "{}(", quote_identifier(name))?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expression::Cast { expr, to } => write!(f, "CAST({expr} AS {to})"),
            Expression::Subquery(subquery) => match &subquery.from {
                Some(table) => write!(
                    f,
                    "(SELECT {} FROM {})",
                    subquery.projection,
                    quote_identifier(table)
                ),
                None => write!(f, "(SELECT {})", subquery.projection),
            },
        }
    }
}

impl FromStr for Expression {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parser::new(s).parse_expression_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Expression {
        text.parse().unwrap()
    }

    #[test]
    fn test_display_parses_back() {
        for text in [
            "a + 1",
            "-x * 2.5",
            "toString(id) = 'it\\'s'",
            "CAST(a AS Nullable(UInt8))",
            "(SELECT max(x) FROM other) + 1",
            "`weird name` / 3 % 2",
            "`default` OR b AND c",
            "f()",
            "NULL",
            "1e300",
        ] {
            let expr = parse(text);
            let printed = expr.to_string();
            assert_eq!(printed.parse::<Expression>().unwrap(), expr, "{printed}");
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("a + b * c"),
            Expression::binary(
                Expression::identifier("a"),
                Operator::Add,
                Expression::binary(
                    Expression::identifier("b"),
                    Operator::Multiply,
                    Expression::identifier("c"),
                ),
            )
        );
        assert_eq!(parse("a + b * c").to_string(), "(a + (b * c))");
    }

    #[test]
    fn test_referenced_columns() {
        let expr = parse("a + f(b, a) + (SELECT c FROM t)");
        assert_eq!(expr.referenced_columns(), vec!["a", "b"]);
    }

    #[test]
    fn test_walk_visits_subquery() {
        let expr = parse("1 + (SELECT arrayJoin(x))");
        let mut functions = Vec::new();
        expr.walk(&mut |e| {
            if let Expression::Function { name, .. } = e {
                functions.push(name.clone());
            }
        });
        assert_eq!(functions, vec!["arrayJoin".to_string()]);
    }
}
