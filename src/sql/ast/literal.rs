use std::fmt;

/// A literal value in an expression.
///
/// Numeric literals are unsigned; a negative number is a
/// [`super::Expression::Negate`] around one.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    UInt(u64),
    Float(UnsignedFloat),
    String(String),
    Null,
}

/// A finite float with a positive sign bit, the value of a float literal.
///
/// `-1.5`, `-0.0`, `NaN` and infinities have no literal spelling and are
/// rejected by [`UnsignedFloat::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnsignedFloat(f64);

impl UnsignedFloat {
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && value.is_sign_positive()).then_some(Self(value))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl fmt::Display for UnsignedFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `{:?}` keeps the fractional part (`1.0`), so the text lexes as a float again.
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::UInt(num) => write!(f, "{num}"),
            Literal::Float(num) => write!(f, "{num}"),
            Literal::String(s) => write!(f, "{}", quote_string(s)),
            Literal::Null => write!(f, "NULL"),
        }
    }
}

/// Single-quotes a string, escaping backslashes, quotes and control characters.
pub fn quote_string(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            '\0' => quoted.push_str("\\0"),
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_float_rejects_values_without_literal_spelling() {
        assert!(UnsignedFloat::new(-1.5).is_none());
        assert!(UnsignedFloat::new(-0.0).is_none());
        assert!(UnsignedFloat::new(f64::NAN).is_none());
        assert!(UnsignedFloat::new(f64::INFINITY).is_none());
        assert!(UnsignedFloat::new(f64::NEG_INFINITY).is_none());

        assert_eq!(UnsignedFloat::new(0.0).map(UnsignedFloat::get), Some(0.0));
        assert_eq!(UnsignedFloat::new(2.0).unwrap().to_string(), "2.0");
        assert_eq!(UnsignedFloat::new(1e-7).unwrap().to_string(), "1e-7");
    }
}
