pub(crate) mod expression;
pub(crate) mod literal;
pub(crate) mod operator;

pub use expression::{Expression, Subquery};
pub use literal::{Literal, UnsignedFloat, quote_string};
pub use operator::Operator;
