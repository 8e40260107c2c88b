use std::{collections::HashMap, str::FromStr};

use crate::{
    DataType,
    core::types::TypeName,
    sql::ast::{Expression, Literal, Operator},
};

/// Resolves the result type of function calls during type inference.
///
/// Implement this to plug a real function catalog into default validation;
/// [`BuiltinFunctions`] covers the functions commonly used in defaults.
pub trait FunctionRegistry {
    /// Returns the type of `name(args...)`, or a message explaining why the
    /// call is invalid.
    fn return_type(&self, name: &str, args: &[DataType]) -> Result<DataType, String>;
}

/// Functions commonly used in column defaults: `now`, `today`, `rand`,
/// `toString`, `toDate`, `toDateTime`, `toUInt8`..`toFloat64`, `length`,
/// `lower`, `upper`, `concat`, `if` and `arrayJoin`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFunctions;

impl FunctionRegistry for BuiltinFunctions {
    fn return_type(&self, name: &str, args: &[DataType]) -> Result<DataType, String> {
        let nullable = args.iter().any(|arg| matches!(arg, DataType::Nullable(_)));
        let stripped: Vec<&DataType> = args.iter().map(DataType::strip_nullable).collect();

        let result = match (name, stripped.as_slice(), conversion_target(name)) {
            ("now", [], _) => DataType::DateTime,
            ("today", [], _) => DataType::Date,
            ("rand", [], _) => DataType::UInt32,
            ("toString", [_], _) => DataType::String,
            ("toDate", [arg], _) if arg.can_convert(&DataType::Date) => DataType::Date,
            ("toDateTime", [arg], _) if arg.can_convert(&DataType::DateTime) => {
                DataType::DateTime
            }
            ("toDateTime", [arg, DataType::String], _) if arg.can_convert(&DataType::DateTime) => {
                DataType::DateTime
            }
            ("length", [arg], _) if arg.is_string() || matches!(arg, DataType::Array(_)) => {
                DataType::UInt64
            }
            ("lower" | "upper", [arg], _) if arg.is_string() => DataType::String,
            ("concat", strings, _)
                if strings.len() >= 2 && strings.iter().all(|arg| arg.is_string()) =>
            {
                DataType::String
            }
            ("if", [condition, then, otherwise], _) if condition.is_numeric() => {
                return if_result_type(&args[1], &args[2]).ok_or_else(|| {
                    format!("Branches of if have incompatible types {then} and {otherwise}")
                });
            }
            ("arrayJoin", [DataType::Array(element)], _) => element.as_ref().clone(),
            (_, [arg], Some(target)) if arg.can_cast(&target) => target,
            (name, _, _) if is_known(name) => {
                return Err(format!(
                    "Illegal arguments ({}) for function {name}",
                    join_types(args)
                ));
            }
            (name, _, _) => return Err(format!("Unknown function {name}")),
        };

        if nullable && !matches!(result, DataType::Array(_) | DataType::Nullable(_)) {
            Ok(DataType::Nullable(Box::new(result)))
        } else {
            Ok(result)
        }
    }
}

fn is_known(name: &str) -> bool {
    matches!(
        name,
        "now"
            | "today"
            | "rand"
            | "toString"
            | "toDate"
            | "toDateTime"
            | "length"
            | "lower"
            | "upper"
            | "concat"
            | "if"
            | "arrayJoin"
    ) || conversion_target(name).is_some()
}

/// `toUInt8` -> `UInt8`, `toFloat64` -> `Float64`, ...
fn conversion_target(name: &str) -> Option<DataType> {
    let type_name = TypeName::from_str(name.strip_prefix("to")?).ok()?;
    let target = match type_name {
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
        _ => return None,
    };
    Some(target)
}

fn if_result_type(then: &DataType, otherwise: &DataType) -> Option<DataType> {
    if then == otherwise {
        return Some(then.clone());
    }

    let (then_base, otherwise_base) = (then.strip_nullable(), otherwise.strip_nullable());
    let base = if then_base == otherwise_base {
        then_base.clone()
    } else {
        common_numeric_type(then_base, otherwise_base)?
    };

    if matches!(then, DataType::Nullable(_)) || matches!(otherwise, DataType::Nullable(_)) {
        Some(DataType::Nullable(Box::new(base)))
    } else {
        Some(base)
    }
}

fn join_types(args: &[DataType]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Why an expression has no type.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InferenceError {
    /// The expression names a column that is not in scope.
    UnresolvedReference(String),
    Invalid(String),
}

/// Infers the result type of `expr`. Identifiers are looked up in `scope`.
pub(crate) fn infer_expression_type<F: FunctionRegistry + ?Sized>(
    expr: &Expression,
    scope: &HashMap<&str, &DataType>,
    functions: &F,
) -> Result<DataType, InferenceError> {
    match expr {
        Expression::Identifier(name) => scope
            .get(name.as_str())
            .map(|data_type| (*data_type).clone())
            .ok_or_else(|| InferenceError::UnresolvedReference(name.clone())),
        Expression::Literal(literal) => Ok(match literal {
            Literal::UInt(value) => DataType::smallest_unsigned_for(*value),
            Literal::Float(_) => DataType::Float64,
            Literal::String(_) => DataType::String,
            Literal::Null => DataType::Nullable(Box::new(DataType::Nothing)),
        }),
        Expression::Negate(inner) => {
            let inner = infer_expression_type(inner, scope, functions)?;
            let operand = inner.strip_nullable();

            let result = match operand {
                DataType::Nothing => DataType::Nothing,
                operand => negated_type(operand).ok_or_else(|| {
                    InferenceError::Invalid(format!("Cannot negate a value of type {operand}"))
                })?,
            };

            Ok(propagate_nullable(result, &[&inner]))
        }
        Expression::BinaryOp { left, op, right } => {
            let left = infer_expression_type(left, scope, functions)?;
            let right = infer_expression_type(right, scope, functions)?;

            let result = match (left.strip_nullable(), right.strip_nullable()) {
                (DataType::Nothing, _) | (_, DataType::Nothing) => DataType::Nothing,
                (l, r) => binary_result_type(l, *op, r).ok_or_else(|| {
                    InferenceError::Invalid(format!(
                        "Operator {op} cannot be applied to {left} and {right}"
                    ))
                })?,
            };

            Ok(propagate_nullable(result, &[&left, &right]))
        }
        Expression::Function { name, args } => {
            let arg_types = args
                .iter()
                .map(|arg| infer_expression_type(arg, scope, functions))
                .collect::<Result<Vec<_>, _>>()?;

            functions
                .return_type(name, &arg_types)
                .map_err(InferenceError::Invalid)
        }
        Expression::Cast { expr, to } => {
            let from = infer_expression_type(expr, scope, functions)?;
            if from.can_cast(to) {
                Ok(to.clone())
            } else {
                Err(InferenceError::Invalid(format!(
                    "Cannot cast {from} to {to}"
                )))
            }
        }
        Expression::Subquery(_) => Err(InferenceError::Invalid(
            "Subqueries cannot be typed without a table".to_string(),
        )),
    }
}

/// Makes `result` nullable when any operand was, and always for `Nothing`.
fn propagate_nullable(result: DataType, operands: &[&DataType]) -> DataType {
    let nullable = operands
        .iter()
        .any(|operand| matches!(operand, DataType::Nullable(_)));

    if nullable || result == DataType::Nothing {
        DataType::Nullable(Box::new(result))
    } else {
        result
    }
}

fn negated_type(operand: &DataType) -> Option<DataType> {
    if operand.is_float() {
        return Some(operand.clone());
    }

    let width = operand.integer_width()?;
    if operand.is_signed() {
        Some(operand.clone())
    } else {
        Some(DataType::integer_of_width(width * 2, true))
    }
}

fn binary_result_type(left: &DataType, op: Operator, right: &DataType) -> Option<DataType> {
    if op.is_comparison() {
        return comparable(left, right).then_some(DataType::UInt8);
    }

    if op.is_logical() {
        return (left.is_numeric() && right.is_numeric()).then_some(DataType::UInt8);
    }

    match (left, op, right) {
        (DataType::Date | DataType::DateTime, Operator::Add | Operator::Subtract, r)
            if r.is_integer() =>
        {
            Some(left.clone())
        }
        (l, Operator::Add, DataType::Date | DataType::DateTime) if l.is_integer() => {
            Some(right.clone())
        }
        (l, Operator::Divide, r) if l.is_numeric() && r.is_numeric() => Some(DataType::Float64),
        (l, Operator::Modulo, r) if l.is_integer() && r.is_integer() => {
            let width = l.integer_width()?.max(r.integer_width()?);
            Some(DataType::integer_of_width(width, l.is_signed() || r.is_signed()))
        }
        (l, _, r) if l.is_numeric() && r.is_numeric() => Some(arithmetic_result_type(l, r)),
        _ => None,
    }
}

/// Result of `+`, `-` and `*` on numbers: the next wider integer type, so
/// `UInt8 + UInt8` is `UInt16`.
fn arithmetic_result_type(left: &DataType, right: &DataType) -> DataType {
    match (left.integer_width(), right.integer_width()) {
        (Some(l), Some(r)) => {
            DataType::integer_of_width(l.max(r) * 2, left.is_signed() || right.is_signed())
        }
        _ => DataType::Float64,
    }
}

/// Smallest type both numbers convert to without widening further.
fn common_numeric_type(left: &DataType, right: &DataType) -> Option<DataType> {
    if !left.is_numeric() || !right.is_numeric() {
        return None;
    }

    match (left.integer_width(), right.integer_width()) {
        (Some(l), Some(r)) => Some(DataType::integer_of_width(
            l.max(r),
            left.is_signed() || right.is_signed(),
        )),
        _ => Some(DataType::Float64),
    }
}

fn comparable(left: &DataType, right: &DataType) -> bool {
    let date_like = |t: &DataType| matches!(t, DataType::Date | DataType::DateTime);

    left == right
        || (left.is_numeric() && right.is_numeric())
        || (left.is_string() && right.is_string())
        || (date_like(left) && (date_like(right) || right.is_string()))
        || (date_like(right) && left.is_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(text: &str, scope: &[(&str, DataType)]) -> Result<DataType, InferenceError> {
        let expr: Expression = text.parse().unwrap();
        let scope: HashMap<&str, &DataType> = scope.iter().map(|(n, t)| (*n, t)).collect();
        infer_expression_type(&expr, &scope, &BuiltinFunctions)
    }

    #[test]
    fn test_infer_literals() {
        assert_eq!(infer("1", &[]).unwrap(), DataType::UInt8);
        assert_eq!(infer("300", &[]).unwrap(), DataType::UInt16);
        assert_eq!(infer("1.5", &[]).unwrap(), DataType::Float64);
        assert_eq!(infer("'x'", &[]).unwrap(), DataType::String);
        assert_eq!(
            infer("NULL", &[]).unwrap(),
            DataType::Nullable(Box::new(DataType::Nothing))
        );
        assert_eq!(infer("-1", &[]).unwrap(), DataType::Int16);
    }

    #[test]
    fn test_infer_arithmetic_widens() {
        let scope = [("a", DataType::UInt8), ("b", DataType::Int32)];

        assert_eq!(infer("a + 1", &scope).unwrap(), DataType::UInt16);
        assert_eq!(infer("a * b", &scope).unwrap(), DataType::Int64);
        assert_eq!(infer("a / 2", &scope).unwrap(), DataType::Float64);
        assert_eq!(infer("b % 7", &scope).unwrap(), DataType::Int32);
        assert_eq!(infer("a = b", &scope).unwrap(), DataType::UInt8);
    }

    #[test]
    fn test_infer_propagates_nullability() {
        let scope = [("n", DataType::Nullable(Box::new(DataType::UInt32)))];

        assert_eq!(
            infer("n + 1", &scope).unwrap(),
            DataType::Nullable(Box::new(DataType::UInt64))
        );
        assert_eq!(
            infer("toString(n)", &scope).unwrap(),
            DataType::Nullable(Box::new(DataType::String))
        );
    }

    #[test]
    fn test_infer_dates() {
        let scope = [("d", DataType::Date), ("t", DataType::DateTime)];

        assert_eq!(infer("d + 1", &scope).unwrap(), DataType::Date);
        assert_eq!(infer("t + 86400", &scope).unwrap(), DataType::DateTime);
        assert_eq!(infer("toDate(t)", &scope).unwrap(), DataType::Date);
        assert_eq!(infer("now()", &scope).unwrap(), DataType::DateTime);
        assert!(matches!(infer("d * 2", &scope), Err(InferenceError::Invalid(_))));
    }

    #[test]
    fn test_infer_functions() {
        let scope = [
            ("s", DataType::String),
            ("arr", DataType::Array(Box::new(DataType::Int8))),
        ];

        assert_eq!(infer("length(s)", &scope).unwrap(), DataType::UInt64);
        assert_eq!(infer("toUInt32(s)", &scope).unwrap(), DataType::UInt32);
        assert_eq!(infer("concat(s, 'x')", &scope).unwrap(), DataType::String);
        assert_eq!(infer("if(1, 2, 300)", &scope).unwrap(), DataType::UInt16);
        assert_eq!(infer("arrayJoin(arr)", &scope).unwrap(), DataType::Int8);
        assert!(matches!(infer("lower(1)", &scope), Err(InferenceError::Invalid(_))));
        assert!(matches!(infer("frobnicate(s)", &scope), Err(InferenceError::Invalid(_))));
    }

    #[test]
    fn test_infer_unresolved_reference() {
        assert_eq!(
            infer("a + 1", &[]),
            Err(InferenceError::UnresolvedReference("a".to_string()))
        );
    }

    #[test]
    fn test_infer_cast() {
        let scope = [("s", DataType::String)];

        assert_eq!(infer("CAST(s AS UInt8)", &scope).unwrap(), DataType::UInt8);
        assert!(matches!(
            infer("CAST(s AS Array(UInt8))", &scope),
            Err(InferenceError::Invalid(_))
        ));
    }
}
