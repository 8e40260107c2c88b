use std::{collections::HashMap, fmt};

use tracing::{instrument, trace};

use super::{column_def::NameAndType, schema::ColumnSet};
use crate::{
    CatalogError,
    common::error::{Construct, Result, ValidationReason},
    core::types::DataType,
    sql::{
        ast::Expression,
        infer_type::{BuiltinFunctions, FunctionRegistry, InferenceError, infer_expression_type},
    },
};

/// A row shape with no rows: the columns that have a default expression,
/// with their declared types, in declaration order.
///
/// Feeds type inference for later stages without evaluating anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBlock {
    columns: Vec<NameAndType>,
}

impl SampleBlock {
    pub fn columns(&self) -> &[NameAndType] {
        &self.columns
    }

    pub fn get(&self, name: &str) -> Option<&DataType> {
        self.columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| &column.data_type)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl fmt::Display for SampleBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{column}")?;
        }
        Ok(())
    }
}

/// Result of a successful validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedDefaults {
    pub sample: SampleBlock,

    /// Every default expression, in declaration order, wrapped in a `CAST` to
    /// the column type where its own type differs.
    pub rewritten: Vec<(String, Expression)>,
}

/// Type-checks default, materialized and alias expressions.
///
/// Columns are processed in declaration order. An expression may only use
/// columns declared before its own column, so defaults can be evaluated in
/// that order.
#[derive(Debug, Clone, Copy)]
pub struct DefaultsValidator<'f, F: FunctionRegistry + ?Sized = BuiltinFunctions> {
    functions: &'f F,
}

impl DefaultsValidator<'static> {
    pub fn new() -> Self {
        Self {
            functions: &BuiltinFunctions,
        }
    }
}

impl Default for DefaultsValidator<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'f, F: FunctionRegistry + ?Sized> DefaultsValidator<'f, F> {
    pub fn with_functions(functions: &'f F) -> Self {
        Self { functions }
    }

    #[instrument(
        name = "columns::validate_defaults",
        level = "trace",
        skip_all,
        fields(columns = columns.len())
    )]
    pub fn validate(&self, columns: &ColumnSet) -> Result<ValidatedDefaults> {
        let mut scope: HashMap<&str, &DataType> = HashMap::with_capacity(columns.len());
        let mut validated = ValidatedDefaults::default();

        for (name, data_type, default) in columns
            .iter()
            .map(|column| (column.name.as_str(), &column.data_type, column.default.as_ref()))
        {
            if let Some(default) = default {
                let expression = self.check(name, data_type, &default.expression, &scope)?;
                trace!(column = name, kind = %default.kind, %expression, "validated default");

                validated
                    .sample
                    .columns
                    .push(NameAndType::new(name, data_type.clone()));
                validated.rewritten.push((name.to_string(), expression));
            }

            scope.insert(name, data_type);
        }

        Ok(validated)
    }

    fn check(
        &self,
        column: &str,
        data_type: &DataType,
        expression: &Expression,
        scope: &HashMap<&str, &DataType>,
    ) -> Result<Expression> {
        if let Some(construct) = disallowed_construct(expression) {
            return Err(CatalogError::validation(
                column,
                ValidationReason::DisallowedConstruct(construct),
            ));
        }

        if let Some(reference) = expression
            .referenced_columns()
            .into_iter()
            .find(|reference| !scope.contains_key(reference))
        {
            return Err(CatalogError::UnresolvedReference {
                column: column.to_string(),
                reference: reference.to_string(),
            });
        }

        let found = infer_expression_type(expression, scope, self.functions).map_err(|err| {
            match err {
                InferenceError::UnresolvedReference(reference) => {
                    CatalogError::UnresolvedReference {
                        column: column.to_string(),
                        reference,
                    }
                }
                InferenceError::Invalid(message) => {
                    CatalogError::validation(column, ValidationReason::Inference(message))
                }
            }
        })?;

        if found == *data_type {
            Ok(expression.clone())
        } else if found.can_convert(data_type) {
            Ok(expression.clone().cast(data_type.clone()))
        } else {
            Err(CatalogError::validation(
                column,
                ValidationReason::TypeMismatch {
                    found,
                    expected: data_type.clone(),
                },
            ))
        }
    }
}

fn disallowed_construct(expression: &Expression) -> Option<Construct> {
    let mut found = None;
    expression.walk(&mut |node| {
        if found.is_some() {
            return;
        }
        found = match node {
            Expression::Subquery(_) => Some(Construct::Subquery),
            Expression::Function { name, .. } if name.eq_ignore_ascii_case("arrayJoin") => {
                Some(Construct::ArrayJoin)
            }
            _ => None,
        };
    });
    found
}
