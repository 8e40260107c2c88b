use tracing::{debug, instrument};

use super::{
    defaults::{DefaultsValidator, SampleBlock},
    schema::ColumnSet,
};
use crate::common::error::Result;

/// A table with a name and its column descriptions.
///
/// The columns only change through [`TableDef::alter`], which keeps the
/// default expressions valid across every change.
#[derive(Debug, Clone)]
pub struct TableDef {
    /// The table name.
    pub(crate) name: String,

    /// The table's columns.
    pub(crate) columns: ColumnSet,

    /// Row shape of the columns with defaults, from the last validation.
    pub(crate) sample: SampleBlock,
}

impl TableDef {
    /// Creates a table, rejecting column sets with invalid defaults.
    #[instrument(name = "table::create", level = "trace", skip_all)]
    pub fn create(name: impl Into<String>, columns: ColumnSet) -> Result<Self> {
        let validated = DefaultsValidator::new().validate(&columns)?;
        let name = name.into();

        debug!(table = %name, columns = columns.len(), "created table");
        Ok(Self {
            name,
            columns,
            sample: validated.sample,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn sample(&self) -> &SampleBlock {
        &self.sample
    }

    /// Applies `change` to the columns as one transaction.
    ///
    /// The change runs on a copy. It is committed only when it succeeds and
    /// the resulting defaults still validate; otherwise the table is left as
    /// it was and the error is returned.
    #[instrument(
        name = "table::alter",
        level = "trace",
        skip(self, change),
        fields(table = %self.name)
    )]
    pub fn alter<F>(&mut self, change: F) -> Result<()>
    where
        F: FnOnce(&mut ColumnSet) -> Result<()>,
    {
        let mut columns = self.columns.clone();
        change(&mut columns)?;
        let validated = DefaultsValidator::new().validate(&columns)?;

        self.columns = columns;
        self.sample = validated.sample;

        debug!(table = %self.name, columns = self.columns.len(), "altered table");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CatalogError,
        core::types::DataType,
        db::table::column_def::{ColumnDescriptor, DefaultKind},
    };

    fn create_test_table() -> TableDef {
        let columns = ColumnSet::from_columns([
            ColumnDescriptor::new("a", DataType::UInt8),
            ColumnDescriptor::new("b", DataType::UInt16)
                .with_default(DefaultKind::Materialized, "a + 1".parse().unwrap()),
        ])
        .unwrap();

        TableDef::create("t", columns).unwrap()
    }

    #[test]
    fn test_create_validates_defaults() {
        let table = create_test_table();
        assert_eq!(table.name(), "t");
        assert_eq!(table.sample().len(), 1);

        let dangling = ColumnDescriptor::new("b", DataType::UInt8)
            .with_default(DefaultKind::Default, "missing".parse().unwrap());
        let columns = ColumnSet::from_columns([dangling]).unwrap();
        assert!(matches!(
            TableDef::create("bad", columns),
            Err(CatalogError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_alter_commits() {
        let mut table = create_test_table();

        table
            .alter(|columns| {
                columns.add(
                    ColumnDescriptor::new("c", DataType::String)
                        .with_default(DefaultKind::Alias, "toString(b)".parse().unwrap()),
                    "",
                )
            })
            .unwrap();

        assert_eq!(table.columns().len(), 3);
        assert_eq!(table.sample().len(), 2);
    }

    #[test]
    fn test_alter_rolls_back_on_invalid_defaults() {
        let mut table = create_test_table();
        let before = table.columns().clone();

        // `b` depends on `a`, so dropping `a` breaks it.
        let err = table.alter(|columns| columns.remove("a")).unwrap_err();

        assert!(matches!(err, CatalogError::UnresolvedReference { .. }));
        assert_eq!(table.columns(), &before);
    }

    #[test]
    fn test_alter_rolls_back_on_failed_change() {
        let mut table = create_test_table();
        let before = table.columns().clone();

        let err = table
            .alter(|columns| {
                columns.rename("b", "c")?;
                columns.remove("missing")
            })
            .unwrap_err();

        assert!(matches!(err, CatalogError::NotFound { .. }));
        assert_eq!(table.columns(), &before);
    }
}
