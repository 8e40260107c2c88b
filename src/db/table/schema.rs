use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, instrument};

use super::{
    column_def::{ColumnDefault, ColumnDescriptor, ColumnKind, NameAndType},
    nested,
};
use crate::{
    CatalogError,
    common::error::Result,
    core::codec::CompressionCodec,
    sql::ast::Expression,
};

/// The columns of a table.
///
/// An ordered collection of [`ColumnDescriptor`]s with unique names. The
/// declaration order is the physical column order and the serialization
/// order; names are looked up through a hash index kept in step with it.
///
/// A `ColumnSet` is not synchronized. Callers must serialize mutations
/// (`add`, `remove`, `rename`, `modify`, `flatten_nested`) and must not read
/// while a mutation is running.
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    columns: IndexMap<String, ColumnDescriptor>,
}

impl PartialEq for ColumnSet {
    // Order matters for equality, unlike `IndexMap`'s own comparison.
    fn eq(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len()
            && self.columns.values().eq(other.columns.values())
    }
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from descriptors in declaration order.
    pub fn from_columns(columns: impl IntoIterator<Item = ColumnDescriptor>) -> Result<Self> {
        let mut set = Self::new();
        for column in columns {
            set.add(column, "")?;
        }
        Ok(set)
    }

    /// Builds a set of plain columns, all virtual when `all_virtuals` is set.
    pub fn from_names_and_types(
        columns: impl IntoIterator<Item = NameAndType>,
        all_virtuals: bool,
    ) -> Result<Self> {
        Self::from_columns(columns.into_iter().map(|NameAndType { name, data_type }| {
            if all_virtuals {
                ColumnDescriptor::virtual_column(name, data_type)
            } else {
                ColumnDescriptor::new(name, data_type)
            }
        }))
    }

    /// Inserts `column`.
    ///
    /// With an empty `after_column` the column is appended. Otherwise it is
    /// placed right after the column of that name or, when `after_column` is
    /// a nested group, after the last column of the group.
    #[instrument(
        name = "columns::add",
        level = "trace",
        skip(self, column),
        fields(column = %column.name)
    )]
    pub fn add(&mut self, column: ColumnDescriptor, after_column: &str) -> Result<()> {
        if self.columns.contains_key(&column.name) {
            return Err(CatalogError::duplicate(&column.name));
        }

        let index = if after_column.is_empty() {
            self.columns.len()
        } else if let Some(index) = self.columns.get_index_of(after_column) {
            index + 1
        } else {
            let last = self
                .columns
                .keys()
                .rposition(|name| nested::is_in_group(name, after_column))
                .ok_or_else(|| CatalogError::not_found(after_column))?;
            last + 1
        };

        debug!(column = %column.name, index, "adding column");
        self.columns.shift_insert(index, column.name.clone(), column);
        Ok(())
    }

    /// Removes a column, or every column of a nested group.
    #[instrument(name = "columns::remove", level = "trace", skip(self))]
    pub fn remove(&mut self, column_name: &str) -> Result<()> {
        if self.columns.shift_remove(column_name).is_some() {
            debug!(column = column_name, "removed column");
            return Ok(());
        }

        let before = self.columns.len();
        self.columns
            .retain(|name, _| !nested::is_in_group(name, column_name));

        let removed = before - self.columns.len();
        if removed == 0 {
            return Err(CatalogError::not_found(column_name));
        }

        debug!(group = column_name, removed, "removed nested group");
        Ok(())
    }

    /// Renames a column in place; its position does not change.
    #[instrument(name = "columns::rename", level = "trace", skip(self))]
    pub fn rename(&mut self, column_from: &str, column_to: &str) -> Result<()> {
        let Some(index) = self.columns.get_index_of(column_from) else {
            return Err(CatalogError::not_found(column_from));
        };

        if column_from == column_to {
            return Ok(());
        }

        if self.columns.contains_key(column_to) {
            return Err(CatalogError::duplicate(column_to));
        }

        if let Some((_, mut column)) = self.columns.shift_remove_index(index) {
            column.name = column_to.to_string();
            self.columns.shift_insert(index, column_to.to_string(), column);
        }

        debug!(from = column_from, to = column_to, "renamed column");
        Ok(())
    }

    /// Edits a column in place.
    ///
    /// `f` works on a copy which replaces the stored column only when the
    /// name is unchanged. Renaming through `f` fails with
    /// [`CatalogError::ImmutableKeyViolation`] and leaves the set untouched.
    #[instrument(name = "columns::modify", level = "trace", skip(self, f))]
    pub fn modify<F>(&mut self, column_name: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut ColumnDescriptor),
    {
        let Some(column) = self.columns.get_mut(column_name) else {
            return Err(CatalogError::not_found(column_name));
        };

        let mut edited = column.clone();
        f(&mut edited);

        if edited.name != column.name {
            return Err(CatalogError::ImmutableKeyViolation {
                name: column_name.to_string(),
                attempted: edited.name,
            });
        }

        *column = edited;
        debug!(column = column_name, "modified column");
        Ok(())
    }

    pub fn get(&self, column_name: &str) -> Result<&ColumnDescriptor> {
        self.columns
            .get(column_name)
            .ok_or_else(|| CatalogError::not_found(column_name))
    }

    pub fn has(&self, column_name: &str) -> bool {
        self.columns.contains_key(column_name)
    }

    /// Whether `column_name` is a column or a nested group.
    pub fn has_nested(&self, column_name: &str) -> bool {
        self.has(column_name)
            || self
                .columns
                .keys()
                .any(|name| nested::is_in_group(name, column_name))
    }

    /// Columns in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.values()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn select(&self, predicate: impl Fn(ColumnKind) -> bool) -> Vec<NameAndType> {
        self.columns
            .values()
            .filter(|column| predicate(column.kind()))
            .map(ColumnDescriptor::name_and_type)
            .collect()
    }

    pub fn ordinary(&self) -> Vec<NameAndType> {
        self.select(|kind| kind == ColumnKind::Ordinary)
    }

    pub fn materialized(&self) -> Vec<NameAndType> {
        self.select(|kind| kind == ColumnKind::Materialized)
    }

    pub fn aliases(&self) -> Vec<NameAndType> {
        self.select(|kind| kind == ColumnKind::Alias)
    }

    pub fn virtuals(&self) -> Vec<NameAndType> {
        self.select(|kind| kind == ColumnKind::Virtual)
    }

    /// Ordinary and materialized columns, interleaved in declaration order.
    pub fn all_physical(&self) -> Vec<NameAndType> {
        self.select(ColumnKind::is_physical)
    }

    pub fn all(&self) -> Vec<NameAndType> {
        self.select(|_| true)
    }

    pub fn names_of_physical(&self) -> Vec<String> {
        self.columns
            .values()
            .filter(|column| column.is_physical())
            .map(|column| column.name.clone())
            .collect()
    }

    pub fn has_physical(&self, column_name: &str) -> bool {
        self.columns
            .get(column_name)
            .is_some_and(ColumnDescriptor::is_physical)
    }

    /// Name and type of a stored column. Alias and virtual columns are
    /// reported as not found.
    pub fn get_physical(&self, column_name: &str) -> Result<NameAndType> {
        match self.columns.get(column_name) {
            Some(column) if column.is_physical() => Ok(column.name_and_type()),
            _ => Err(CatalogError::not_found(column_name)),
        }
    }

    /// Default expressions keyed by column name.
    pub fn defaults(&self) -> HashMap<String, ColumnDefault> {
        self.columns
            .values()
            .filter_map(|column| {
                let default = column.default.clone()?;
                Some((column.name.clone(), default))
            })
            .collect()
    }

    pub fn has_default(&self, column_name: &str) -> bool {
        self.get_default(column_name).is_some()
    }

    pub fn get_default(&self, column_name: &str) -> Option<&ColumnDefault> {
        self.columns.get(column_name)?.default.as_ref()
    }

    /// TTL expressions keyed by column name.
    pub fn column_ttls(&self) -> HashMap<String, Expression> {
        self.columns
            .values()
            .filter_map(|column| Some((column.name.clone(), column.ttl.clone()?)))
            .collect()
    }

    /// The codec of `column_name`, or `fallback` when the column does not
    /// declare one or does not exist.
    pub fn codec_or(&self, column_name: &str, fallback: CompressionCodec) -> CompressionCodec {
        self.columns
            .get(column_name)
            .and_then(|column| column.codec.clone())
            .unwrap_or(fallback)
    }

    pub fn codec_or_default(&self, column_name: &str) -> CompressionCodec {
        self.codec_or(column_name, CompressionCodec::default_codec())
    }

    /// Swaps in a rebuilt column map. The caller keeps keys and names in step.
    pub(crate) fn replace_columns(&mut self, columns: IndexMap<String, ColumnDescriptor>) {
        self.columns = columns;
    }
}

impl<'a> IntoIterator for &'a ColumnSet {
    type Item = &'a ColumnDescriptor;
    type IntoIter = indexmap::map::Values<'a, String, ColumnDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.values()
    }
}
