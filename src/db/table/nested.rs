//! Nested column groups.
//!
//! A nested group has no entry of its own. It exists while at least one
//! column is named `group.field`; membership is decided by the name alone.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, instrument};

use super::{column_def::ColumnDescriptor, schema::ColumnSet};
use crate::core::types::DataType;

/// Whether `name` belongs to the nested group `group`.
pub(crate) fn is_in_group(name: &str, group: &str) -> bool {
    !group.is_empty()
        && name
            .strip_prefix(group)
            .is_some_and(|rest| rest.len() > 1 && rest.starts_with('.'))
}

/// Joins a group and a field into a leaf column name.
pub(crate) fn leaf_name(group: &str, field: &str) -> String {
    format!("{group}.{field}")
}

/// Leaf columns for one `Nested` column. Leaves have no default expression;
/// comment, codec, TTL and the virtual flag carry over from the group.
fn leaves(column: &ColumnDescriptor, fields: &[(String, DataType)]) -> Vec<ColumnDescriptor> {
    fields
        .iter()
        .map(|(field, data_type)| ColumnDescriptor {
            name: leaf_name(&column.name, field),
            data_type: DataType::Array(Box::new(data_type.clone())),
            default: None,
            comment: column.comment.clone(),
            codec: column.codec.clone(),
            ttl: column.ttl.clone(),
            is_virtual: column.is_virtual,
        })
        .collect()
}

impl ColumnSet {
    /// Replaces every `Nested` column by its leaf array columns, in place.
    ///
    /// Running it again changes nothing. A leaf whose name is already taken
    /// by a declared column is skipped, wherever that column sits, so the
    /// set stays unique and no declared column is lost.
    #[instrument(name = "columns::flatten_nested", level = "trace", skip(self))]
    pub fn flatten_nested(&mut self) {
        if !self.iter().any(|column| column.data_type.is_nested()) {
            return;
        }

        let declared: HashSet<&str> = self
            .iter()
            .filter(|column| !column.data_type.is_nested())
            .map(|column| column.name.as_str())
            .collect();

        let mut flattened = IndexMap::with_capacity(self.len());
        let mut groups = 0usize;
        let mut skipped = 0usize;

        for column in self.iter() {
            let DataType::Nested(fields) = &column.data_type else {
                flattened.insert(column.name.clone(), column.clone());
                continue;
            };

            groups += 1;
            for leaf in leaves(column, fields) {
                if declared.contains(leaf.name.as_str()) || flattened.contains_key(&leaf.name) {
                    skipped += 1;
                    continue;
                }
                flattened.insert(leaf.name.clone(), leaf);
            }
        }

        debug!(groups, skipped, columns = flattened.len(), "flattened nested columns");
        self.replace_columns(flattened);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DefaultKind, core::codec::CompressionCodec, sql::ast::Expression};

    #[test]
    fn test_group_membership() {
        assert!(is_in_group("n.a", "n"));
        assert!(is_in_group("n.a.b", "n.a"));
        assert!(is_in_group("n.a.b", "n"));
        assert!(!is_in_group("n", "n"));
        assert!(!is_in_group("na", "n"));
        assert!(!is_in_group("n.", "n"));
        assert!(!is_in_group("n.a", ""));
    }

    #[test]
    fn test_flatten_nested() {
        let nested = DataType::Nested(vec![
            ("x".to_string(), DataType::UInt32),
            ("y".to_string(), DataType::String),
        ]);
        let mut set = ColumnSet::from_columns([
            ColumnDescriptor::new("id", DataType::UInt64),
            ColumnDescriptor::new("n", nested)
                .with_comment("points")
                .with_codec(CompressionCodec::default_codec())
                .with_default(DefaultKind::Default, Expression::identifier("id")),
            ColumnDescriptor::new("last", DataType::UInt8),
        ])
        .unwrap();

        set.flatten_nested();

        let names: Vec<_> = set.iter().map(|column| column.name.as_str()).collect();
        assert_eq!(names, vec!["id", "n.x", "n.y", "last"]);

        let leaf = set.get("n.x").unwrap();
        assert_eq!(leaf.data_type, DataType::Array(Box::new(DataType::UInt32)));
        assert_eq!(leaf.comment, "points");
        assert!(leaf.codec.is_some());
        assert!(leaf.default.is_none());
        assert!(set.has_nested("n"));
        assert!(!set.has("n"));

        let once = set.clone();
        set.flatten_nested();
        assert_eq!(set, once);
    }

    #[test]
    fn test_flatten_keeps_declared_column_on_name_clash() {
        let mut set = ColumnSet::from_columns([
            ColumnDescriptor::new(
                "n",
                DataType::Nested(vec![
                    ("x".to_string(), DataType::UInt32),
                    ("y".to_string(), DataType::UInt32),
                ]),
            ),
            ColumnDescriptor::new("n.x", DataType::String).with_comment("declared"),
        ])
        .unwrap();

        set.flatten_nested();

        let names: Vec<_> = set.iter().map(|column| column.name.as_str()).collect();
        assert_eq!(names, vec!["n.y", "n.x"]);

        let declared = set.get("n.x").unwrap();
        assert_eq!(declared.data_type, DataType::String);
        assert_eq!(declared.comment, "declared");
    }

    #[test]
    fn test_flatten_empty_nested_drops_column() {
        let mut set = ColumnSet::from_columns([
            ColumnDescriptor::new("id", DataType::UInt64),
            ColumnDescriptor::new("n", DataType::Nested(vec![])),
        ])
        .unwrap();

        set.flatten_nested();

        assert_eq!(set.len(), 1);
        assert!(!set.has_nested("n"));
    }

    #[test]
    fn test_flatten_keeps_virtual_flag() {
        let mut set = ColumnSet::from_columns([ColumnDescriptor::virtual_column(
            "v",
            DataType::Nested(vec![("a".to_string(), DataType::UInt8)]),
        )])
        .unwrap();

        set.flatten_nested();

        assert_eq!(set.virtuals().len(), 1);
        assert_eq!(set.virtuals()[0].name, "v.a");
    }
}
