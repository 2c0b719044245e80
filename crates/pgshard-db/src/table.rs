//! Table definitions with their indexes, foreign keys, and dialect options.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::column::Column;

/// Referential action for a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    /// Delete referencing rows.
    Cascade,
    /// Refuse to delete the referenced row.
    Restrict,
    /// Set the referencing column to NULL.
    SetNull,
    /// Take no action (checked at end of statement).
    #[default]
    NoAction,
}

impl OnDelete {
    /// Returns the SQL keyword for this action.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::SetNull => "SET NULL",
            Self::NoAction => "NO ACTION",
        }
    }
}

/// A database index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// The index name. Unnamed indexes get `<table>_<cols>_idx`.
    #[serde(default)]
    pub name: Option<String>,
    /// The indexed columns.
    pub columns: Vec<String>,
    /// Whether this is a unique index.
    #[serde(default)]
    pub unique: bool,
}

impl Index {
    /// Creates a non-unique index over `columns`.
    pub fn new(columns: &[&str]) -> Self {
        Self {
            name: None,
            columns: columns.iter().map(ToString::to_string).collect(),
            unique: false,
        }
    }

    /// Sets the index name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the effective index name on `table_name`.
    pub fn resolved_name(&self, table_name: &str) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{table_name}_{}_idx", self.columns.join("_")))
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// The constraint name. Unnamed constraints get `<table>_<cols>_fkey`.
    #[serde(default)]
    pub name: Option<String>,
    /// The local columns.
    pub columns: Vec<String>,
    /// The referenced table.
    pub referred_table: String,
    /// The referenced columns.
    pub referred_columns: Vec<String>,
    /// The referential action on delete.
    #[serde(default)]
    pub on_delete: OnDelete,
}

impl ForeignKey {
    /// Creates a single-column foreign key referencing `referred_table.id`.
    pub fn new(column: impl Into<String>, referred_table: impl Into<String>) -> Self {
        Self {
            name: None,
            columns: vec![column.into()],
            referred_table: referred_table.into(),
            referred_columns: vec!["id".to_string()],
            on_delete: OnDelete::default(),
        }
    }

    /// Returns the effective constraint name on `table_name`.
    pub fn resolved_name(&self, table_name: &str) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{table_name}_{}_fkey", self.columns.join("_")))
    }
}

/// A table in the metadata model.
///
/// `kwargs` and `info` are free-form option maps. Dialect options such as
/// `postgresql_partition_by` may be attached to either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// The table name.
    pub name: String,
    /// The columns, in declaration order.
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Secondary indexes.
    #[serde(default)]
    pub indexes: Vec<Index>,
    /// Foreign key constraints.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    /// Dialect keyword arguments.
    #[serde(default)]
    pub kwargs: BTreeMap<String, serde_json::Value>,
    /// Generic user info map.
    #[serde(default)]
    pub info: BTreeMap<String, serde_json::Value>,
}

impl Table {
    /// Creates a table with the given columns and no options.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            kwargs: BTreeMap::new(),
            info: BTreeMap::new(),
        }
    }

    /// Adds a dialect keyword argument.
    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// Adds an entry to the info map.
    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }

    /// Adds an index.
    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds a foreign key.
    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Returns the column with the given name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the primary key column names, in declaration order.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnType;

    fn orders() -> Table {
        Table::new(
            "orders",
            vec![
                Column::new("id", ColumnType::BigSerial).primary_key(),
                Column::new("customer_id", ColumnType::BigInteger).primary_key(),
                Column::new("note", ColumnType::Text),
            ],
        )
    }

    #[test]
    fn test_table_options() {
        let t = orders()
            .with_kwarg("postgresql_partition_by", "HASH (customer_id)")
            .with_info("owner", "billing");
        assert_eq!(
            t.kwargs.get("postgresql_partition_by").and_then(|v| v.as_str()),
            Some("HASH (customer_id)")
        );
        assert_eq!(t.info.get("owner").and_then(|v| v.as_str()), Some("billing"));
    }

    #[test]
    fn test_primary_key_columns() {
        assert_eq!(orders().primary_key(), vec!["id", "customer_id"]);
    }

    #[test]
    fn test_column_lookup() {
        let t = orders();
        assert!(t.column("note").is_some());
        assert!(t.column("missing").is_none());
    }

    #[test]
    fn test_index_resolved_name() {
        let idx = Index::new(&["created_at"]);
        assert_eq!(idx.resolved_name("orders"), "orders_created_at_idx");
        let idx = Index::new(&["created_at"]).named("ix_orders_created");
        assert_eq!(idx.resolved_name("orders"), "ix_orders_created");
    }

    #[test]
    fn test_foreign_key_defaults() {
        let fk = ForeignKey::new("customer_id", "customers");
        assert_eq!(fk.referred_columns, vec!["id"]);
        assert_eq!(fk.on_delete, OnDelete::NoAction);
        assert_eq!(fk.resolved_name("orders"), "orders_customer_id_fkey");
        assert_eq!(OnDelete::SetNull.as_sql(), "SET NULL");
    }
}
