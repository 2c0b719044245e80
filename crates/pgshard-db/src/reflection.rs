//! Reflected state of a live schema.
//!
//! A [`SchemaSnapshot`] lists the named objects that currently exist in the
//! database. It is what the autogenerate comparison diffs the metadata
//! against; an empty snapshot means "nothing exists yet". A
//! [`LiveEnumSnapshot`] holds the labels of every enumerated type.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// An index as reflected from the database.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReflectedIndex {
    /// The index name.
    pub name: String,
    /// The table the index belongs to.
    pub table_name: String,
}

/// A foreign key constraint as reflected from the database.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReflectedForeignKey {
    /// The constraint name.
    pub name: String,
    /// The table holding the constraint.
    pub table_name: String,
    /// The referenced table.
    pub referred_table: String,
}

/// The named objects present in a live schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// Table names.
    #[serde(default)]
    pub tables: BTreeSet<String>,
    /// Indexes.
    #[serde(default)]
    pub indexes: BTreeSet<ReflectedIndex>,
    /// Foreign key constraints.
    #[serde(default)]
    pub foreign_keys: BTreeSet<ReflectedForeignKey>,
}

impl SchemaSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table.
    pub fn with_table(mut self, name: impl Into<String>) -> Self {
        self.tables.insert(name.into());
        self
    }

    /// Adds an index on `table_name`.
    pub fn with_index(mut self, name: impl Into<String>, table_name: impl Into<String>) -> Self {
        self.indexes.insert(ReflectedIndex {
            name: name.into(),
            table_name: table_name.into(),
        });
        self
    }

    /// Adds a foreign key on `table_name` referencing `referred_table`.
    pub fn with_foreign_key(
        mut self,
        name: impl Into<String>,
        table_name: impl Into<String>,
        referred_table: impl Into<String>,
    ) -> Self {
        self.foreign_keys.insert(ReflectedForeignKey {
            name: name.into(),
            table_name: table_name.into(),
            referred_table: referred_table.into(),
        });
        self
    }

    /// Returns `true` if the table exists.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains(name)
    }

    /// Returns `true` if an index with this name exists.
    pub fn has_index(&self, name: &str) -> bool {
        self.indexes.iter().any(|i| i.name == name)
    }

    /// Returns `true` if a foreign key with this name exists on `table_name`.
    pub fn has_foreign_key(&self, table_name: &str, name: &str) -> bool {
        self.foreign_keys
            .iter()
            .any(|fk| fk.table_name == table_name && fk.name == name)
    }
}

/// The enumerated types defined in a live database, with their labels in
/// sort order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveEnumSnapshot {
    /// Labels keyed by type name.
    pub types: BTreeMap<String, Vec<String>>,
}

impl LiveEnumSnapshot {
    /// Creates an empty snapshot (no enum types exist).
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a label to `type_name`, creating the type entry if needed.
    ///
    /// Rows from `pg_enum` arrive ordered by type and sort order, so pushing
    /// them in sequence preserves label order.
    pub fn push_label(&mut self, type_name: impl Into<String>, label: impl Into<String>) {
        self.types.entry(type_name.into()).or_default().push(label.into());
    }

    /// Builder form: defines `type_name` with the given labels.
    pub fn with_type(mut self, type_name: impl Into<String>, labels: &[&str]) -> Self {
        self.types.insert(
            type_name.into(),
            labels.iter().map(ToString::to_string).collect(),
        );
        self
    }

    /// Returns the labels of `type_name`, or `None` if the type does not exist.
    pub fn labels(&self, type_name: &str) -> Option<&[String]> {
        self.types.get(type_name).map(Vec::as_slice)
    }
}
