//! The metadata collection and model-file loading.
//!
//! A model file is a JSON or TOML document with a top-level `tables` array:
//!
//! ```toml
//! [[tables]]
//! name = "orders"
//! kwargs = { postgresql_partition_by = "HASH (customer_id)" }
//!
//! [[tables.columns]]
//! name = "customer_id"
//! type = { kind = "big_integer" }
//! primary_key = true
//! ```

use std::collections::HashSet;
use std::path::Path;

use pgshard_core::ShardError;
use serde::{Deserialize, Serialize};

use crate::table::Table;

/// An ordered collection of table definitions.
///
/// Table names are unique; [`MetaData::add_table`] replaces an existing
/// table with the same name in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    /// The tables, in declaration order.
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl MetaData {
    /// Creates an empty metadata collection.
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }

    /// Adds a table, replacing any existing table with the same name.
    pub fn add_table(&mut self, table: Table) {
        if let Some(existing) = self.tables.iter_mut().find(|t| t.name == table.name) {
            *existing = table;
        } else {
            self.tables.push(table);
        }
    }

    /// Builder form of [`MetaData::add_table`].
    pub fn with_table(mut self, table: Table) -> Self {
        self.add_table(table);
        self
    }

    /// Returns the table with the given name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Returns `true` if a table with the given name is declared.
    pub fn contains_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    /// Returns the number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if no tables are declared.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Parses a JSON model document.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the JSON is malformed or declares the
    /// same table twice.
    pub fn from_json_str(json: &str) -> Result<Self, ShardError> {
        let metadata: Self = serde_json::from_str(json).map_err(|e| {
            ShardError::ConfigurationError(format!("Failed to parse metadata JSON: {e}"))
        })?;
        metadata.check_unique_names()?;
        Ok(metadata)
    }

    /// Parses a TOML model document.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the TOML is malformed or declares the
    /// same table twice.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ShardError> {
        let metadata: Self = toml::from_str(toml_str).map_err(|e| {
            ShardError::ConfigurationError(format!("Failed to parse metadata TOML: {e}"))
        })?;
        metadata.check_unique_names()?;
        Ok(metadata)
    }

    /// Loads a model file, choosing the format by extension (`.json` is JSON,
    /// anything else TOML).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ShardError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ShardError::ConfigurationError(format!(
                "Failed to read metadata file '{}': {e}",
                path.display()
            ))
        })?;
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    fn check_unique_names(&self) -> Result<(), ShardError> {
        let mut seen = HashSet::new();
        for table in &self.tables {
            if !seen.insert(table.name.as_str()) {
                return Err(ShardError::ConfigurationError(format!(
                    "Table '{}' is declared more than once",
                    table.name
                )));
            }
        }
        Ok(())
    }
}
