//! Extraction of partition and enum facts from the metadata model.
//!
//! The scanner is a read-only pass: running it twice over the same metadata
//! yields the same result.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use pgshard_core::{PartitionSettings, ShardError};
use pgshard_db::{MetaData, Table};
use regex::Regex;

use crate::partition::{
    is_valid_identifier, ListEntry, PartitionConfig, PartitionParams, PartitionStrategy,
    RangeBound,
};

/// The dialect option holding a table's partition clause.
pub const PARTITION_BY_KEY: &str = "postgresql_partition_by";

static PARTITION_CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\w+)\s*\(\s*([^)]+?)\s*\)\s*$").expect("partition clause regex is valid")
});

/// An enumerated type as declared in the metadata model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDefinition {
    /// The database type name.
    pub name: String,
    /// The labels in declaration order, without duplicates.
    pub values: Vec<String>,
}

impl EnumDefinition {
    /// Creates a definition, dropping repeated labels.
    pub fn new<S: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for value in values {
            let value = value.into();
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
        Self {
            name: name.into(),
            values: unique,
        }
    }
}

/// A partitioned table that was skipped because its declaration is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTable {
    /// The table name.
    pub table_name: String,
    /// Why the table was skipped.
    pub reason: String,
}

/// The facts extracted from one metadata model.
#[derive(Debug, Clone, Default)]
pub struct MetadataScan {
    /// Partition configs keyed by table name.
    pub partitions: BTreeMap<String, PartitionConfig>,
    /// Enum definitions keyed by type name.
    pub enums: BTreeMap<String, EnumDefinition>,
    /// Tables skipped when invalid declarations are non-fatal.
    pub skipped: Vec<SkippedTable>,
}

/// Parses a `STRATEGY (column)` clause.
///
/// # Errors
///
/// Returns a configuration error if the clause is malformed or names an
/// unknown strategy.
pub fn parse_partition_clause(clause: &str) -> Result<(PartitionStrategy, String), ShardError> {
    let caps = PARTITION_CLAUSE_RE.captures(clause).ok_or_else(|| {
        ShardError::ConfigurationError(format!(
            "Invalid partition_by clause: {}. Expected format: 'STRATEGY (column_name)'",
            clause.trim()
        ))
    })?;
    let strategy: PartitionStrategy = caps[1].parse()?;
    Ok((strategy, caps[2].to_string()))
}

/// Returns the raw partition clause of `table`, if it declares one.
///
/// The keyword-argument map takes precedence over the info map.
///
/// # Errors
///
/// Returns a configuration error if the annotation is not a string.
pub fn partition_clause(table: &Table) -> Result<Option<&str>, ShardError> {
    let Some(value) = table
        .kwargs
        .get(PARTITION_BY_KEY)
        .or_else(|| table.info.get(PARTITION_BY_KEY))
    else {
        return Ok(None);
    };
    value.as_str().map(Some).ok_or_else(|| {
        ShardError::ConfigurationError(format!(
            "{PARTITION_BY_KEY} on table '{}' must be a string, got {value}",
            table.name
        ))
    })
}

/// Reads partition declarations and enum columns from a metadata model.
pub struct MetadataScanner<'a> {
    settings: &'a PartitionSettings,
}

impl<'a> MetadataScanner<'a> {
    /// Creates a scanner applying the given partition defaults and overrides.
    pub const fn new(settings: &'a PartitionSettings) -> Self {
        Self { settings }
    }

    /// Scans partitions and enums in one pass.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error when
    /// `validate_partition_keys` is enabled, or any invalid enum type name.
    pub fn scan(&self, metadata: &MetaData) -> Result<MetadataScan, ShardError> {
        let (partitions, skipped) = self.scan_partitions(metadata)?;
        let enums = Self::scan_enums(metadata)?;
        Ok(MetadataScan {
            partitions,
            enums,
            skipped,
        })
    }

    /// Builds a [`PartitionConfig`] for every annotated table.
    ///
    /// With `validate_partition_keys` off, invalid tables are logged and
    /// returned in the skipped list instead of failing the scan.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error when `validate_partition_keys`
    /// is enabled.
    pub fn scan_partitions(
        &self,
        metadata: &MetaData,
    ) -> Result<(BTreeMap<String, PartitionConfig>, Vec<SkippedTable>), ShardError> {
        let mut partitions = BTreeMap::new();
        let mut skipped = Vec::new();

        for table in &metadata.tables {
            match self.table_config(table) {
                Ok(Some(config)) => {
                    tracing::info!(
                        table = %table.name,
                        strategy = %config.strategy(),
                        shards = config.shard_count(),
                        "Detected partitioned table"
                    );
                    partitions.insert(table.name.clone(), config);
                }
                Ok(None) => {}
                Err(e) if self.settings.validate_partition_keys => {
                    return Err(ShardError::ConfigurationError(format!(
                        "Invalid partition configuration for table {}: {e}",
                        table.name
                    )));
                }
                Err(e) => {
                    tracing::error!(table = %table.name, error = %e, "Skipping partitioned table");
                    skipped.push(SkippedTable {
                        table_name: table.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok((partitions, skipped))
    }

    /// Collects the enum types used by any column.
    ///
    /// A type declared by several columns keeps its last declaration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an enum type name that is not a
    /// plain identifier.
    pub fn scan_enums(metadata: &MetaData) -> Result<BTreeMap<String, EnumDefinition>, ShardError> {
        let mut enums = BTreeMap::new();
        for table in &metadata.tables {
            for column in &table.columns {
                let Some((name, values)) = column.column_type.as_enum() else {
                    continue;
                };
                if !is_valid_identifier(name) {
                    return Err(ShardError::ConfigurationError(format!(
                        "Invalid enum type name '{name}' on {}.{}",
                        table.name, column.name
                    )));
                }
                enums.insert(name.to_string(), EnumDefinition::new(name, values.iter().cloned()));
            }
        }
        Ok(enums)
    }

    /// Builds the config for one table, or `None` if it is not partitioned.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the declaration is invalid.
    pub fn table_config(&self, table: &Table) -> Result<Option<PartitionConfig>, ShardError> {
        let Some(clause) = partition_clause(table)? else {
            return Ok(None);
        };
        let (strategy, column) = parse_partition_clause(clause)?;

        if table.column(&column).is_none() && !table.columns.is_empty() {
            return Err(ShardError::ConfigurationError(format!(
                "Partition column '{column}' does not exist on table '{}'",
                table.name
            )));
        }

        let primary_key = table.primary_key();
        if !primary_key.is_empty() && !primary_key.contains(&column.as_str()) {
            return Err(ShardError::ConfigurationError(format!(
                "Primary key of table '{}' must include partition column '{column}'",
                table.name
            )));
        }

        let overrides = self.settings.table_override(&table.name);
        let explicit_count = overrides.and_then(|o| o.partition_count);
        let partition_count = match strategy {
            PartitionStrategy::Hash => {
                Some(explicit_count.unwrap_or(self.settings.default_partition_count))
            }
            PartitionStrategy::Range | PartitionStrategy::List => explicit_count,
        };

        let custom_values = overrides
            .and_then(|o| o.custom_values.as_ref())
            .map(|values| values.iter().map(ListEntry::from_json).collect::<Result<Vec<_>, _>>())
            .transpose()?;
        let range_bounds = overrides
            .and_then(|o| o.range_bounds.as_ref())
            .map(|bounds| bounds.iter().map(RangeBound::from_json).collect::<Result<Vec<_>, _>>())
            .transpose()?;
        let naming_pattern = overrides
            .and_then(|o| o.naming_pattern.clone())
            .unwrap_or_else(|| self.settings.default_naming_pattern.clone());

        PartitionConfig::new(
            table.name.clone(),
            strategy,
            column,
            PartitionParams {
                partition_count,
                naming_pattern: Some(naming_pattern),
                custom_values,
                range_bounds,
            },
        )
        .map(Some)
    }
}
