//! High-level partition management over a metadata model.

use std::collections::BTreeMap;

use pgshard_core::{PartitionSettings, ShardError};
use pgshard_db::MetaData;

use crate::partition::PartitionConfig;
use crate::partition_sql::{generate_creation_sql, generate_drop_sql};
use crate::scanner::{MetadataScanner, SkippedTable};

/// The shard DDL of one partitioned table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSql {
    /// Shard creation statements.
    pub upgrade: Vec<String>,
    /// Shard drop statements.
    pub downgrade: Vec<String>,
}

/// Everything known about one partitioned table.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionInfo {
    /// The validated config.
    pub config: PartitionConfig,
    /// The number of shards created.
    pub partition_count: usize,
    /// Shard creation statements.
    pub upgrade_sql: Vec<String>,
    /// Shard drop statements.
    pub downgrade_sql: Vec<String>,
    /// Shard names in shard order.
    pub partition_names: Vec<String>,
}

/// Detects partitioned tables and generates their shard DDL.
///
/// # Examples
///
/// ```
/// use pgshard_core::PartitionSettings;
/// use pgshard_db::{MetaData, Table};
/// use pgshard_migrations::PartitionManager;
///
/// let md = MetaData::new().with_table(
///     Table::new("orders", vec![]).with_kwarg("postgresql_partition_by", "HASH (customer_id)"),
/// );
/// let mut manager = PartitionManager::new(PartitionSettings::default());
/// manager.analyze_metadata(&md).unwrap();
/// let info = manager.table_partition_info("orders").unwrap().unwrap();
/// assert_eq!(info.partition_names, vec!["orders_p0", "orders_p1", "orders_p2", "orders_p3"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PartitionManager {
    settings: PartitionSettings,
    configs: BTreeMap<String, PartitionConfig>,
    skipped: Vec<SkippedTable>,
}

impl PartitionManager {
    /// Creates a manager with no analyzed tables.
    pub fn new(settings: PartitionSettings) -> Self {
        Self {
            settings,
            configs: BTreeMap::new(),
            skipped: Vec::new(),
        }
    }

    /// The settings this manager applies.
    pub const fn settings(&self) -> &PartitionSettings {
        &self.settings
    }

    /// Detects every partitioned table, replacing any earlier analysis.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid declaration when
    /// `validate_partition_keys` is enabled.
    pub fn analyze_metadata(
        &mut self,
        metadata: &MetaData,
    ) -> Result<&BTreeMap<String, PartitionConfig>, ShardError> {
        let (configs, skipped) = MetadataScanner::new(&self.settings).scan_partitions(metadata)?;
        for config in configs.values() {
            if config.count_diverges_from(self.settings.default_partition_count) {
                tracing::warn!(
                    table = config.table_name(),
                    shards = config.shard_count(),
                    default = self.settings.default_partition_count,
                    "Table shard count differs from the default; the table's own count is used"
                );
            }
        }
        self.configs = configs;
        self.skipped = skipped;
        Ok(&self.configs)
    }

    /// The analyzed configs, keyed by table name.
    pub const fn partitioned_tables(&self) -> &BTreeMap<String, PartitionConfig> {
        &self.configs
    }

    /// Tables skipped during the last analysis.
    pub fn skipped_tables(&self) -> &[SkippedTable] {
        &self.skipped
    }

    /// Returns the config for `table_name`, if it is partitioned.
    pub fn config(&self, table_name: &str) -> Option<&PartitionConfig> {
        self.configs.get(table_name)
    }

    /// Returns `true` if `table_name` is partitioned.
    pub fn is_partitioned(&self, table_name: &str) -> bool {
        self.configs.contains_key(table_name)
    }

    /// Generates creation SQL for `config`, logging it when enabled.
    ///
    /// # Errors
    ///
    /// Returns a generation error if the SQL cannot be rendered.
    pub fn creation_sql(&self, config: &PartitionConfig) -> Result<Vec<String>, ShardError> {
        let statements = generate_creation_sql(config).map_err(|e| {
            ShardError::GenerationError(format!(
                "Failed to generate creation SQL for {}: {e}",
                config.table_name()
            ))
        })?;
        if self.settings.log_sql_generation {
            tracing::info!(
                table = config.table_name(),
                strategy = %config.strategy(),
                count = statements.len(),
                "Generated partitions"
            );
        }
        Ok(statements)
    }

    /// Generates drop SQL for `config`.
    pub fn drop_sql(&self, config: &PartitionConfig) -> Vec<String> {
        let statements = generate_drop_sql(config);
        if self.settings.log_sql_generation {
            tracing::info!(
                table = config.table_name(),
                count = statements.len(),
                "Generated partition drops"
            );
        }
        statements
    }

    /// Analyzes `metadata` and generates shard DDL for every partitioned table.
    ///
    /// # Errors
    ///
    /// Returns the first configuration or generation error.
    pub fn generate_migration_sql(
        &mut self,
        metadata: &MetaData,
    ) -> Result<BTreeMap<String, TableSql>, ShardError> {
        self.analyze_metadata(metadata)?;
        let mut result = BTreeMap::new();
        for (table_name, config) in &self.configs {
            let table_sql = TableSql {
                upgrade: self.creation_sql(config)?,
                downgrade: self.drop_sql(config),
            };
            result.insert(table_name.clone(), table_sql);
        }
        Ok(result)
    }

    /// Returns the full partition picture of an analyzed table.
    ///
    /// # Errors
    ///
    /// Returns a generation error if the table's SQL cannot be rendered.
    pub fn table_partition_info(&self, table_name: &str) -> Result<Option<PartitionInfo>, ShardError> {
        let Some(config) = self.configs.get(table_name) else {
            return Ok(None);
        };
        let upgrade_sql = generate_creation_sql(config)?;
        Ok(Some(PartitionInfo {
            config: config.clone(),
            partition_count: upgrade_sql.len(),
            downgrade_sql: generate_drop_sql(config),
            partition_names: config.partition_names(),
            upgrade_sql,
        }))
    }
}
