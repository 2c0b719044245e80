//! Settings for the migration generator.
//!
//! [`Settings`] holds everything a generation run needs: where revisions
//! live, which model file to read, how to reach the live database, and the
//! partition defaults applied to every partitioned table.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The shard-count default used when neither a table override nor the
/// settings specify one.
pub const DEFAULT_PARTITION_COUNT: u32 = 4;

/// The shard naming template used when none is configured.
pub const DEFAULT_NAMING_PATTERN: &str = "{table}_p{number}";

/// Live database connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// The database host.
    pub host: String,
    /// The database port.
    pub port: u16,
    /// The database name.
    pub name: String,
    /// The database user.
    pub user: String,
    /// The database password.
    pub password: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            name: "postgres".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
        }
    }
}

/// Per-table partition overrides.
///
/// Values are kept as raw JSON scalars here; the migrations crate turns
/// them into typed partition parameters and rejects anything that is not a
/// scalar (or, for list entries, a group of scalars).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOverride {
    /// Number of shards for HASH partitioning.
    pub partition_count: Option<u32>,
    /// Shard naming template for this table.
    pub naming_pattern: Option<String>,
    /// One entry per LIST shard; an array entry maps several values to one shard.
    pub custom_values: Option<Vec<serde_json::Value>>,
    /// One `[start, end]` pair per RANGE shard.
    pub range_bounds: Option<Vec<(serde_json::Value, serde_json::Value)>>,
}

/// Global partition management settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionSettings {
    /// Shard count applied to HASH tables without an override.
    pub default_partition_count: u32,
    /// Naming template applied to tables without an override.
    pub default_naming_pattern: String,
    /// Whether shard DDL is injected into generated revisions.
    pub auto_generate_enabled: bool,
    /// When `true`, an invalid partition declaration aborts the revision;
    /// when `false`, the table is skipped and the cause is logged.
    pub validate_partition_keys: bool,
    /// Whether SQL generation is logged at `info` level.
    pub log_sql_generation: bool,
    /// Table-specific overrides, keyed by table name.
    pub tables: BTreeMap<String, TableOverride>,
}

impl Default for PartitionSettings {
    fn default() -> Self {
        Self {
            default_partition_count: DEFAULT_PARTITION_COUNT,
            default_naming_pattern: DEFAULT_NAMING_PATTERN.to_string(),
            auto_generate_enabled: true,
            validate_partition_keys: true,
            log_sql_generation: true,
            tables: BTreeMap::new(),
        }
    }
}

impl PartitionSettings {
    /// Returns the override for `table_name`, if one is configured.
    pub fn table_override(&self, table_name: &str) -> Option<&TableOverride> {
        self.tables.get(table_name)
    }
}

/// Settings for the autogenerate object filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Foreign key name fragments that identify constraints created against
    /// individual shards (e.g. `orders_customer_id_fkey`). A foreign key whose
    /// name contains one of these and ends in a digit is ignored.
    pub shard_fk_name_markers: Vec<String>,
}

/// The complete set of generator settings.
///
/// # Examples
///
/// ```
/// use pgshard_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(settings.partitions.default_partition_count, 4);
/// assert!(settings.database.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode (pretty logs) is enabled.
    pub debug: bool,
    /// The log level filter (e.g. "info", "pgshard_migrations=debug").
    pub log_level: String,

    // ── Inputs and outputs ───────────────────────────────────────────

    /// The migration root; revisions live in `<script_location>/versions`.
    pub script_location: PathBuf,
    /// The JSON or TOML model file describing the metadata.
    pub metadata_path: Option<PathBuf>,

    // ── Database ─────────────────────────────────────────────────────

    /// The live database. `None` means every run is offline.
    pub database: Option<DatabaseSettings>,

    // ── Generation ───────────────────────────────────────────────────

    /// Partition defaults and per-table overrides.
    pub partitions: PartitionSettings,
    /// Autogenerate filter settings.
    pub filter: FilterSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            script_location: PathBuf::from("migrations"),
            metadata_path: None,
            database: None,
            partitions: PartitionSettings::default(),
            filter: FilterSettings::default(),
        }
    }
}

impl Settings {
    /// Returns the directory holding generated revisions.
    pub fn versions_dir(&self) -> PathBuf {
        self.script_location.join("versions")
    }
}
