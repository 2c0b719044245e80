//! # pgshard
//!
//! Partition-aware schema migration generation for PostgreSQL.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on `pgshard`
//! for everything, or on individual crates for finer-grained control.
//!
//! ```
//! use pgshard::db::{MetaData, Table};
//! use pgshard::migrations::{PartitionManager, PARTITION_BY_KEY};
//!
//! let md = MetaData::new()
//!     .with_table(Table::new("orders", vec![]).with_kwarg(PARTITION_BY_KEY, "HASH (customer_id)"));
//! let mut manager = PartitionManager::new(pgshard::core::PartitionSettings::default());
//! assert_eq!(manager.analyze_metadata(&md).unwrap().len(), 1);
//! ```

/// Error types, settings, and logging setup.
pub use pgshard_core as core;

/// The metadata model and reflected schema snapshots.
pub use pgshard_db as db;

/// Live database introspection.
pub use pgshard_db_backends as db_backends;

/// Partition detection, shard DDL, enum sync, and revision generation.
#[cfg(feature = "migrations")]
pub use pgshard_migrations as migrations;

/// The `pgshard` command framework.
#[cfg(feature = "cli")]
pub use pgshard_cli as cli;

pub use serde_json;
pub use tracing;
