//! # pgshard-migrations
//!
//! Partition-aware migration generation for PostgreSQL. Detects tables
//! declared as partitioned in a metadata model, generates the DDL for their
//! shards, keeps enum types in step with the live database, and splices all
//! of it into the operations proposed by a schema diff.
//!
//! ## Architecture
//!
//! - [`MetadataScanner`] reads partition declarations and enum columns.
//! - [`PartitionConfig`] is a validated partition declaration.
//! - [`partition_sql`] turns a config into shard creation and drop statements.
//! - [`EnumSynchronizer`] compares model enums against a live snapshot.
//! - [`AutogenerateFilter`] hides shard objects from the diff.
//! - [`MigrationDirectiveProcessor`] splices everything into the diff output.
//! - [`RevisionGenerator`] runs the whole pipeline and [`RevisionWriter`]
//!   persists the result.
//!
//! ## Module Overview
//!
//! - [`partition`] - strategies, values, and `PartitionConfig`
//! - [`partition_sql`] - shard DDL
//! - [`scanner`] - `MetadataScanner`, `EnumDefinition`
//! - [`manager`] - `PartitionManager`
//! - [`enums`] - `EnumSynchronizer`
//! - [`filter`] - `ObjectFilter`, `AutogenerateFilter`
//! - [`operations`] - `MigrateOp`, `OperationList`
//! - [`autodetect`] - `DiffEngine`, `MetadataAutodetector`
//! - [`schema_editor`] - `SchemaEditor`, `PostgresSchemaEditor`
//! - [`directives`] - `MigrationDirectiveProcessor`
//! - [`sequence`] - revision numbering
//! - [`revision`] - `MigrationRevision`, `RevisionWriter`
//! - [`generator`] - `RevisionGenerator`

// Clippy overrides appropriate for a DDL generation / migration crate.
#![allow(clippy::too_many_lines)]
#![allow(clippy::result_large_err)]
#![allow(clippy::format_push_string)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]

pub mod autodetect;
pub mod directives;
pub mod enums;
pub mod filter;
pub mod generator;
pub mod manager;
pub mod operations;
pub mod partition;
pub mod partition_sql;
pub mod revision;
pub mod scanner;
pub mod schema_editor;
pub mod sequence;

// Re-export key types at the crate root.
pub use autodetect::{DiffEngine, DiffResult, MetadataAutodetector};
pub use directives::{MigrationDirectiveProcessor, ProcessReport, RevisionDirective};
pub use enums::{load_enum_snapshot, EnumOps, EnumSynchronizer};
pub use filter::{AutogenerateFilter, IncludeAll, ObjectDescriptor, ObjectFilter, ObjectKind};
pub use generator::RevisionGenerator;
pub use manager::{PartitionInfo, PartitionManager, TableSql};
pub use operations::{MigrateOp, OperationList};
pub use partition::{
    ListEntry, NamingPattern, PartitionConfig, PartitionParams, PartitionSpec, PartitionStrategy,
    PartitionValue, RangeBound,
};
pub use partition_sql::{generate_creation_sql, generate_drop_sql};
pub use revision::{MigrationRevision, RevisionWriter};
pub use scanner::{EnumDefinition, MetadataScan, MetadataScanner, SkippedTable, PARTITION_BY_KEY};
pub use schema_editor::{PostgresSchemaEditor, SchemaEditor};
pub use sequence::{next_sequence_number, SequenceNumber};
