//! # pgshard-db-backends
//!
//! Read-only access to a live database for the migration generator. Two
//! facts are read: the labels of every enumerated type, and the names of the
//! tables, indexes, and foreign keys that currently exist.
//!
//! - [`base`] - the [`SchemaIntrospector`] trait, connection config, and an
//!   in-memory introspector
//! - `postgresql` - the `tokio-postgres` implementation (feature `postgres`)

pub mod base;
#[cfg(feature = "postgres")]
pub mod postgresql;

pub use base::{DatabaseConfig, SchemaIntrospector, StaticIntrospector};
#[cfg(feature = "postgres")]
pub use postgresql::PostgresBackend;
