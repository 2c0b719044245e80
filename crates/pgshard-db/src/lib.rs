//! # pgshard-db
//!
//! The declarative metadata model that migrations are generated from.
//!
//! A [`MetaData`] is an ordered collection of [`Table`]s. Each table carries
//! its [`Column`]s, [`Index`]es, and [`ForeignKey`]s, plus two free-form
//! option maps (`kwargs` and `info`) where dialect options such as
//! `postgresql_partition_by` are attached. A [`SchemaSnapshot`] is the same
//! information as reflected from a live database.
//!
//! ## Modules
//!
//! - [`column`] - `Column` and `ColumnType` (including enumerated types)
//! - [`table`] - `Table`, `Index`, `ForeignKey`
//! - [`metadata`] - `MetaData` and model-file loading
//! - [`reflection`] - `SchemaSnapshot` and `LiveEnumSnapshot` of a live database

pub mod column;
pub mod metadata;
pub mod reflection;
pub mod table;

pub use column::{Column, ColumnType};
pub use metadata::MetaData;
pub use reflection::{LiveEnumSnapshot, ReflectedForeignKey, ReflectedIndex, SchemaSnapshot};
pub use table::{ForeignKey, Index, OnDelete, Table};
