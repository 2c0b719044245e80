//! # pgshard-core
//!
//! Core types, settings, and error types for pgshard. This crate has no
//! dependency on the other pgshard crates and provides the foundation for all
//! of them.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Generator settings, including partition defaults
//! - [`settings_loader`] - Loading settings from TOML/JSON files and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{ShardError, ShardResult};
pub use settings::{DatabaseSettings, FilterSettings, PartitionSettings, Settings, TableOverride};
