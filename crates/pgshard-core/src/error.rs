//! Core error types for pgshard.
//!
//! [`ShardError`] covers the two disjoint failure kinds of revision
//! generation (configuration errors and SQL generation errors) alongside the
//! ambient database, serialization, and IO failures that surround them.

use thiserror::Error;

/// The primary error type for pgshard.
///
/// Configuration and generation errors are kept as separate variants so
/// callers can decide whether a failure is attributable to a table's
/// declaration (and may be skipped) or to the generator itself (always fatal).
#[derive(Error, Debug)]
pub enum ShardError {
    // ── Revision generation ──────────────────────────────────────────

    /// A partition declaration, annotation, or setting is invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A valid partition configuration could not be turned into SQL.
    #[error("Generation error: {0}")]
    GenerationError(String),

    // ── Database ─────────────────────────────────────────────────────

    /// A query against the live database failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// The live database could not be reached.
    #[error("Operational error: {0}")]
    OperationalError(String),

    // ── Persistence ──────────────────────────────────────────────────

    /// A revision with the same identifier already exists on disk.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ShardError {
    /// Returns `true` for errors caused by an invalid partition declaration
    /// or setting.
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self, Self::ConfigurationError(_))
    }

    /// Returns `true` for errors raised while rendering partition SQL.
    pub const fn is_generation_error(&self) -> bool {
        matches!(self, Self::GenerationError(_))
    }

    /// Returns `true` for errors talking to the live database.
    pub const fn is_database_error(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::OperationalError(_))
    }
}

/// A convenience type alias for `Result<T, ShardError>`.
pub type ShardResult<T> = Result<T, ShardError>;
