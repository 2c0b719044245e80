//! Built-in commands.
//!
//! Each command implements the
//! [`ManagementCommand`](crate::command::ManagementCommand) trait.

pub mod check;
pub mod makemigrations;
pub mod showpartitions;

pub use check::CheckCommand;
pub use makemigrations::MakemigrationsCommand;
pub use showpartitions::ShowpartitionsCommand;

use pgshard_core::{Settings, ShardError};
use pgshard_db::MetaData;
use pgshard_db_backends::SchemaIntrospector;

use crate::command::CommandRegistry;

/// Registers all built-in commands into the given registry.
pub fn register_builtin_commands(registry: &mut CommandRegistry) {
    registry.register(Box::new(MakemigrationsCommand));
    registry.register(Box::new(ShowpartitionsCommand));
    registry.register(Box::new(CheckCommand));
}

/// Loads the metadata model named by `settings.metadata_path`.
///
/// # Errors
///
/// Returns a configuration error if no model file is configured or it
/// cannot be parsed.
pub fn load_metadata(settings: &Settings) -> Result<MetaData, ShardError> {
    let path = settings.metadata_path.as_ref().ok_or_else(|| {
        ShardError::ConfigurationError(
            "No metadata_path configured; set it in the settings file or PGSHARD_METADATA_PATH"
                .to_string(),
        )
    })?;
    MetaData::from_file(path)
}

/// Opens an introspector for the configured database, if any.
///
/// # Errors
///
/// Returns an error if the connection pool cannot be built.
#[cfg(feature = "postgres")]
pub fn connect(settings: &Settings) -> Result<Option<Box<dyn SchemaIntrospector>>, ShardError> {
    use pgshard_db_backends::{DatabaseConfig, PostgresBackend};

    let Some(database) = &settings.database else {
        return Ok(None);
    };
    let backend = PostgresBackend::from_config(&DatabaseConfig::from(database))?;
    Ok(Some(Box::new(backend)))
}

/// Opens an introspector for the configured database, if any.
///
/// Built without the `postgres` feature, so every run is offline.
///
/// # Errors
///
/// Never fails in this build.
#[cfg(not(feature = "postgres"))]
pub fn connect(settings: &Settings) -> Result<Option<Box<dyn SchemaIntrospector>>, ShardError> {
    if settings.database.is_some() {
        tracing::warn!("Built without the `postgres` feature; ignoring the database and running offline");
    }
    Ok(None)
}
