//! Base introspection trait and common types.
//!
//! The generator never writes to the database. It only asks a
//! [`SchemaIntrospector`] for the current enum labels and the current set of
//! named schema objects.

use pgshard_core::{DatabaseSettings, ShardError};
use pgshard_db::{LiveEnumSnapshot, SchemaSnapshot};

/// Read-only access to a live schema.
///
/// Implementations must be `Send + Sync` so a single introspector can be
/// shared by the CLI and the generation pipeline.
#[async_trait::async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// Returns the vendor name (e.g. "postgresql").
    fn vendor(&self) -> &str;

    /// Reads the labels of every enumerated type, in sort order.
    async fn fetch_enum_snapshot(&self) -> Result<LiveEnumSnapshot, ShardError>;

    /// Reads the tables, indexes, and foreign keys of the target schema.
    async fn reflect_schema(&self) -> Result<SchemaSnapshot, ShardError>;
}

/// Configuration for connecting to a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// The database name.
    pub name: String,
    /// The database host.
    pub host: Option<String>,
    /// The database port.
    pub port: Option<u16>,
    /// The database user.
    pub user: Option<String>,
    /// The database password.
    pub password: Option<String>,
    /// The schema whose objects are reflected.
    pub schema: String,
}

impl DatabaseConfig {
    /// Creates a configuration for a PostgreSQL server.
    pub fn postgres(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: Some(host.into()),
            port: Some(port),
            user: Some(user.into()),
            password: Some(password.into()),
            schema: "public".to_string(),
        }
    }
}

impl From<&DatabaseSettings> for DatabaseConfig {
    fn from(settings: &DatabaseSettings) -> Self {
        let password = if settings.password.is_empty() {
            None
        } else {
            Some(settings.password.clone())
        };
        Self {
            name: settings.name.clone(),
            host: Some(settings.host.clone()),
            port: Some(settings.port),
            user: Some(settings.user.clone()),
            password,
            schema: "public".to_string(),
        }
    }
}

/// An introspector backed by fixed snapshots.
///
/// Used for offline generation against a saved schema and for tests. A
/// missing snapshot behaves like an unreachable database.
#[derive(Debug, Clone, Default)]
pub struct StaticIntrospector {
    enums: Option<LiveEnumSnapshot>,
    schema: Option<SchemaSnapshot>,
}

impl StaticIntrospector {
    /// Creates an introspector that fails every request.
    pub fn unreachable() -> Self {
        Self::default()
    }

    /// Creates an introspector returning the given snapshots.
    pub fn new(enums: LiveEnumSnapshot, schema: SchemaSnapshot) -> Self {
        Self {
            enums: Some(enums),
            schema: Some(schema),
        }
    }

    /// Sets the enum snapshot.
    pub fn with_enums(mut self, enums: LiveEnumSnapshot) -> Self {
        self.enums = Some(enums);
        self
    }

    /// Sets the schema snapshot.
    pub fn with_schema(mut self, schema: SchemaSnapshot) -> Self {
        self.schema = Some(schema);
        self
    }
}

#[async_trait::async_trait]
impl SchemaIntrospector for StaticIntrospector {
    fn vendor(&self) -> &str {
        "static"
    }

    async fn fetch_enum_snapshot(&self) -> Result<LiveEnumSnapshot, ShardError> {
        self.enums
            .clone()
            .ok_or_else(|| ShardError::OperationalError("No enum snapshot available".to_string()))
    }

    async fn reflect_schema(&self) -> Result<SchemaSnapshot, ShardError> {
        self.schema
            .clone()
            .ok_or_else(|| ShardError::OperationalError("No schema snapshot available".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings() {
        let settings = DatabaseSettings {
            host: "db".into(),
            port: 6543,
            name: "app".into(),
            user: "svc".into(),
            password: String::new(),
        };
        let config = DatabaseConfig::from(&settings);
        assert_eq!(config.host.as_deref(), Some("db"));
        assert_eq!(config.port, Some(6543));
        assert!(config.password.is_none());
        assert_eq!(config.schema, "public");
    }

    #[test]
    fn test_postgres_config() {
        let config = DatabaseConfig::postgres("app", "localhost", 5432, "u", "p");
        assert_eq!(config.password.as_deref(), Some("p"));
    }

    #[tokio::test]
    async fn test_static_introspector_returns_snapshots() {
        let intro = StaticIntrospector::new(
            LiveEnumSnapshot::new().with_type("status", &["a"]),
            SchemaSnapshot::new().with_table("orders"),
        );
        assert_eq!(intro.vendor(), "static");
        let enums = intro.fetch_enum_snapshot().await.unwrap();
        assert!(enums.labels("status").is_some());
        let schema = intro.reflect_schema().await.unwrap();
        assert!(schema.has_table("orders"));
    }

    #[tokio::test]
    async fn test_unreachable_introspector_fails() {
        let intro = StaticIntrospector::unreachable();
        let err = intro.fetch_enum_snapshot().await.unwrap_err();
        assert!(err.is_database_error());
        assert!(intro.reflect_schema().await.is_err());
    }
}
