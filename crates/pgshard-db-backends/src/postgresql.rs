//! PostgreSQL introspection using `tokio-postgres` and `deadpool-postgres`.
//!
//! [`PostgresBackend`] reads the system catalogs only. It never issues DDL.

use pgshard_core::ShardError;
use pgshard_db::{LiveEnumSnapshot, SchemaSnapshot};

use crate::base::{DatabaseConfig, SchemaIntrospector};

const ENUM_LABELS_SQL: &str = "SELECT t.typname, e.enumlabel \
     FROM pg_type t JOIN pg_enum e ON t.oid = e.enumtypid \
     ORDER BY t.typname, e.enumsortorder";

const TABLES_SQL: &str = "SELECT tablename FROM pg_tables WHERE schemaname = $1";

// Indexes backing primary key and unique constraints are owned by the
// constraint, not declared separately, so they are left out.
const INDEXES_SQL: &str = "SELECT i.indexname, i.tablename FROM pg_indexes i \
     WHERE i.schemaname = $1 \
     AND NOT EXISTS (SELECT 1 FROM pg_constraint c WHERE c.conname = i.indexname)";

const FOREIGN_KEYS_SQL: &str = "SELECT c.conname, src.relname, dst.relname \
     FROM pg_constraint c \
     JOIN pg_class src ON src.oid = c.conrelid \
     JOIN pg_class dst ON dst.oid = c.confrelid \
     JOIN pg_namespace n ON n.oid = src.relnamespace \
     WHERE c.contype = 'f' AND n.nspname = $1";

/// A PostgreSQL introspector.
///
/// Uses `deadpool-postgres` for the connection and `tokio-postgres` for the
/// catalog queries.
pub struct PostgresBackend {
    pool: deadpool_postgres::Pool,
    schema: String,
}

impl PostgresBackend {
    /// Creates a new `PostgresBackend` from a `deadpool-postgres` pool,
    /// reflecting the `public` schema.
    pub fn new(pool: deadpool_postgres::Pool) -> Self {
        Self {
            pool,
            schema: "public".to_string(),
        }
    }

    /// Creates a new backend from a [`DatabaseConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, ShardError> {
        let mut pg_config = deadpool_postgres::Config::new();
        pg_config.dbname = Some(config.name.clone());
        pg_config.host = config.host.clone();
        pg_config.port = config.port;
        pg_config.user = config.user.clone();
        pg_config.password = config.password.clone();

        let pool = pg_config
            .create_pool(
                Some(deadpool_postgres::Runtime::Tokio1),
                tokio_postgres::NoTls,
            )
            .map_err(|e| ShardError::OperationalError(format!("Failed to create pool: {e}")))?;

        Ok(Self {
            pool,
            schema: config.schema.clone(),
        })
    }

    async fn client(&self) -> Result<deadpool_postgres::Object, ShardError> {
        self.pool
            .get()
            .await
            .map_err(|e| ShardError::OperationalError(format!("Pool error: {e}")))
    }

    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<tokio_postgres::Row>, ShardError> {
        let client = self.client().await?;
        client
            .query(sql, params)
            .await
            .map_err(|e| ShardError::DatabaseError(format!("{e}")))
    }
}

fn text(row: &tokio_postgres::Row, idx: usize) -> Result<String, ShardError> {
    row.try_get::<_, String>(idx)
        .map_err(|e| ShardError::DatabaseError(format!("Unexpected catalog row: {e}")))
}

#[async_trait::async_trait]
impl SchemaIntrospector for PostgresBackend {
    fn vendor(&self) -> &str {
        "postgresql"
    }

    async fn fetch_enum_snapshot(&self) -> Result<LiveEnumSnapshot, ShardError> {
        let rows = self.query(ENUM_LABELS_SQL, &[]).await?;
        let mut snapshot = LiveEnumSnapshot::new();
        for row in &rows {
            snapshot.push_label(text(row, 0)?, text(row, 1)?);
        }
        tracing::debug!(types = snapshot.types.len(), "Read live enum labels");
        Ok(snapshot)
    }

    async fn reflect_schema(&self) -> Result<SchemaSnapshot, ShardError> {
        let mut snapshot = SchemaSnapshot::new();

        for row in &self.query(TABLES_SQL, &[&self.schema]).await? {
            snapshot = snapshot.with_table(text(row, 0)?);
        }
        for row in &self.query(INDEXES_SQL, &[&self.schema]).await? {
            snapshot = snapshot.with_index(text(row, 0)?, text(row, 1)?);
        }
        for row in &self.query(FOREIGN_KEYS_SQL, &[&self.schema]).await? {
            snapshot = snapshot.with_foreign_key(text(row, 0)?, text(row, 1)?, text(row, 2)?);
        }

        tracing::debug!(
            tables = snapshot.tables.len(),
            indexes = snapshot.indexes.len(),
            foreign_keys = snapshot.foreign_keys.len(),
            "Reflected schema"
        );
        Ok(snapshot)
    }
}
