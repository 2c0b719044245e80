//! Rendering of migration operations to PostgreSQL DDL.
//!
//! Identifiers are emitted unquoted so that statements produced here and
//! the shard DDL refer to the same (case-folded) objects.

use std::collections::BTreeMap;

use pgshard_db::{Column, ForeignKey, Index, Table};

use crate::operations::{MigrateOp, OperationList};
use crate::partition::PartitionConfig;

/// Translates operations into DDL statements.
pub trait SchemaEditor: Send + Sync {
    /// Generates `CREATE TABLE` for a table.
    fn create_table(&self, table: &Table) -> Vec<String>;

    /// Generates `DROP TABLE` for a table.
    fn drop_table(&self, table_name: &str) -> Vec<String>;

    /// Generates `CREATE INDEX`.
    fn create_index(&self, table_name: &str, index: &Index) -> Vec<String>;

    /// Generates `DROP INDEX`.
    fn drop_index(&self, index_name: &str) -> Vec<String>;

    /// Generates `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY`.
    fn add_foreign_key(&self, table_name: &str, fk: &ForeignKey) -> Vec<String>;

    /// Generates `ALTER TABLE ... DROP CONSTRAINT`.
    fn drop_foreign_key(&self, table_name: &str, fk_name: &str) -> Vec<String>;

    /// Generates the definition of one column.
    fn column_sql(&self, column: &Column) -> String;

    /// Renders any operation.
    fn render(&self, op: &MigrateOp) -> Vec<String> {
        match op {
            MigrateOp::CreateTable { table } => self.create_table(table),
            MigrateOp::DropTable { table_name } => self.drop_table(table_name),
            MigrateOp::CreateIndex { table_name, index } => self.create_index(table_name, index),
            MigrateOp::DropIndex { index_name } => self.drop_index(index_name),
            MigrateOp::AddForeignKey { table_name, fk } => self.add_foreign_key(table_name, fk),
            MigrateOp::DropForeignKey {
                table_name,
                fk_name,
            } => self.drop_foreign_key(table_name, fk_name),
            MigrateOp::ExecuteSql { sql } => vec![sql.clone()],
        }
    }

    /// Renders a whole list, in order.
    fn render_all(&self, ops: &OperationList) -> Vec<String> {
        ops.iter().flat_map(|op| self.render(op)).collect()
    }
}

/// PostgreSQL schema editor.
///
/// Tables registered through [`PostgresSchemaEditor::with_partitioning`]
/// are created with a `PARTITION BY` clause.
#[derive(Debug, Clone, Default)]
pub struct PostgresSchemaEditor {
    partition_by: BTreeMap<String, String>,
}

impl PostgresSchemaEditor {
    /// Creates an editor with no partitioned tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the partitioned tables.
    pub fn with_partitioning<'a>(
        mut self,
        configs: impl IntoIterator<Item = &'a PartitionConfig>,
    ) -> Self {
        for config in configs {
            self.partition_by
                .insert(config.table_name().to_string(), config.partition_by_clause());
        }
        self
    }
}

impl SchemaEditor for PostgresSchemaEditor {
    fn create_table(&self, table: &Table) -> Vec<String> {
        let mut parts: Vec<String> = table.columns.iter().map(|c| self.column_sql(c)).collect();
        let pk = table.primary_key();
        if !pk.is_empty() {
            parts.push(format!("PRIMARY KEY ({})", pk.join(", ")));
        }

        let mut sql = format!("CREATE TABLE {} ({})", table.name, parts.join(", "));
        if let Some(clause) = self.partition_by.get(&table.name) {
            sql.push_str(" PARTITION BY ");
            sql.push_str(clause);
        }
        vec![sql]
    }

    fn drop_table(&self, table_name: &str) -> Vec<String> {
        vec![format!("DROP TABLE IF EXISTS {table_name}")]
    }

    fn create_index(&self, table_name: &str, index: &Index) -> Vec<String> {
        let unique = if index.unique { "UNIQUE " } else { "" };
        vec![format!(
            "CREATE {unique}INDEX {} ON {table_name} ({})",
            index.resolved_name(table_name),
            index.columns.join(", ")
        )]
    }

    fn drop_index(&self, index_name: &str) -> Vec<String> {
        vec![format!("DROP INDEX IF EXISTS {index_name}")]
    }

    fn add_foreign_key(&self, table_name: &str, fk: &ForeignKey) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {table_name} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
            fk.resolved_name(table_name),
            fk.columns.join(", "),
            fk.referred_table,
            fk.referred_columns.join(", "),
            fk.on_delete.as_sql()
        )]
    }

    fn drop_foreign_key(&self, table_name: &str, fk_name: &str) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {table_name} DROP CONSTRAINT IF EXISTS {fk_name}"
        )]
    }

    fn column_sql(&self, column: &Column) -> String {
        let null = if column.nullable { "" } else { " NOT NULL" };
        format!("{} {}{null}", column.name, column.column_type.sql_type())
    }
}
