//! Migration operations and the ordered operation list.
//!
//! A diff engine produces [`MigrateOp`]s in an [`OperationList`]; the
//! directive processor then splices extra statements into that list with
//! the positional primitives below rather than editing the vector directly.

use pgshard_core::ShardError;
use pgshard_db::{ForeignKey, Index, Table};

/// A single schema change.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrateOp {
    /// Creates a table from its full definition.
    CreateTable {
        /// The table to create.
        table: Table,
    },
    /// Drops a table.
    DropTable {
        /// The table to drop.
        table_name: String,
    },
    /// Creates an index.
    CreateIndex {
        /// The indexed table.
        table_name: String,
        /// The index definition.
        index: Index,
    },
    /// Drops an index.
    DropIndex {
        /// The index to drop.
        index_name: String,
    },
    /// Adds a foreign key constraint.
    AddForeignKey {
        /// The constrained table.
        table_name: String,
        /// The constraint definition.
        fk: ForeignKey,
    },
    /// Drops a foreign key constraint.
    DropForeignKey {
        /// The constrained table.
        table_name: String,
        /// The constraint to drop.
        fk_name: String,
    },
    /// Runs a raw statement (or an SQL comment).
    ExecuteSql {
        /// The statement.
        sql: String,
    },
}

impl MigrateOp {
    /// Creates an [`MigrateOp::ExecuteSql`] operation.
    pub fn execute_sql(sql: impl Into<String>) -> Self {
        Self::ExecuteSql { sql: sql.into() }
    }

    /// Returns the table this operation targets, if any.
    pub fn table_name(&self) -> Option<&str> {
        match self {
            Self::CreateTable { table } => Some(&table.name),
            Self::DropTable { table_name }
            | Self::CreateIndex { table_name, .. }
            | Self::AddForeignKey { table_name, .. }
            | Self::DropForeignKey { table_name, .. } => Some(table_name),
            Self::DropIndex { .. } | Self::ExecuteSql { .. } => None,
        }
    }

    /// Returns the table name if this operation creates a table.
    pub fn created_table(&self) -> Option<&str> {
        match self {
            Self::CreateTable { table } => Some(&table.name),
            _ => None,
        }
    }

    /// Returns the table name if this operation drops a table.
    pub fn dropped_table(&self) -> Option<&str> {
        match self {
            Self::DropTable { table_name } => Some(table_name),
            _ => None,
        }
    }

    /// Returns a human-readable description.
    pub fn describe(&self) -> String {
        match self {
            Self::CreateTable { table } => format!("Create table {}", table.name),
            Self::DropTable { table_name } => format!("Drop table {table_name}"),
            Self::CreateIndex { table_name, index } => {
                format!("Create index {} on {table_name}", index.resolved_name(table_name))
            }
            Self::DropIndex { index_name } => format!("Drop index {index_name}"),
            Self::AddForeignKey { table_name, fk } => format!(
                "Add foreign key {} on {table_name}",
                fk.resolved_name(table_name)
            ),
            Self::DropForeignKey {
                table_name,
                fk_name,
            } => format!("Drop foreign key {fk_name} on {table_name}"),
            Self::ExecuteSql { sql } => {
                let first = sql.lines().next().unwrap_or_default();
                format!("Execute SQL: {first}")
            }
        }
    }
}

/// An ordered list of operations with splicing primitives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationList {
    ops: Vec<MigrateOp>,
}

impl OperationList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one operation.
    pub fn push(&mut self, op: MigrateOp) {
        self.ops.push(op);
    }

    /// Inserts `ops` at the front, keeping their relative order.
    pub fn prepend_all(&mut self, ops: impl IntoIterator<Item = MigrateOp>) {
        self.ops.splice(0..0, ops);
    }

    /// Appends `ops` at the back, keeping their relative order.
    pub fn append_all(&mut self, ops: impl IntoIterator<Item = MigrateOp>) {
        self.ops.extend(ops);
    }

    /// Inserts `ops` directly after the operation at `index`.
    ///
    /// # Errors
    ///
    /// Returns a generation error if `index` is out of bounds.
    pub fn insert_after(
        &mut self,
        index: usize,
        ops: impl IntoIterator<Item = MigrateOp>,
    ) -> Result<(), ShardError> {
        self.check_index(index)?;
        let at = index + 1;
        self.ops.splice(at..at, ops);
        Ok(())
    }

    /// Inserts `ops` directly before the operation at `index`.
    ///
    /// # Errors
    ///
    /// Returns a generation error if `index` is out of bounds.
    pub fn insert_before(
        &mut self,
        index: usize,
        ops: impl IntoIterator<Item = MigrateOp>,
    ) -> Result<(), ShardError> {
        self.check_index(index)?;
        self.ops.splice(index..index, ops);
        Ok(())
    }

    /// Returns the indices of every operation matching `pred`, ascending.
    pub fn positions(&self, pred: impl Fn(&MigrateOp) -> bool) -> Vec<usize> {
        self.ops
            .iter()
            .enumerate()
            .filter(|(_, op)| pred(op))
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns the operation at `index`.
    pub fn get(&self, index: usize) -> Option<&MigrateOp> {
        self.ops.get(index)
    }

    /// Iterates over the operations in order.
    pub fn iter(&self) -> std::slice::Iter<'_, MigrateOp> {
        self.ops.iter()
    }

    /// Returns the operations as a slice.
    pub fn as_slice(&self) -> &[MigrateOp] {
        &self.ops
    }

    /// Returns the number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Consumes the list, returning the operations.
    pub fn into_vec(self) -> Vec<MigrateOp> {
        self.ops
    }

    fn check_index(&self, index: usize) -> Result<(), ShardError> {
        if index >= self.ops.len() {
            return Err(ShardError::GenerationError(format!(
                "Operation index {index} out of bounds for list of {}",
                self.ops.len()
            )));
        }
        Ok(())
    }
}

impl From<Vec<MigrateOp>> for OperationList {
    fn from(ops: Vec<MigrateOp>) -> Self {
        Self { ops }
    }
}

impl FromIterator<MigrateOp> for OperationList {
    fn from_iter<I: IntoIterator<Item = MigrateOp>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for OperationList {
    type Item = MigrateOp;
    type IntoIter = std::vec::IntoIter<MigrateOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a OperationList {
    type Item = &'a MigrateOp;
    type IntoIter = std::slice::Iter<'a, MigrateOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql(s: &str) -> MigrateOp {
        MigrateOp::execute_sql(s)
    }

    fn sqls(list: &OperationList) -> Vec<String> {
        list.iter()
            .map(|op| match op {
                MigrateOp::ExecuteSql { sql } => sql.clone(),
                other => other.describe(),
            })
            .collect()
    }

    // ── MigrateOp ───────────────────────────────────────────────────

    #[test]
    fn test_table_accessors() {
        let create = MigrateOp::CreateTable {
            table: Table::new("orders", vec![]),
        };
        let drop = MigrateOp::DropTable {
            table_name: "orders".into(),
        };
        assert_eq!(create.created_table(), Some("orders"));
        assert_eq!(create.dropped_table(), None);
        assert_eq!(drop.dropped_table(), Some("orders"));
        assert_eq!(drop.table_name(), Some("orders"));
        assert_eq!(sql("SELECT 1").table_name(), None);
    }

    #[test]
    fn test_describe() {
        let op = MigrateOp::CreateIndex {
            table_name: "orders".into(),
            index: Index::new(&["created_at"]),
        };
        assert_eq!(op.describe(), "Create index orders_created_at_idx on orders");
        assert_eq!(sql("-- hi\nmore").describe(), "Execute SQL: -- hi");
    }

    // ── OperationList ───────────────────────────────────────────────

    #[test]
    fn test_prepend_and_append() {
        let mut list: OperationList = vec![sql("b")].into();
        list.prepend_all(vec![sql("a1"), sql("a2")]);
        list.append_all(vec![sql("c")]);
        list.push(sql("d"));
        assert_eq!(sqls(&list), vec!["a1", "a2", "b", "c", "d"]);
    }

    #[test]
    fn test_insert_after_and_before() {
        let mut list: OperationList = vec![sql("a"), sql("b"), sql("c")].into();
        list.insert_after(0, vec![sql("a+"), sql("a++")]).unwrap();
        list.insert_before(3, vec![sql("-b")]).unwrap();
        assert_eq!(sqls(&list), vec!["a", "a+", "a++", "-b", "b", "c"]);
    }

    #[test]
    fn test_insert_after_last() {
        let mut list: OperationList = vec![sql("a")].into();
        list.insert_after(0, vec![sql("b")]).unwrap();
        assert_eq!(sqls(&list), vec!["a", "b"]);
    }

    #[test]
    fn test_insert_out_of_bounds() {
        let mut list = OperationList::new();
        assert!(list.insert_after(0, vec![sql("x")]).unwrap_err().is_generation_error());
        assert!(list.insert_before(0, vec![sql("x")]).is_err());
        assert!(list.is_empty());
    }

    #[test]
    fn test_positions() {
        let list: OperationList = vec![
            MigrateOp::CreateTable {
                table: Table::new("a", vec![]),
            },
            sql("x"),
            MigrateOp::CreateTable {
                table: Table::new("b", vec![]),
            },
        ]
        .into_iter()
        .collect();
        assert_eq!(list.positions(|op| op.created_table().is_some()), vec![0, 2]);
        assert_eq!(list.len(), 3);
        assert_eq!(list.into_vec().len(), 3);
    }
}
