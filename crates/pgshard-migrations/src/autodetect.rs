//! The diff engine seam and an object-level reference autodetector.
//!
//! A [`DiffEngine`] compares the declared metadata against a reflected
//! [`SchemaSnapshot`] and proposes upgrade and downgrade operations, asking
//! an [`ObjectFilter`] about every candidate object first. Column-level
//! comparison belongs to the engine and is not attempted here.

use std::collections::BTreeSet;

use pgshard_core::ShardError;
use pgshard_db::{MetaData, SchemaSnapshot};

use crate::filter::{ObjectDescriptor, ObjectFilter};
use crate::operations::{MigrateOp, OperationList};

/// The operations proposed by a diff engine for one revision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffResult {
    /// Operations bringing the database up to the model.
    pub upgrade: OperationList,
    /// Operations reverting `upgrade`.
    pub downgrade: OperationList,
}

impl DiffResult {
    /// Returns `true` if no changes were detected.
    pub fn is_empty(&self) -> bool {
        self.upgrade.is_empty() && self.downgrade.is_empty()
    }
}

/// A structural comparison between declared and live schema.
pub trait DiffEngine: Send + Sync {
    /// Proposes operations turning `current` into `metadata`.
    ///
    /// Objects for which `filter` returns `false` must not appear in the
    /// result.
    fn compare(
        &self,
        metadata: &MetaData,
        current: &SchemaSnapshot,
        filter: &dyn ObjectFilter,
    ) -> Result<DiffResult, ShardError>;
}

/// Compares tables, named indexes, and named foreign keys.
///
/// New tables come first in declaration order, each followed by its indexes.
/// Foreign keys follow once every table exists. Removals come last:
/// foreign keys, then indexes, then tables. The downgrade list reverts the
/// upgrade in reverse order; removed objects cannot be rebuilt from a
/// snapshot, so their downgrade is an advisory comment.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataAutodetector;

impl MetadataAutodetector {
    /// Creates an autodetector.
    pub const fn new() -> Self {
        Self
    }
}

type Step = (MigrateOp, Vec<MigrateOp>);

fn restore_advisory(kind: &str, name: &str) -> MigrateOp {
    MigrateOp::execute_sql(format!("-- Dropped {kind} {name} must be restored manually"))
}

impl DiffEngine for MetadataAutodetector {
    fn compare(
        &self,
        metadata: &MetaData,
        current: &SchemaSnapshot,
        filter: &dyn ObjectFilter,
    ) -> Result<DiffResult, ShardError> {
        let mut steps: Vec<Step> = Vec::new();
        let mut fk_steps: Vec<Step> = Vec::new();
        let mut declared_indexes = BTreeSet::new();
        let mut declared_fks = BTreeSet::new();

        for table in &metadata.tables {
            for index in &table.indexes {
                declared_indexes.insert(index.resolved_name(&table.name));
            }
            for fk in &table.foreign_keys {
                declared_fks.insert((table.name.clone(), fk.resolved_name(&table.name)));
            }

            if !filter.include(&ObjectDescriptor::table(&table.name, false)) {
                continue;
            }
            let is_new = !current.has_table(&table.name);
            if is_new {
                steps.push((
                    MigrateOp::CreateTable {
                        table: table.clone(),
                    },
                    vec![MigrateOp::DropTable {
                        table_name: table.name.clone(),
                    }],
                ));
            }

            for index in &table.indexes {
                let name = index.resolved_name(&table.name);
                if !filter.include(&ObjectDescriptor::index(&name, false)) {
                    continue;
                }
                if is_new || !current.has_index(&name) {
                    // A new table's indexes go away with the table.
                    let inverse = if is_new {
                        Vec::new()
                    } else {
                        vec![MigrateOp::DropIndex { index_name: name }]
                    };
                    steps.push((
                        MigrateOp::CreateIndex {
                            table_name: table.name.clone(),
                            index: index.clone(),
                        },
                        inverse,
                    ));
                }
            }

            for fk in &table.foreign_keys {
                let name = fk.resolved_name(&table.name);
                let descriptor =
                    ObjectDescriptor::foreign_key(Some(&name), &fk.referred_table, false);
                if !filter.include(&descriptor) {
                    continue;
                }
                if is_new || !current.has_foreign_key(&table.name, &name) {
                    fk_steps.push((
                        MigrateOp::AddForeignKey {
                            table_name: table.name.clone(),
                            fk: fk.clone(),
                        },
                        vec![MigrateOp::DropForeignKey {
                            table_name: table.name.clone(),
                            fk_name: name,
                        }],
                    ));
                }
            }
        }
        steps.append(&mut fk_steps);

        for fk in &current.foreign_keys {
            let key = (fk.table_name.clone(), fk.name.clone());
            let descriptor =
                ObjectDescriptor::foreign_key(Some(&fk.name), &fk.referred_table, true);
            if metadata.contains_table(&fk.table_name)
                && !declared_fks.contains(&key)
                && filter.include(&descriptor)
            {
                steps.push((
                    MigrateOp::DropForeignKey {
                        table_name: fk.table_name.clone(),
                        fk_name: fk.name.clone(),
                    },
                    vec![restore_advisory("foreign key", &fk.name)],
                ));
            }
        }

        for index in &current.indexes {
            if metadata.contains_table(&index.table_name)
                && !declared_indexes.contains(&index.name)
                && filter.include(&ObjectDescriptor::index(&index.name, true))
            {
                steps.push((
                    MigrateOp::DropIndex {
                        index_name: index.name.clone(),
                    },
                    vec![restore_advisory("index", &index.name)],
                ));
            }
        }

        for table_name in &current.tables {
            if !metadata.contains_table(table_name)
                && filter.include(&ObjectDescriptor::table(table_name, true))
            {
                steps.push((
                    MigrateOp::DropTable {
                        table_name: table_name.clone(),
                    },
                    vec![restore_advisory("table", table_name)],
                ));
            }
        }

        let downgrade: OperationList = steps
            .iter()
            .rev()
            .flat_map(|(_, inverse)| inverse.iter().cloned())
            .collect();
        let upgrade: OperationList = steps.into_iter().map(|(op, _)| op).collect();

        tracing::debug!(
            upgrade = upgrade.len(),
            downgrade = downgrade.len(),
            "Compared metadata against live schema"
        );
        Ok(DiffResult { upgrade, downgrade })
    }
}
