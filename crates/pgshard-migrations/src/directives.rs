//! Splicing shard and enum DDL into diff engine output.
//!
//! The [`MigrationDirectiveProcessor`] runs once per generation. It numbers
//! the revision, then rewrites each directive's operation lists:
//!
//! 1. shard creation follows every `CreateTable` of a partitioned table;
//! 2. enum upgrade statements go to the front of the upgrade list;
//! 3. shard drops precede every `DropTable` of a partitioned table;
//! 4. enum downgrade statements go to the end of the downgrade list.
//!
//! All directives are rewritten on copies and committed only once every
//! step has succeeded.

use std::collections::BTreeMap;
use std::path::PathBuf;

use pgshard_core::logging::revision_span;
use pgshard_core::{PartitionSettings, Settings, ShardError};
use pgshard_db::{LiveEnumSnapshot, MetaData};

use crate::autodetect::DiffResult;
use crate::enums::EnumSynchronizer;
use crate::manager::PartitionManager;
use crate::operations::{MigrateOp, OperationList};
use crate::partition::PartitionConfig;
use crate::partition_sql::partition_comment;
use crate::scanner::{MetadataScanner, SkippedTable};
use crate::sequence::{next_sequence_number_or_first, revision_id, SequenceNumber};

/// One revision as proposed by the diff engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevisionDirective {
    /// The engine's slug; becomes `NNNN_<slug>` after processing.
    pub rev_id: String,
    /// Free-form description carried into the revision.
    pub message: Option<String>,
    /// Operations applied on upgrade, in order.
    pub upgrade_ops: OperationList,
    /// Operations applied on downgrade, in order.
    pub downgrade_ops: OperationList,
}

impl RevisionDirective {
    /// Wraps a diff result under the given slug.
    pub fn new(rev_id: impl Into<String>, diff: DiffResult) -> Self {
        Self {
            rev_id: rev_id.into(),
            message: None,
            upgrade_ops: diff.upgrade,
            downgrade_ops: diff.downgrade,
        }
    }

    /// Attaches a message.
    pub fn with_message(mut self, message: Option<&str>) -> Self {
        self.message = message.map(str::to_string);
        self
    }
}

/// What a processing run found and did.
#[derive(Debug, Clone, Default)]
pub struct ProcessReport {
    /// The number prefixed to every directive's id.
    pub sequence_number: SequenceNumber,
    /// Partitioned tables, keyed by name.
    pub partitions: BTreeMap<String, PartitionConfig>,
    /// Tables left unpartitioned because their declaration was invalid.
    pub skipped: Vec<SkippedTable>,
    /// Enum statements added to each directive's upgrade list.
    pub enum_statements: usize,
}

/// Rewrites diff engine output into a partition-aware revision.
#[derive(Debug, Clone)]
pub struct MigrationDirectiveProcessor {
    manager: PartitionManager,
    versions_dir: PathBuf,
}

impl MigrationDirectiveProcessor {
    /// Creates a processor from the full settings.
    pub fn new(settings: &Settings) -> Self {
        Self::with_versions_dir(settings.partitions.clone(), settings.versions_dir())
    }

    /// Creates a processor numbering revisions from `versions_dir`.
    pub fn with_versions_dir(partitions: PartitionSettings, versions_dir: impl Into<PathBuf>) -> Self {
        Self {
            manager: PartitionManager::new(partitions),
            versions_dir: versions_dir.into(),
        }
    }

    /// Processes every directive in place.
    ///
    /// `live_enums` is the database's current enum state, or `None` when
    /// offline. An unreadable versions directory falls back to `0001`; an
    /// out-of-range revision prefix is an error.
    ///
    /// # Errors
    ///
    /// Returns a configuration or generation error; the directives are then
    /// left untouched.
    pub fn process(
        &mut self,
        directives: &mut [RevisionDirective],
        metadata: &MetaData,
        live_enums: Option<&LiveEnumSnapshot>,
    ) -> Result<ProcessReport, ShardError> {
        let sequence = next_sequence_number_or_first(&self.versions_dir)?;

        self.manager.analyze_metadata(metadata)?;
        let enums = MetadataScanner::scan_enums(metadata)?;
        let enum_ops = EnumSynchronizer::synchronize(&enums, live_enums);
        let auto_generate = self.manager.settings().auto_generate_enabled;

        let mut rewritten = Vec::with_capacity(directives.len());
        for directive in directives.iter() {
            let id = revision_id(sequence, &directive.rev_id);
            let _guard = revision_span(&id).entered();

            let mut upgrade = directive.upgrade_ops.clone();
            let mut downgrade = directive.downgrade_ops.clone();
            if auto_generate {
                self.add_shard_creation(&mut upgrade)?;
            }
            upgrade.prepend_all(enum_ops.upgrade.iter().map(MigrateOp::execute_sql));
            if auto_generate {
                self.add_shard_drops(&mut downgrade)?;
            }
            downgrade.append_all(enum_ops.downgrade.iter().map(MigrateOp::execute_sql));

            tracing::debug!(
                upgrade = upgrade.len(),
                downgrade = downgrade.len(),
                "Processed revision directive"
            );
            rewritten.push((id, upgrade, downgrade));
        }

        for (directive, (id, upgrade, downgrade)) in directives.iter_mut().zip(rewritten) {
            directive.rev_id = id;
            directive.upgrade_ops = upgrade;
            directive.downgrade_ops = downgrade;
        }

        Ok(ProcessReport {
            sequence_number: sequence,
            partitions: self.manager.partitioned_tables().clone(),
            skipped: self.manager.skipped_tables().to_vec(),
            enum_statements: enum_ops.upgrade.len(),
        })
    }

    fn partitioned_config(&self, table_name: Option<&str>) -> Option<&PartitionConfig> {
        table_name.and_then(|name| self.manager.config(name))
    }

    fn add_shard_creation(&self, upgrade: &mut OperationList) -> Result<(), ShardError> {
        let positions =
            upgrade.positions(|op| self.partitioned_config(op.created_table()).is_some());
        // Back to front, so earlier positions stay valid.
        for position in positions.into_iter().rev() {
            let created = upgrade.get(position).and_then(MigrateOp::created_table);
            let Some(config) = self.partitioned_config(created) else {
                continue;
            };
            let mut ops = vec![MigrateOp::execute_sql(partition_comment(config.table_name()))];
            ops.extend(
                self.manager
                    .creation_sql(config)?
                    .into_iter()
                    .map(MigrateOp::execute_sql),
            );
            upgrade.insert_after(position, ops)?;
        }
        Ok(())
    }

    fn add_shard_drops(&self, downgrade: &mut OperationList) -> Result<(), ShardError> {
        let positions =
            downgrade.positions(|op| self.partitioned_config(op.dropped_table()).is_some());
        for position in positions.into_iter().rev() {
            let dropped = downgrade.get(position).and_then(MigrateOp::dropped_table);
            let Some(config) = self.partitioned_config(dropped) else {
                continue;
            };
            let ops = self
                .manager
                .drop_sql(config)
                .into_iter()
                .map(MigrateOp::execute_sql);
            downgrade.insert_before(position, ops)?;
        }
        Ok(())
    }
}
