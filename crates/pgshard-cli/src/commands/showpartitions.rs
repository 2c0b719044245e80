//! The `showpartitions` command.

use std::fmt::Write as _;

use async_trait::async_trait;
use pgshard_core::{Settings, ShardError};
use pgshard_db::MetaData;
use pgshard_migrations::{PartitionInfo, PartitionManager};

use super::load_metadata;
use crate::command::ManagementCommand;

/// Lists partitioned tables and their shards.
pub struct ShowpartitionsCommand;

fn write_info(out: &mut String, info: &PartitionInfo, with_sql: bool) {
    let config = &info.config;
    let _ = writeln!(
        out,
        "{}: {} ({}), {} partition(s)",
        config.table_name(),
        config.strategy(),
        config.column(),
        info.partition_count
    );
    for name in &info.partition_names {
        let _ = writeln!(out, "  {name}");
    }
    if with_sql {
        out.push_str("  -- upgrade\n");
        for statement in &info.upgrade_sql {
            let _ = writeln!(out, "  {statement};");
        }
        out.push_str("  -- downgrade\n");
        for statement in &info.downgrade_sql {
            let _ = writeln!(out, "  {statement};");
        }
    }
}

/// Renders the partition report for `metadata`.
///
/// With `table`, only that table is shown.
///
/// # Errors
///
/// Returns a configuration error for an invalid declaration (when
/// validation is on) or an unknown or unpartitioned `table`.
pub fn describe_partitions(
    settings: &Settings,
    metadata: &MetaData,
    table: Option<&str>,
    with_sql: bool,
) -> Result<String, ShardError> {
    let mut manager = PartitionManager::new(settings.partitions.clone());
    manager.analyze_metadata(metadata)?;

    let mut out = String::new();
    if let Some(table) = table {
        let info = manager.table_partition_info(table)?.ok_or_else(|| {
            ShardError::ConfigurationError(format!("Table '{table}' is not partitioned"))
        })?;
        write_info(&mut out, &info, with_sql);
        return Ok(out);
    }

    if manager.partitioned_tables().is_empty() {
        out.push_str("No partitioned tables\n");
    }
    let names: Vec<String> = manager.partitioned_tables().keys().cloned().collect();
    for name in names {
        if let Some(info) = manager.table_partition_info(&name)? {
            write_info(&mut out, &info, with_sql);
        }
    }
    for skipped in manager.skipped_tables() {
        let _ = writeln!(out, "{}: skipped ({})", skipped.table_name, skipped.reason);
    }
    Ok(out)
}

#[async_trait]
impl ManagementCommand for ShowpartitionsCommand {
    fn name(&self) -> &'static str {
        "showpartitions"
    }

    fn help(&self) -> &'static str {
        "Show partitioned tables and their shards"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("table")
                .help("Only show this table")
                .required(false),
        )
        .arg(
            clap::Arg::new("sql")
                .long("sql")
                .action(clap::ArgAction::SetTrue)
                .help("Also print the shard DDL"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), ShardError> {
        let metadata = load_metadata(settings)?;
        let table = matches.get_one::<String>("table").map(String::as_str);
        let report = describe_partitions(settings, &metadata, table, matches.get_flag("sql"))?;
        print!("{report}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgshard_db::Table;

    fn metadata() -> MetaData {
        MetaData::new()
            .with_table(
                Table::new("orders", vec![])
                    .with_kwarg("postgresql_partition_by", "HASH (customer_id)"),
            )
            .with_table(Table::new("users", vec![]))
    }

    #[test]
    fn test_describe_all() {
        let out = describe_partitions(&Settings::default(), &metadata(), None, false).unwrap();
        assert!(out.starts_with("orders: HASH (customer_id), 4 partition(s)\n  orders_p0\n"));
        assert!(out.contains("  orders_p3\n"));
        assert!(!out.contains("users"));
    }

    #[test]
    fn test_describe_with_sql() {
        let out =
            describe_partitions(&Settings::default(), &metadata(), Some("orders"), true).unwrap();
        assert!(out.contains(
            "  CREATE TABLE orders_p0 PARTITION OF orders FOR VALUES WITH (MODULUS 4, REMAINDER 0);\n"
        ));
        assert!(out.contains("  DROP TABLE IF EXISTS orders_p3;\n"));
    }

    #[test]
    fn test_unpartitioned_table_is_error() {
        let err =
            describe_partitions(&Settings::default(), &metadata(), Some("users"), false).unwrap_err();
        assert!(err.to_string().contains("not partitioned"));
    }

    #[test]
    fn test_no_partitioned_tables() {
        let md = MetaData::new().with_table(Table::new("users", vec![]));
        let out = describe_partitions(&Settings::default(), &md, None, false).unwrap();
        assert_eq!(out, "No partitioned tables\n");
    }
}
