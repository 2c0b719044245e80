//! Shard DDL generation.
//!
//! Both functions are pure. Creation and drop statements derive their shard
//! names from the same [`PartitionConfig::partition_name`], so the two sets
//! are always name-identical.

use pgshard_core::ShardError;

use crate::partition::{ListEntry, PartitionConfig, PartitionSpec, RangeBound};

/// Returns the comment statement placed ahead of a table's shard DDL.
pub fn partition_comment(table_name: &str) -> String {
    format!("-- Auto-generated partitions for {table_name}")
}

/// Generates one `CREATE TABLE ... PARTITION OF` statement per shard.
///
/// HASH shard `i` gets `MODULUS n, REMAINDER i`; RANGE shards follow the
/// bounds in order; LIST shards follow the entries in order, a grouped entry
/// becoming a multi-value `IN (...)`. Bound coverage is not validated.
///
/// # Errors
///
/// Returns a generation error if a value cannot be rendered as a literal or
/// the configuration produces no shards.
pub fn generate_creation_sql(config: &PartitionConfig) -> Result<Vec<String>, ShardError> {
    let table = config.table_name();
    let statements = match config.spec() {
        PartitionSpec::Hash { partition_count } => (0..*partition_count)
            .map(|i| {
                format!(
                    "CREATE TABLE {} PARTITION OF {table} FOR VALUES WITH (MODULUS {partition_count}, REMAINDER {i})",
                    config.partition_name(i as usize)
                )
            })
            .collect(),
        PartitionSpec::Range { bounds } => bounds
            .iter()
            .enumerate()
            .map(|(i, bound)| range_statement(config, i, bound))
            .collect::<Result<Vec<_>, _>>()?,
        PartitionSpec::List { values } => values
            .iter()
            .enumerate()
            .map(|(i, entry)| list_statement(config, i, entry))
            .collect::<Result<Vec<_>, _>>()?,
    };

    if statements.is_empty() {
        return Err(ShardError::GenerationError(format!(
            "No partitions generated for {table}"
        )));
    }
    Ok(statements)
}

/// Generates one `DROP TABLE IF EXISTS` statement per shard, in shard order.
pub fn generate_drop_sql(config: &PartitionConfig) -> Vec<String> {
    config
        .partition_names()
        .into_iter()
        .map(|name| format!("DROP TABLE IF EXISTS {name}"))
        .collect()
}

fn range_statement(
    config: &PartitionConfig,
    number: usize,
    bound: &RangeBound,
) -> Result<String, ShardError> {
    Ok(format!(
        "CREATE TABLE {} PARTITION OF {} FOR VALUES FROM ({}) TO ({})",
        config.partition_name(number),
        config.table_name(),
        bound.start.sql_literal()?,
        bound.end.sql_literal()?
    ))
}

fn list_statement(
    config: &PartitionConfig,
    number: usize,
    entry: &ListEntry,
) -> Result<String, ShardError> {
    let literals = entry
        .values()
        .iter()
        .map(crate::partition::PartitionValue::sql_literal)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!(
        "CREATE TABLE {} PARTITION OF {} FOR VALUES IN ({})",
        config.partition_name(number),
        config.table_name(),
        literals.join(", ")
    ))
}
