//! The `check` command.
//!
//! Validates every partition declaration and enum type in the model, and the
//! partition settings around them, without generating anything.

use async_trait::async_trait;
use pgshard_core::{PartitionSettings, Settings, ShardError};
use pgshard_db::MetaData;
use pgshard_migrations::partition::NamingPattern;
use pgshard_migrations::MetadataScanner;

use super::load_metadata;
use crate::command::ManagementCommand;

/// Validates the partition setup.
pub struct CheckCommand;

/// The result of a single check.
#[derive(Debug, Clone)]
pub struct CheckMessage {
    pub level: CheckLevel,
    pub msg: String,
    pub hint: Option<String>,
    /// A stable identifier, e.g. "partitions.E001".
    pub id: String,
}

/// Severity levels for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckLevel {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

fn message(level: CheckLevel, id: &str, msg: String, hint: Option<&str>) -> CheckMessage {
    CheckMessage {
        level,
        msg,
        hint: hint.map(str::to_string),
        id: id.to_string(),
    }
}

/// Runs all checks against `metadata`.
///
/// Every invalid table is reported, regardless of
/// `validate_partition_keys`.
pub fn run_checks(settings: &Settings, metadata: &MetaData) -> Vec<CheckMessage> {
    let mut messages = Vec::new();
    let partitions = &settings.partitions;

    if partitions.default_partition_count == 0 {
        messages.push(message(
            CheckLevel::Error,
            "settings.E001",
            "default_partition_count must be at least 1".to_string(),
            None,
        ));
    }
    if let Err(e) = NamingPattern::new(partitions.default_naming_pattern.clone()) {
        messages.push(message(
            CheckLevel::Error,
            "settings.E002",
            e.to_string(),
            Some("Use a pattern such as '{table}_p{number}'"),
        ));
    }

    // Collect every problem instead of stopping at the first one.
    let lenient = PartitionSettings {
        validate_partition_keys: false,
        ..partitions.clone()
    };
    match MetadataScanner::new(&lenient).scan_partitions(metadata) {
        Ok((configs, skipped)) => {
            for table in skipped {
                messages.push(message(
                    CheckLevel::Error,
                    "partitions.E001",
                    format!("Invalid partition declaration on '{}': {}", table.table_name, table.reason),
                    None,
                ));
            }
            for config in configs.values() {
                if config.count_diverges_from(partitions.default_partition_count) {
                    messages.push(message(
                        CheckLevel::Info,
                        "partitions.I001",
                        format!(
                            "Table '{}' has {} partitions; the default is {}",
                            config.table_name(),
                            config.shard_count(),
                            partitions.default_partition_count
                        ),
                        None,
                    ));
                }
            }
            for table_name in partitions.tables.keys() {
                if !configs.contains_key(table_name) {
                    messages.push(message(
                        CheckLevel::Warning,
                        "partitions.W001",
                        format!("Override for '{table_name}' matches no partitioned table"),
                        Some("Remove the override or declare the table as partitioned"),
                    ));
                }
            }
        }
        Err(e) => messages.push(message(CheckLevel::Error, "partitions.E001", e.to_string(), None)),
    }

    if let Err(e) = MetadataScanner::scan_enums(metadata) {
        messages.push(message(CheckLevel::Error, "enums.E001", e.to_string(), None));
    }

    messages
}

#[async_trait]
impl ManagementCommand for CheckCommand {
    fn name(&self) -> &'static str {
        "check"
    }

    fn help(&self) -> &'static str {
        "Validate partition declarations without generating anything"
    }

    async fn handle(
        &self,
        _matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), ShardError> {
        let metadata = load_metadata(settings)?;
        let messages = run_checks(settings, &metadata);

        if messages.is_empty() {
            println!("Check identified no issues");
            return Ok(());
        }

        let errors = messages.iter().filter(|m| m.level >= CheckLevel::Error).count();
        for msg in &messages {
            let hint_text = msg
                .hint
                .as_ref()
                .map_or(String::new(), |h| format!("\n\tHINT: {h}"));
            println!("{} ({}): {}{}", msg.level, msg.id, msg.msg, hint_text);
        }
        println!("Check identified {} issue(s) ({errors} error(s))", messages.len());

        if errors > 0 {
            return Err(ShardError::ConfigurationError(format!(
                "Check found {errors} error(s)"
            )));
        }
        Ok(())
    }
}
