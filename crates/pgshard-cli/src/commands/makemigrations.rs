//! The `makemigrations` command.
//!
//! Diffs the metadata model against the database, adds shard and enum DDL,
//! and writes the result as a new revision.

use std::path::PathBuf;

use async_trait::async_trait;
use pgshard_core::{Settings, ShardError};
use pgshard_migrations::{RevisionGenerator, RevisionWriter};

use super::{connect, load_metadata};
use crate::command::ManagementCommand;

/// Generates a new revision.
pub struct MakemigrationsCommand;

/// Options for one `makemigrations` run.
#[derive(Debug, Clone, Default)]
pub struct MakemigrationsOptions {
    /// Revision message; its slug becomes the revision id suffix.
    pub message: Option<String>,
    /// Print the SQL instead of writing files.
    pub dry_run: bool,
    /// Skip the database even if one is configured.
    pub offline: bool,
}

/// What a `makemigrations` run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MakemigrationsOutcome {
    /// The model matches the database.
    NoChanges,
    /// The SQL script that would have been written.
    DryRun(String),
    /// The files written.
    Written(Vec<PathBuf>),
}

/// Runs `makemigrations` without printing.
///
/// # Errors
///
/// Returns any loading, generation, or write error.
pub async fn run(
    settings: &Settings,
    options: &MakemigrationsOptions,
) -> Result<MakemigrationsOutcome, ShardError> {
    let metadata = load_metadata(settings)?;
    let introspector = if options.offline {
        None
    } else {
        connect(settings)?
    };
    if introspector.is_none() {
        tracing::info!("Running offline: the database is assumed empty");
    }

    let generator = RevisionGenerator::new(settings.clone());
    let (revision, report) = generator
        .generate(&metadata, introspector.as_deref(), options.message.as_deref())
        .await?;

    for skipped in &report.skipped {
        tracing::warn!(table = %skipped.table_name, reason = %skipped.reason, "Table was not partitioned");
    }

    if revision.is_empty() {
        return Ok(MakemigrationsOutcome::NoChanges);
    }
    if options.dry_run {
        return Ok(MakemigrationsOutcome::DryRun(revision.to_sql_script()));
    }

    let paths = RevisionWriter::new(settings.versions_dir()).write(&revision)?;
    Ok(MakemigrationsOutcome::Written(paths))
}

#[async_trait]
impl ManagementCommand for MakemigrationsCommand {
    fn name(&self) -> &'static str {
        "makemigrations"
    }

    fn help(&self) -> &'static str {
        "Generate a new partition-aware revision"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("message")
                .short('m')
                .long("message")
                .help("Revision message, also used for the revision id"),
        )
        .arg(
            clap::Arg::new("dry-run")
                .long("dry-run")
                .action(clap::ArgAction::SetTrue)
                .help("Print the SQL without writing any files"),
        )
        .arg(
            clap::Arg::new("offline")
                .long("offline")
                .action(clap::ArgAction::SetTrue)
                .help("Do not connect to the database"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), ShardError> {
        let options = MakemigrationsOptions {
            message: matches.get_one::<String>("message").cloned(),
            dry_run: matches.get_flag("dry-run"),
            offline: matches.get_flag("offline"),
        };

        match run(settings, &options).await? {
            MakemigrationsOutcome::NoChanges => println!("No changes detected"),
            MakemigrationsOutcome::DryRun(script) => print!("{script}"),
            MakemigrationsOutcome::Written(paths) => {
                for path in paths {
                    println!("Created {}", path.display());
                }
            }
        }
        Ok(())
    }
}
