//! Command framework for the `pgshard` CLI.
//!
//! Each subcommand implements [`ManagementCommand`] and is registered in a
//! [`CommandRegistry`], which builds the clap parser and dispatches to the
//! matching handler.
//!
//! ## Adding a command
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use pgshard_cli::command::{CommandRegistry, ManagementCommand};
//! use pgshard_core::{Settings, ShardError};
//!
//! struct VersionCommand;
//!
//! #[async_trait]
//! impl ManagementCommand for VersionCommand {
//!     fn name(&self) -> &'static str { "version" }
//!     fn help(&self) -> &'static str { "Print the pgshard version" }
//!
//!     async fn handle(
//!         &self,
//!         _matches: &clap::ArgMatches,
//!         _settings: &Settings,
//!     ) -> Result<(), ShardError> {
//!         println!("pgshard {}", env!("CARGO_PKG_VERSION"));
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = CommandRegistry::new();
//! registry.register(Box::new(VersionCommand));
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pgshard_core::{settings_loader, Settings, ShardError};

/// Settings file picked up from the working directory when `--settings` is
/// not given.
pub const DEFAULT_SETTINGS_FILE: &str = "pgshard.toml";

/// A subcommand of the `pgshard` CLI.
#[async_trait]
pub trait ManagementCommand: Send + Sync {
    /// The subcommand name.
    fn name(&self) -> &'static str;

    /// One line shown in `--help`.
    fn help(&self) -> &'static str;

    /// Adds arguments to the clap command. The default adds none.
    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd
    }

    /// Runs the command.
    async fn handle(&self, matches: &clap::ArgMatches, settings: &Settings)
        -> Result<(), ShardError>;
}

/// The registered subcommands, ordered by name.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Box<dyn ManagementCommand>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command, replacing any command with the same name.
    pub fn register(&mut self, command: Box<dyn ManagementCommand>) {
        self.commands.insert(command.name(), command);
    }

    pub fn get(&self, name: &str) -> Option<&dyn ManagementCommand> {
        self.commands.get(name).map(AsRef::as_ref)
    }

    /// Returns the registered command names, sorted.
    pub fn list_commands(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Builds the `pgshard` parser with one subcommand per entry.
    ///
    /// A global `--settings PATH` option is available to every subcommand.
    pub fn build_cli(&self) -> clap::Command {
        let app = clap::Command::new("pgshard")
            .about("Partition-aware migration generator for PostgreSQL")
            .subcommand_required(true)
            .arg(
                clap::Arg::new("settings")
                    .long("settings")
                    .global(true)
                    .value_parser(clap::value_parser!(PathBuf))
                    .help("Path to a TOML or JSON settings file"),
            );

        self.commands.iter().fold(app, |app, (name, command)| {
            app.subcommand(command.add_arguments(clap::Command::new(*name).about(command.help())))
        })
    }

    /// Dispatches to the subcommand named in `matches`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no or an unknown subcommand was
    /// given, or whatever the command returns.
    pub async fn execute(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), ShardError> {
        let Some((name, sub_matches)) = matches.subcommand() else {
            return Err(ShardError::ConfigurationError("No subcommand specified".to_string()));
        };
        let command = self
            .get(name)
            .ok_or_else(|| ShardError::ConfigurationError(format!("Unknown command: {name}")))?;

        tracing::debug!(command = name, "Running command");
        command.handle(sub_matches, settings).await
    }
}

/// Loads the settings for one invocation.
///
/// An explicit path wins; otherwise `pgshard.toml` in the working directory
/// is used if present; otherwise defaults. Environment overrides apply in
/// every case.
///
/// # Errors
///
/// Returns an error if the chosen file cannot be read or parsed.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ShardError> {
    if let Some(path) = path {
        return settings_loader::from_file_with_env(path);
    }
    let default_path = Path::new(DEFAULT_SETTINGS_FILE);
    if default_path.is_file() {
        return settings_loader::from_file_with_env(default_path);
    }
    Ok(settings_loader::from_env())
}
