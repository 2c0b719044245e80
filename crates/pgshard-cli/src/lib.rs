//! # pgshard-cli
//!
//! The `pgshard` command-line interface.
//!
//! - **Command framework** - [`ManagementCommand`] and [`CommandRegistry`]
//! - **Built-in commands** - `makemigrations`, `showpartitions`, `check`
//!
//! ## Quick Start
//!
//! ```rust
//! use pgshard_cli::command::CommandRegistry;
//! use pgshard_cli::commands::register_builtin_commands;
//!
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//!
//! let names = registry.list_commands();
//! assert_eq!(names, vec!["check", "makemigrations", "showpartitions"]);
//! ```

// These clippy lints are intentionally allowed:
// - result_large_err: ShardError is the workspace-wide error type
// - doc_markdown: backtick requirements for documentation items are too strict
// - missing_const_for_fn: some functions may gain runtime logic later
// - module_name_repetitions: re-exports make module-prefixed names redundant
// - print_stdout: commands write their reports to stdout
#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::print_stdout)]

pub mod command;
pub mod commands;

// Re-export primary types at the crate root for convenience.
pub use command::{load_settings, CommandRegistry, ManagementCommand};
