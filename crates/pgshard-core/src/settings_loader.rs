//! Loading [`Settings`] from TOML or JSON files and the environment.
//!
//! A file only needs the keys it changes: the parsed document is deep-merged
//! over `Settings::default()` before deserializing. Environment variables are
//! applied last.
//!
//! | Env Var | Setting |
//! |---|---|
//! | `PGSHARD_DEBUG` | `debug` |
//! | `PGSHARD_LOG_LEVEL` | `log_level` |
//! | `PGSHARD_SCRIPT_LOCATION` | `script_location` |
//! | `PGSHARD_METADATA_PATH` | `metadata_path` |
//! | `PGSHARD_DB_HOST` | `database.host` |
//! | `PGSHARD_DB_PORT` | `database.port` |
//! | `PGSHARD_DB_NAME` | `database.name` |
//! | `PGSHARD_DB_USER` | `database.user` |
//! | `PGSHARD_DB_PASSWORD` | `database.password` |
//!
//! Any `PGSHARD_DB_*` variable turns the database section on; fields it does
//! not name keep their defaults.
//!
//! ```rust,no_run
//! use pgshard_core::settings_loader;
//!
//! let settings = settings_loader::from_file_with_env("pgshard.toml").unwrap();
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ShardError;
use crate::settings::{DatabaseSettings, Settings};

const DB_VARS: [&str; 5] = [
    "PGSHARD_DB_HOST",
    "PGSHARD_DB_PORT",
    "PGSHARD_DB_NAME",
    "PGSHARD_DB_USER",
    "PGSHARD_DB_PASSWORD",
];

/// A settings file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
}

impl Format {
    /// `.json` files are JSON; everything else is read as TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }

    fn parse(self, source: &str) -> Result<serde_json::Value, ShardError> {
        let parsed = match self {
            Self::Json => serde_json::from_str(source).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str::<toml::Value>(source)
                .map(toml_to_json)
                .map_err(|e| e.to_string()),
        };
        parsed.map_err(|e| ShardError::ConfigurationError(format!("Failed to parse {self}: {e}")))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toml => write!(f, "TOML"),
            Self::Json => write!(f, "JSON"),
        }
    }
}

/// Parses `source` and merges it over the defaults.
///
/// # Errors
///
/// Returns a configuration error if the document is malformed or a key has
/// the wrong type.
pub fn from_str(source: &str, format: Format) -> Result<Settings, ShardError> {
    let document = format.parse(source)?;
    let defaults = serde_json::to_value(Settings::default())
        .map_err(|e| ShardError::SerializationError(format!("Default settings: {e}")))?;
    serde_json::from_value(merge_json(defaults, document))
        .map_err(|e| ShardError::ConfigurationError(format!("Invalid {format} settings: {e}")))
}

/// Parses TOML settings. See [`from_str`].
pub fn from_toml_str(source: &str) -> Result<Settings, ShardError> {
    from_str(source, Format::Toml)
}

/// Parses JSON settings. See [`from_str`].
pub fn from_json_str(source: &str) -> Result<Settings, ShardError> {
    from_str(source, Format::Json)
}

/// Reads a settings file, choosing the format with [`Format::from_path`].
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read or parsed.
pub fn from_file(path: impl AsRef<Path>) -> Result<Settings, ShardError> {
    let path = path.as_ref();
    read_file(path, Format::from_path(path))
}

/// Reads a TOML settings file whatever its extension.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, ShardError> {
    read_file(path.as_ref(), Format::Toml)
}

/// Reads a JSON settings file whatever its extension.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, ShardError> {
    read_file(path.as_ref(), Format::Json)
}

fn read_file(path: &Path, format: Format) -> Result<Settings, ShardError> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        ShardError::ConfigurationError(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })?;
    from_str(&source, format)
}

/// [`from_file`], then [`apply_env_overrides`].
pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Settings, ShardError> {
    let mut settings = from_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults plus environment overrides.
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies the `PGSHARD_*` variables of the process environment.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Applies overrides looked up by variable name.
///
/// An unparsable `PGSHARD_DB_PORT` is ignored.
pub fn apply_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("PGSHARD_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }
    if let Some(val) = lookup("PGSHARD_LOG_LEVEL") {
        settings.log_level = val;
    }
    if let Some(val) = lookup("PGSHARD_SCRIPT_LOCATION") {
        settings.script_location = PathBuf::from(val);
    }
    if let Some(val) = lookup("PGSHARD_METADATA_PATH") {
        settings.metadata_path = Some(PathBuf::from(val));
    }

    let [host, port, name, user, password] = DB_VARS.map(&lookup);
    if [&host, &port, &name, &user, &password].iter().all(|v| v.is_none()) {
        return;
    }
    let db = settings.database.get_or_insert_with(DatabaseSettings::default);
    if let Some(host) = host {
        db.host = host;
    }
    if let Some(port) = port.and_then(|p| p.parse().ok()) {
        db.port = port;
    }
    if let Some(name) = name {
        db.name = name;
    }
    if let Some(user) = user {
        db.user = user;
    }
    if let Some(password) = password {
        db.password = password;
    }
}

/// Converts a TOML document to JSON. Dates and times become their TOML
/// text, e.g. `2024-01-01`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    use serde_json::Value as Json;
    use toml::Value as Toml;

    match value {
        Toml::String(s) => Json::String(s),
        Toml::Integer(i) => Json::from(i),
        Toml::Float(f) => Json::from(f),
        Toml::Boolean(b) => Json::Bool(b),
        Toml::Datetime(dt) => Json::String(dt.to_string()),
        Toml::Array(items) => Json::Array(items.into_iter().map(toml_to_json).collect()),
        Toml::Table(table) => Json::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}

/// Deep-merges `overlay` into `base`; objects merge key by key, anything
/// else is replaced.
fn merge_json(base: serde_json::Value, overlay: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}
