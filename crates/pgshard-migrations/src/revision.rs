//! Generated revisions and their on-disk form.
//!
//! A revision is persisted as two files sharing the revision id as stem:
//! `<id>.json` holds the structured record and `<id>.sql` the runnable
//! script with `-- upgrade` and `-- downgrade` sections.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pgshard_core::ShardError;
use serde::{Deserialize, Serialize};

use crate::sequence::SequenceNumber;

/// One generated migration unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRevision {
    /// `NNNN_<slug>`.
    pub revision_id: String,
    /// Serialized as the padded prefix, e.g. `"0002"`.
    pub sequence_number: SequenceNumber,
    /// The `-m` message, if one was given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the revision was generated (UTC).
    pub created_at: DateTime<Utc>,
    /// Rendered statements, run in order.
    pub upgrade_ops: Vec<String>,
    /// Rendered statements undoing `upgrade_ops`. Comment lines are advisory.
    pub downgrade_ops: Vec<String>,
}

impl MigrationRevision {
    /// Creates a revision stamped with the current time.
    pub fn new(
        revision_id: impl Into<String>,
        sequence_number: SequenceNumber,
        message: Option<String>,
        upgrade_ops: Vec<String>,
        downgrade_ops: Vec<String>,
    ) -> Self {
        Self {
            revision_id: revision_id.into(),
            sequence_number,
            message,
            created_at: Utc::now(),
            upgrade_ops,
            downgrade_ops,
        }
    }

    /// Returns `true` if the revision carries no statements at all.
    pub fn is_empty(&self) -> bool {
        self.upgrade_ops.is_empty() && self.downgrade_ops.is_empty()
    }

    /// Serializes the revision to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if encoding fails.
    pub fn to_json(&self) -> Result<String, ShardError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ShardError::SerializationError(format!("Failed to serialize revision: {e}")))
    }

    /// Deserializes a revision from JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the JSON is not a revision.
    pub fn from_json(json: &str) -> Result<Self, ShardError> {
        serde_json::from_str(json)
            .map_err(|e| ShardError::SerializationError(format!("Failed to parse revision: {e}")))
    }

    /// Renders the revision as a SQL script.
    ///
    /// Comment lines are written as-is; every other statement is terminated
    /// with `;`.
    pub fn to_sql_script(&self) -> String {
        let mut script = format!("-- Revision: {}\n", self.revision_id);
        if let Some(message) = &self.message {
            script.push_str(&format!("-- Message: {message}\n"));
        }
        script.push_str(&format!("-- Created: {}\n", self.created_at.to_rfc3339()));

        script.push_str("\n-- upgrade\n");
        push_statements(&mut script, &self.upgrade_ops);
        script.push_str("\n-- downgrade\n");
        push_statements(&mut script, &self.downgrade_ops);
        script
    }
}

fn push_statements(script: &mut String, statements: &[String]) {
    for statement in statements {
        let statement = statement.trim_end();
        script.push_str(statement);
        if !statement.starts_with("--") && !statement.ends_with(';') {
            script.push(';');
        }
        script.push('\n');
    }
}

/// Writes revisions into a versions directory.
#[derive(Debug, Clone)]
pub struct RevisionWriter {
    versions_dir: PathBuf,
}

impl RevisionWriter {
    /// Creates a writer targeting `versions_dir`.
    pub fn new(versions_dir: impl Into<PathBuf>) -> Self {
        Self {
            versions_dir: versions_dir.into(),
        }
    }

    /// The target directory.
    pub fn versions_dir(&self) -> &Path {
        &self.versions_dir
    }

    /// Path of the JSON record for `revision_id`.
    pub fn json_path(&self, revision_id: &str) -> PathBuf {
        self.versions_dir.join(format!("{revision_id}.json"))
    }

    /// Path of the SQL script for `revision_id`.
    pub fn sql_path(&self, revision_id: &str) -> PathBuf {
        self.versions_dir.join(format!("{revision_id}.sql"))
    }

    /// Writes both files of `revision` and returns their paths.
    ///
    /// The directory is created if needed. Existing files are never
    /// overwritten, and if the second file cannot be written the first is
    /// removed again.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::Conflict`] if either file already exists, or an
    /// IO/serialization error.
    pub fn write(&self, revision: &MigrationRevision) -> Result<Vec<PathBuf>, ShardError> {
        let json_path = self.json_path(&revision.revision_id);
        let sql_path = self.sql_path(&revision.revision_id);
        for path in [&json_path, &sql_path] {
            if path.exists() {
                return Err(ShardError::Conflict(format!(
                    "Revision file already exists: {}",
                    path.display()
                )));
            }
        }

        let json = revision.to_json()?;
        let script = revision.to_sql_script();

        std::fs::create_dir_all(&self.versions_dir)?;
        write_new(&json_path, &json)?;
        if let Err(e) = write_new(&sql_path, &script) {
            let _ = std::fs::remove_file(&json_path);
            return Err(e);
        }

        tracing::info!(
            revision = %revision.revision_id,
            dir = %self.versions_dir.display(),
            "Wrote revision"
        );
        Ok(vec![json_path, sql_path])
    }

    /// Reads a revision back from its JSON record.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, or a serialization
    /// error if it is not a revision.
    pub fn read(path: &Path) -> Result<MigrationRevision, ShardError> {
        let content = std::fs::read_to_string(path)?;
        MigrationRevision::from_json(&content)
    }
}

fn write_new(path: &Path, content: &str) -> Result<(), ShardError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                ShardError::Conflict(format!("Revision file already exists: {}", path.display()))
            } else {
                ShardError::IoError(e)
            }
        })?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revision() -> MigrationRevision {
        MigrationRevision::new(
            "0002_add_orders",
            SequenceNumber::new(2),
            Some("add orders".into()),
            vec![
                "CREATE TABLE orders (id BIGINT NOT NULL)".into(),
                "-- Auto-generated partitions for orders".into(),
            ],
            vec!["DROP TABLE IF EXISTS orders".into()],
        )
    }

    // ── Formats ─────────────────────────────────────────────────────

    #[test]
    fn test_json_shape() {
        let rev = revision();
        let json = rev.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["revision_id"], "0002_add_orders");
        assert_eq!(value["sequence_number"], "0002");
        assert_eq!(value["upgrade_ops"].as_array().unwrap().len(), 2);

        let back = MigrationRevision::from_json(&json).unwrap();
        assert_eq!(back.created_at, rev.created_at);
        assert_eq!(back, rev);
    }

    #[test]
    fn test_message_is_optional() {
        let mut rev = revision();
        rev.message = None;
        let json = rev.to_json().unwrap();
        assert!(!json.contains("\"message\""));
        assert_eq!(MigrationRevision::from_json(&json).unwrap().message, None);
    }

    #[test]
    fn test_sql_script_sections() {
        let script = revision().to_sql_script();
        assert!(script.starts_with("-- Revision: 0002_add_orders\n-- Message: add orders\n"));
        let upgrade = script.find("\n-- upgrade\n").unwrap();
        let downgrade = script.find("\n-- downgrade\n").unwrap();
        assert!(upgrade < downgrade);
        assert!(script.contains("CREATE TABLE orders (id BIGINT NOT NULL);\n"));
        assert!(script.contains("\n-- Auto-generated partitions for orders\n"));
        assert!(script.ends_with("DROP TABLE IF EXISTS orders;\n"));
    }

    #[test]
    fn test_bad_json_is_serialization_error() {
        let err = MigrationRevision::from_json("{").unwrap_err();
        assert!(matches!(err, ShardError::SerializationError(_)));
    }

    // ── RevisionWriter ──────────────────────────────────────────────

    #[test]
    fn test_write_creates_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RevisionWriter::new(dir.path().join("versions"));
        let rev = revision();
        let paths = writer.write(&rev).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.exists()));

        let back = RevisionWriter::read(&writer.json_path("0002_add_orders")).unwrap();
        assert_eq!(back, rev);
    }

    #[test]
    fn test_write_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RevisionWriter::new(dir.path());
        std::fs::write(writer.sql_path("0002_add_orders"), "keep").unwrap();

        let err = writer.write(&revision()).unwrap_err();
        assert!(matches!(err, ShardError::Conflict(_)));
        assert!(!writer.json_path("0002_add_orders").exists());
        assert_eq!(
            std::fs::read_to_string(writer.sql_path("0002_add_orders")).unwrap(),
            "keep"
        );
    }
}
