//! Revision sequence numbers and identifiers.
//!
//! Revisions are named `NNNN_<slug>`. The next number is one past the
//! highest prefix found in the versions directory. The directory is read
//! without locking, so two concurrent runs can pick the same number.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use pgshard_core::ShardError;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

static SEQUENCE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4,})_").expect("sequence prefix regex is valid"));

/// File extensions recognized as revision files.
pub const REVISION_EXTENSIONS: &[&str] = &["json", "sql", "py"];

/// A revision sequence number, displayed zero-padded to four digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    /// The number of the first revision.
    pub const FIRST: Self = Self(1);

    /// Wraps a raw number.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw number.
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The following number, or `None` at `u64::MAX`.
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

impl Default for SequenceNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl FromStr for SequenceNumber {
    type Err = ShardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ShardError::SerializationError(format!(
                "Invalid sequence number: '{s}'"
            )));
        }
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| ShardError::SerializationError(format!("Invalid sequence number '{s}': {e}")))
    }
}

// Stored in revision files as the padded string, e.g. "0004".
impl Serialize for SequenceNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SequenceNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Computes the next sequence number from the revisions in `versions_dir`.
///
/// Names starting with `__` are ignored. When some revisions carry a
/// numeric prefix, the result is the highest prefix plus one. When none do
/// but revisions exist, numbering continues after their count. A missing or
/// empty directory yields `0001`.
///
/// # Errors
///
/// Returns an IO error if the directory exists but cannot be read, and a
/// configuration error if a prefix is too large to be followed.
pub fn next_sequence_number(versions_dir: &Path) -> Result<SequenceNumber, ShardError> {
    if !versions_dir.exists() {
        return Ok(SequenceNumber::FIRST);
    }

    let mut stems = BTreeSet::new();
    for entry in std::fs::read_dir(versions_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_revision = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| REVISION_EXTENSIONS.contains(&ext));
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if is_revision && !stem.starts_with("__") {
            stems.insert(stem.to_string());
        }
    }

    let mut highest: Option<SequenceNumber> = None;
    for stem in &stems {
        let Some(caps) = SEQUENCE_PREFIX_RE.captures(stem) else {
            continue;
        };
        let number = caps[1].parse::<SequenceNumber>().map_err(|_| {
            ShardError::ConfigurationError(format!("Revision '{stem}' has an out-of-range sequence prefix"))
        })?;
        highest = highest.max(Some(number));
    }

    let last = highest.unwrap_or(SequenceNumber::new(stems.len() as u64));
    last.next().ok_or_else(|| {
        ShardError::ConfigurationError(format!("Sequence numbers are exhausted after {last}"))
    })
}

/// Like [`next_sequence_number`], but an unreadable directory yields `0001`.
///
/// # Errors
///
/// Returns the configuration errors of [`next_sequence_number`]; guessing
/// past an unparsable prefix could reuse a number.
pub fn next_sequence_number_or_first(versions_dir: &Path) -> Result<SequenceNumber, ShardError> {
    match next_sequence_number(versions_dir) {
        Err(ShardError::IoError(e)) => {
            tracing::warn!(
                dir = %versions_dir.display(),
                error = %e,
                "Could not scan revisions; starting at 0001"
            );
            Ok(SequenceNumber::FIRST)
        }
        other => other,
    }
}

/// Joins a sequence number and a slug into a revision identifier.
pub fn revision_id(sequence: SequenceNumber, slug: &str) -> String {
    format!("{sequence}_{slug}")
}

/// Turns a free-form message into a filename-safe slug.
///
/// Returns `None` if nothing usable remains.
pub fn slugify(message: &str) -> Option<String> {
    let mut slug = String::new();
    for c in message.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
        if slug.len() >= 48 {
            break;
        }
    }
    let slug = slug.trim_end_matches('_').to_string();
    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

/// A timestamp slug such as `auto_20240131_1420`.
pub fn timestamp_slug() -> String {
    let now = chrono::Utc::now();
    format!("auto_{}", now.format("%Y%m%d_%H%M"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "").unwrap();
    }

    // ── SequenceNumber ──────────────────────────────────────────────

    #[test]
    fn test_display_is_zero_padded() {
        assert_eq!(SequenceNumber::new(1).to_string(), "0001");
        assert_eq!(SequenceNumber::new(36).to_string(), "0036");
        assert_eq!(SequenceNumber::new(12345).to_string(), "12345");
        assert_eq!(SequenceNumber::FIRST.next().unwrap().value(), 2);
        assert!(SequenceNumber::new(u64::MAX).next().is_none());
    }

    #[test]
    fn test_parse_and_serde() {
        let seq: SequenceNumber = "0042".parse().unwrap();
        assert_eq!(seq.value(), 42);
        assert!("4a".parse::<SequenceNumber>().is_err());
        assert!("".parse::<SequenceNumber>().is_err());

        let json = serde_json::to_string(&seq).unwrap();
        assert_eq!(json, "\"0042\"");
        let back: SequenceNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seq);
    }

    // ── Directory scanning ──────────────────────────────────────────

    #[test]
    fn test_missing_dir_starts_at_first() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("versions");
        assert_eq!(next_sequence_number(&missing).unwrap(), SequenceNumber::FIRST);
    }

    #[test]
    fn test_empty_dir_starts_at_first() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(next_sequence_number(dir.path()).unwrap().to_string(), "0001");
    }

    #[test]
    fn test_gap_uses_highest() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "0001_x.json");
        touch(dir.path(), "0003_y.json");
        touch(dir.path(), "0003_y.sql");
        assert_eq!(next_sequence_number(dir.path()).unwrap().to_string(), "0004");
    }

    #[test]
    fn test_legacy_files_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "abc123_initial.py");
        touch(dir.path(), "def456_add_users.py");
        touch(dir.path(), "__init__.py");
        touch(dir.path(), "README.md");
        assert_eq!(next_sequence_number(dir.path()).unwrap().to_string(), "0003");
    }

    #[test]
    fn test_companion_files_count_once() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "legacy.json");
        touch(dir.path(), "legacy.sql");
        assert_eq!(next_sequence_number(dir.path()).unwrap().to_string(), "0002");
    }

    #[test]
    fn test_dunder_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "__0009_cache.json");
        touch(dir.path(), "0002_real.json");
        assert_eq!(next_sequence_number(dir.path()).unwrap().to_string(), "0003");
    }

    #[test]
    fn test_unreadable_dir_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_dir");
        touch(dir.path(), "not_a_dir");
        assert!(next_sequence_number(&file).is_err());
        assert_eq!(next_sequence_number_or_first(&file).unwrap(), SequenceNumber::FIRST);
    }

    #[test]
    fn test_wide_prefix_still_increases() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "0007_a.json");
        touch(dir.path(), "99999999999_b.json");
        assert_eq!(next_sequence_number(dir.path()).unwrap().to_string(), "100000000000");
    }

    #[test]
    fn test_out_of_range_prefix_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "0007_a.json");
        touch(dir.path(), "99999999999999999999999_b.json");
        let err = next_sequence_number(dir.path()).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(next_sequence_number_or_first(dir.path()).is_err());

        touch(dir.path(), "18446744073709551615_c.json");
        std::fs::remove_file(dir.path().join("99999999999999999999999_b.json")).unwrap();
        assert!(next_sequence_number(dir.path()).unwrap_err().is_configuration_error());
    }

    // ── Identifiers ─────────────────────────────────────────────────

    #[test]
    fn test_revision_id() {
        assert_eq!(revision_id(SequenceNumber::new(4), "ab12cd"), "0004_ab12cd");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Add orders table!").as_deref(), Some("add_orders_table"));
        assert_eq!(slugify("  --  ").as_deref(), None);
        assert!(slugify(&"x".repeat(100)).unwrap().len() <= 48);
    }

    #[test]
    fn test_timestamp_slug() {
        let slug = timestamp_slug();
        assert!(slug.starts_with("auto_"));
        assert_eq!(slug.len(), "auto_20240131_1420".len());
    }
}
