//! Enum type synchronization between the model and the live database.
//!
//! PostgreSQL can add labels to an enum type but cannot remove them. Upgrades
//! therefore add missing labels, while downgrades only emit advisory comments
//! naming the labels that would need manual removal.

use std::collections::{BTreeMap, BTreeSet};

use pgshard_db::LiveEnumSnapshot;
use pgshard_db_backends::SchemaIntrospector;

use crate::scanner::EnumDefinition;

/// Upgrade and downgrade statements produced by enum synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumOps {
    /// Statements run before every other upgrade operation.
    pub upgrade: Vec<String>,
    /// Statements run after every other downgrade operation.
    pub downgrade: Vec<String>,
}

impl EnumOps {
    /// Returns `true` if there is nothing to run in either direction.
    pub fn is_empty(&self) -> bool {
        self.upgrade.is_empty() && self.downgrade.is_empty()
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Renders `CREATE TYPE <name> AS ENUM (...)`.
pub fn create_type_sql(definition: &EnumDefinition) -> String {
    let labels: Vec<String> = definition.values.iter().map(|v| quote(v)).collect();
    format!(
        "CREATE TYPE {} AS ENUM ({})",
        definition.name,
        labels.join(", ")
    )
}

/// Renders `DROP TYPE IF EXISTS <name>`.
pub fn drop_type_sql(name: &str) -> String {
    format!("DROP TYPE IF EXISTS {name}")
}

/// Renders `ALTER TYPE <name> ADD VALUE IF NOT EXISTS '<value>'`.
pub fn add_value_sql(name: &str, value: &str) -> String {
    format!("ALTER TYPE {name} ADD VALUE IF NOT EXISTS {}", quote(value))
}

/// Compares model enum definitions against a live snapshot.
pub struct EnumSynchronizer;

impl EnumSynchronizer {
    /// Produces the enum statements for one revision.
    ///
    /// With no snapshot every model enum is treated as absent and created in
    /// full. With a snapshot, absent types are created and present types get
    /// one `ADD VALUE` per missing label, in sorted order. Labels that exist
    /// only in the database are never touched.
    pub fn synchronize(
        definitions: &BTreeMap<String, EnumDefinition>,
        live: Option<&LiveEnumSnapshot>,
    ) -> EnumOps {
        let mut ops = EnumOps::default();

        for definition in definitions.values() {
            let live_labels = live.and_then(|snapshot| snapshot.labels(&definition.name));
            match live_labels {
                None => {
                    ops.upgrade.push(create_type_sql(definition));
                    ops.downgrade.push(drop_type_sql(&definition.name));
                }
                Some(existing) => {
                    let existing: BTreeSet<&str> = existing.iter().map(String::as_str).collect();
                    let new_values: BTreeSet<&str> = definition
                        .values
                        .iter()
                        .map(String::as_str)
                        .filter(|v| !existing.contains(v))
                        .collect();
                    if new_values.is_empty() {
                        continue;
                    }

                    ops.upgrade
                        .push(format!("-- Add new enum values to {}", definition.name));
                    for value in &new_values {
                        ops.upgrade.push(add_value_sql(&definition.name, value));
                    }

                    ops.downgrade.push(format!(
                        "-- Note: PostgreSQL does not support removing enum values from {}.",
                        definition.name
                    ));
                    ops.downgrade.push(format!(
                        "-- Values requiring manual removal: {}",
                        new_values.into_iter().collect::<Vec<_>>().join(", ")
                    ));
                }
            }
        }

        ops
    }
}

/// Reads the live enum snapshot, degrading to offline on any failure.
///
/// Returns `None` when no introspector is configured or the query fails;
/// the caller then takes the offline branch, which recreates every type.
pub async fn load_enum_snapshot(
    introspector: Option<&dyn SchemaIntrospector>,
) -> Option<LiveEnumSnapshot> {
    let introspector = introspector?;
    match introspector.fetch_enum_snapshot().await {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            tracing::warn!(
                vendor = introspector.vendor(),
                error = %e,
                "Live enum snapshot unavailable; treating every enum type as new"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgshard_db_backends::StaticIntrospector;

    fn definitions(defs: &[(&str, &[&str])]) -> BTreeMap<String, EnumDefinition> {
        defs.iter()
            .map(|(name, values)| ((*name).to_string(), EnumDefinition::new(*name, values.iter().copied())))
            .collect()
    }

    // ── SQL shapes ──────────────────────────────────────────────────

    #[test]
    fn test_create_type_sql() {
        let def = EnumDefinition::new("mood", ["happy", "it's fine"]);
        assert_eq!(create_type_sql(&def), "CREATE TYPE mood AS ENUM ('happy', 'it''s fine')");
        assert_eq!(drop_type_sql("mood"), "DROP TYPE IF EXISTS mood");
        assert_eq!(add_value_sql("mood", "sad"), "ALTER TYPE mood ADD VALUE IF NOT EXISTS 'sad'");
    }

    // ── Offline ─────────────────────────────────────────────────────

    #[test]
    fn test_offline_creates_everything() {
        let defs = definitions(&[("status", &["a", "b"]), ("priority", &["low"])]);
        let ops = EnumSynchronizer::synchronize(&defs, None);
        assert_eq!(
            ops.upgrade,
            vec![
                "CREATE TYPE priority AS ENUM ('low')",
                "CREATE TYPE status AS ENUM ('a', 'b')",
            ]
        );
        assert_eq!(
            ops.downgrade,
            vec!["DROP TYPE IF EXISTS priority", "DROP TYPE IF EXISTS status"]
        );
    }

    // ── Online ──────────────────────────────────────────────────────

    #[test]
    fn test_absent_type_is_created() {
        let defs = definitions(&[("status", &["a"])]);
        let live = LiveEnumSnapshot::new().with_type("other", &["x"]);
        let ops = EnumSynchronizer::synchronize(&defs, Some(&live));
        assert_eq!(ops.upgrade, vec!["CREATE TYPE status AS ENUM ('a')"]);
        assert_eq!(ops.downgrade, vec!["DROP TYPE IF EXISTS status"]);
    }

    #[test]
    fn test_new_values_are_added_with_advisory() {
        let defs = definitions(&[("status", &["A", "B", "C"])]);
        let live = LiveEnumSnapshot::new().with_type("status", &["A", "B"]);
        let ops = EnumSynchronizer::synchronize(&defs, Some(&live));

        assert_eq!(
            ops.upgrade,
            vec![
                "-- Add new enum values to status",
                "ALTER TYPE status ADD VALUE IF NOT EXISTS 'C'",
            ]
        );
        assert_eq!(ops.downgrade.len(), 2);
        assert!(ops.downgrade.iter().all(|s| s.starts_with("--")));
        assert!(ops.downgrade[1].contains('C'));
        assert!(!ops.downgrade.iter().any(|s| s.contains("DROP")));
    }

    #[test]
    fn test_new_values_sorted() {
        let defs = definitions(&[("s", &["a", "z", "m"])]);
        let live = LiveEnumSnapshot::new().with_type("s", &["a"]);
        let ops = EnumSynchronizer::synchronize(&defs, Some(&live));
        assert_eq!(ops.upgrade[1], "ALTER TYPE s ADD VALUE IF NOT EXISTS 'm'");
        assert_eq!(ops.upgrade[2], "ALTER TYPE s ADD VALUE IF NOT EXISTS 'z'");
        assert_eq!(ops.downgrade[1], "-- Values requiring manual removal: m, z");
    }

    #[test]
    fn test_live_only_values_are_left_alone() {
        let defs = definitions(&[("status", &["A"])]);
        let live = LiveEnumSnapshot::new().with_type("status", &["A", "legacy"]);
        let ops = EnumSynchronizer::synchronize(&defs, Some(&live));
        assert!(ops.is_empty());
    }

    // ── Snapshot loading ────────────────────────────────────────────

    #[tokio::test]
    async fn test_load_snapshot_without_introspector() {
        assert!(load_enum_snapshot(None).await.is_none());
    }

    #[tokio::test]
    async fn test_load_snapshot_degrades_on_error() {
        let intro = StaticIntrospector::unreachable();
        assert!(load_enum_snapshot(Some(&intro)).await.is_none());
    }

    #[tokio::test]
    async fn test_load_snapshot_success() {
        let intro = StaticIntrospector::unreachable()
            .with_enums(LiveEnumSnapshot::new().with_type("status", &["a"]));
        let live = load_enum_snapshot(Some(&intro)).await.unwrap();
        assert_eq!(live.labels("status").unwrap().len(), 1);
    }
}
