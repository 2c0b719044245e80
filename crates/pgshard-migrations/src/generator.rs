//! End-to-end revision generation.

use pgshard_core::{Settings, ShardError};
use pgshard_db::{LiveEnumSnapshot, MetaData, SchemaSnapshot};
use pgshard_db_backends::SchemaIntrospector;

use crate::autodetect::{DiffEngine, MetadataAutodetector};
use crate::directives::{MigrationDirectiveProcessor, ProcessReport, RevisionDirective};
use crate::enums::load_enum_snapshot;
use crate::filter::AutogenerateFilter;
use crate::revision::MigrationRevision;
use crate::schema_editor::{PostgresSchemaEditor, SchemaEditor};
use crate::sequence::{slugify, timestamp_slug};

/// Produces a [`MigrationRevision`] from a metadata model.
///
/// The pipeline is: read the live state (if an introspector is given),
/// diff through the [`AutogenerateFilter`], splice shard and enum DDL with
/// the [`MigrationDirectiveProcessor`], and render everything to SQL.
///
/// # Examples
///
/// ```
/// use pgshard_core::Settings;
/// use pgshard_db::{MetaData, SchemaSnapshot, Table};
/// use pgshard_migrations::RevisionGenerator;
///
/// let md = MetaData::new().with_table(
///     Table::new("orders", vec![]).with_kwarg("postgresql_partition_by", "HASH (customer_id)"),
/// );
/// let mut settings = Settings::default();
/// settings.script_location = std::env::temp_dir().join("pgshard-doc-missing");
/// let (revision, _) = RevisionGenerator::new(settings)
///     .generate_from(&md, &SchemaSnapshot::new(), None, Some("add orders"))
///     .unwrap();
/// assert_eq!(revision.upgrade_ops.len(), 6);
/// ```
pub struct RevisionGenerator {
    settings: Settings,
    engine: Box<dyn DiffEngine>,
}

impl RevisionGenerator {
    /// Creates a generator using the built-in [`MetadataAutodetector`].
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            engine: Box::new(MetadataAutodetector::new()),
        }
    }

    /// Replaces the diff engine.
    pub fn with_engine(mut self, engine: impl DiffEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    /// The settings in use.
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Generates a revision, reading live state through `introspector`.
    ///
    /// Without an introspector the database is assumed empty. A failing
    /// enum query degrades to the offline enum branch; a failing schema
    /// reflection aborts.
    ///
    /// # Errors
    ///
    /// Returns any reflection, configuration, or generation error.
    pub async fn generate(
        &self,
        metadata: &MetaData,
        introspector: Option<&dyn SchemaIntrospector>,
        message: Option<&str>,
    ) -> Result<(MigrationRevision, ProcessReport), ShardError> {
        let live_enums = load_enum_snapshot(introspector).await;
        let current = match introspector {
            Some(introspector) => introspector.reflect_schema().await?,
            None => SchemaSnapshot::new(),
        };
        self.generate_from(metadata, &current, live_enums.as_ref(), message)
    }

    /// Generates a revision against already-read live state.
    ///
    /// # Errors
    ///
    /// Returns any configuration or generation error.
    pub fn generate_from(
        &self,
        metadata: &MetaData,
        current: &SchemaSnapshot,
        live_enums: Option<&LiveEnumSnapshot>,
        message: Option<&str>,
    ) -> Result<(MigrationRevision, ProcessReport), ShardError> {
        let filter = AutogenerateFilter::from_settings(&self.settings.filter);
        let diff = self.engine.compare(metadata, current, &filter)?;

        let slug = message.and_then(slugify).unwrap_or_else(timestamp_slug);
        let mut directives = [RevisionDirective::new(slug, diff).with_message(message)];
        let report = MigrationDirectiveProcessor::new(&self.settings).process(
            &mut directives,
            metadata,
            live_enums,
        )?;
        let [directive] = directives;

        let editor = PostgresSchemaEditor::new().with_partitioning(report.partitions.values());
        let revision = MigrationRevision::new(
            directive.rev_id,
            report.sequence_number,
            directive.message,
            editor.render_all(&directive.upgrade_ops),
            editor.render_all(&directive.downgrade_ops),
        );
        tracing::info!(
            revision = %revision.revision_id,
            upgrade = revision.upgrade_ops.len(),
            downgrade = revision.downgrade_ops.len(),
            "Generated revision"
        );
        Ok((revision, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgshard_db::{Column, ColumnType, Table};
    use pgshard_db_backends::StaticIntrospector;

    use crate::autodetect::DiffResult;
    use crate::filter::ObjectFilter;
    use crate::scanner::PARTITION_BY_KEY;

    fn settings(dir: &std::path::Path) -> Settings {
        Settings {
            script_location: dir.to_path_buf(),
            ..Settings::default()
        }
    }

    fn metadata() -> MetaData {
        MetaData::new().with_table(
            Table::new(
                "orders",
                vec![
                    Column::new("id", ColumnType::BigSerial).primary_key(),
                    Column::new("customer_id", ColumnType::BigInteger).primary_key(),
                    Column::new(
                        "status",
                        ColumnType::Enum {
                            name: "order_status".into(),
                            values: vec!["new".into(), "paid".into(), "shipped".into()],
                        },
                    ),
                ],
            )
            .with_kwarg(PARTITION_BY_KEY, "HASH (customer_id)"),
        )
    }

    struct NoChanges;

    impl DiffEngine for NoChanges {
        fn compare(
            &self,
            _metadata: &MetaData,
            _current: &SchemaSnapshot,
            _filter: &dyn ObjectFilter,
        ) -> Result<DiffResult, ShardError> {
            Ok(DiffResult::default())
        }
    }

    // ── Offline ─────────────────────────────────────────────────────

    #[test]
    fn test_generate_from_empty_database() {
        let dir = tempfile::tempdir().unwrap();
        let (revision, report) = RevisionGenerator::new(settings(dir.path()))
            .generate_from(&metadata(), &SchemaSnapshot::new(), None, Some("Add orders"))
            .unwrap();

        assert_eq!(revision.revision_id, "0001_add_orders");
        assert_eq!(report.enum_statements, 1);
        assert_eq!(
            revision.upgrade_ops[0],
            "CREATE TYPE order_status AS ENUM ('new', 'paid', 'shipped')"
        );
        assert!(revision.upgrade_ops[1].starts_with("CREATE TABLE orders ("));
        assert!(revision.upgrade_ops[1].ends_with("PARTITION BY HASH (customer_id)"));
        assert_eq!(revision.upgrade_ops[2], "-- Auto-generated partitions for orders");
        assert_eq!(revision.upgrade_ops.len(), 7);
        assert_eq!(
            revision.downgrade_ops.last().map(String::as_str),
            Some("DROP TYPE IF EXISTS order_status")
        );
    }

    #[test]
    fn test_timestamp_slug_without_message() {
        let dir = tempfile::tempdir().unwrap();
        let (revision, _) = RevisionGenerator::new(settings(dir.path()))
            .generate_from(&metadata(), &SchemaSnapshot::new(), None, None)
            .unwrap();
        assert!(revision.revision_id.starts_with("0001_auto_"));
        assert_eq!(revision.message, None);
    }

    #[test]
    fn test_custom_engine_still_gets_enum_ops() {
        let dir = tempfile::tempdir().unwrap();
        let generator = RevisionGenerator::new(settings(dir.path())).with_engine(NoChanges);
        let live = LiveEnumSnapshot::new().with_type("order_status", &["new", "paid"]);
        let (revision, _) = generator
            .generate_from(&metadata(), &SchemaSnapshot::new(), Some(&live), Some("x"))
            .unwrap();
        assert_eq!(
            revision.upgrade_ops,
            vec![
                "-- Add new enum values to order_status",
                "ALTER TYPE order_status ADD VALUE IF NOT EXISTS 'shipped'",
            ]
        );
        assert!(revision.downgrade_ops.iter().all(|s| s.starts_with("--")));
    }

    // ── Through an introspector ─────────────────────────────────────

    #[tokio::test]
    async fn test_generate_with_in_sync_database() {
        let dir = tempfile::tempdir().unwrap();
        let introspector = StaticIntrospector::new(
            LiveEnumSnapshot::new().with_type("order_status", &["new", "paid", "shipped"]),
            SchemaSnapshot::new()
                .with_table("orders")
                .with_table("orders_p0")
                .with_table("orders_p1"),
        );
        let (revision, _) = RevisionGenerator::new(settings(dir.path()))
            .generate(&metadata(), Some(&introspector), Some("noop"))
            .await
            .unwrap();
        assert!(revision.is_empty(), "{revision:?}");
    }

    #[tokio::test]
    async fn test_enum_failure_degrades_to_offline() {
        let dir = tempfile::tempdir().unwrap();
        let introspector = StaticIntrospector::unreachable().with_schema(SchemaSnapshot::new());
        let (revision, _) = RevisionGenerator::new(settings(dir.path()))
            .generate(&metadata(), Some(&introspector), None)
            .await
            .unwrap();
        assert!(revision.upgrade_ops[0].starts_with("CREATE TYPE order_status"));
    }

    #[tokio::test]
    async fn test_reflection_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let introspector = StaticIntrospector::unreachable();
        let err = RevisionGenerator::new(settings(dir.path()))
            .generate(&metadata(), Some(&introspector), None)
            .await
            .unwrap_err();
        assert!(err.is_database_error());
    }
}
