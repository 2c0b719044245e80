//! End-to-end tests for the `pgshard` commands against a temporary project.

use std::path::PathBuf;

use pgshard_cli::command::{load_settings, CommandRegistry};
use pgshard_cli::commands::makemigrations::{run, MakemigrationsOptions, MakemigrationsOutcome};
use pgshard_cli::commands::register_builtin_commands;
use pgshard_core::Settings;
use pgshard_migrations::RevisionWriter;

const MODEL: &str = r#"{
  "tables": [
    {
      "name": "customers",
      "columns": [{ "name": "id", "type": { "kind": "big_serial" }, "primary_key": true }]
    },
    {
      "name": "orders",
      "kwargs": { "postgresql_partition_by": "HASH (customer_id)" },
      "columns": [
        { "name": "id", "type": { "kind": "big_serial" }, "primary_key": true },
        { "name": "customer_id", "type": { "kind": "big_integer" }, "primary_key": true },
        { "name": "status", "type": { "kind": "enum", "name": "order_status", "values": ["new", "paid"] } }
      ]
    }
  ]
}"#;

fn project(model: &str) -> (tempfile::TempDir, Settings) {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("model.json");
    std::fs::write(&model_path, model).unwrap();

    let settings_path = dir.path().join("pgshard.toml");
    std::fs::write(
        &settings_path,
        format!(
            "script_location = {:?}\nmetadata_path = {:?}\n",
            dir.path().join("migrations").display().to_string(),
            model_path.display().to_string()
        ),
    )
    .unwrap();

    let settings = load_settings(Some(&settings_path)).unwrap();
    (dir, settings)
}

fn registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);
    registry
}

fn versions(settings: &Settings) -> Vec<String> {
    let dir = settings.versions_dir();
    if !dir.exists() {
        return Vec::new();
    }
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn options(message: &str) -> MakemigrationsOptions {
    MakemigrationsOptions {
        message: Some(message.into()),
        dry_run: false,
        offline: true,
    }
}

// ── makemigrations ──────────────────────────────────────────────────

#[tokio::test]
async fn test_makemigrations_writes_revision() {
    let (_dir, settings) = project(MODEL);
    let outcome = run(&settings, &options("initial")).await.unwrap();

    let MakemigrationsOutcome::Written(paths) = outcome else {
        panic!("expected files to be written");
    };
    assert_eq!(paths.len(), 2);
    assert_eq!(versions(&settings), vec!["0001_initial.json", "0001_initial.sql"]);

    let revision = RevisionWriter::read(&settings.versions_dir().join("0001_initial.json")).unwrap();
    assert_eq!(revision.upgrade_ops[0], "CREATE TYPE order_status AS ENUM ('new', 'paid')");
    assert!(revision
        .upgrade_ops
        .iter()
        .any(|s| s == "CREATE TABLE orders_p3 PARTITION OF orders FOR VALUES WITH (MODULUS 4, REMAINDER 3)"));
}

#[tokio::test]
async fn test_second_run_gets_next_number() {
    let (_dir, settings) = project(MODEL);
    run(&settings, &options("initial")).await.unwrap();
    run(&settings, &options("again")).await.unwrap();
    assert!(versions(&settings).contains(&"0002_again.sql".to_string()));
}

#[tokio::test]
async fn test_repeated_message_gets_new_number() {
    let (_dir, settings) = project(MODEL);
    let first = settings.versions_dir().join("0001_initial.sql");
    run(&settings, &options("initial")).await.unwrap();
    let before = std::fs::read_to_string(&first).unwrap();

    run(&settings, &options("initial")).await.unwrap();
    assert_eq!(std::fs::read_to_string(&first).unwrap(), before);
    assert_eq!(versions(&settings).len(), 4);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let (_dir, settings) = project(MODEL);
    let outcome = run(
        &settings,
        &MakemigrationsOptions {
            dry_run: true,
            ..options("preview")
        },
    )
    .await
    .unwrap();

    let MakemigrationsOutcome::DryRun(script) = outcome else {
        panic!("expected a dry run");
    };
    assert!(script.starts_with("-- Revision: 0001_preview\n"));
    assert!(script.contains("\n-- downgrade\nDROP TABLE IF EXISTS orders_p0;\n"));
    assert!(versions(&settings).is_empty());
}

#[tokio::test]
async fn test_invalid_model_aborts_without_files() {
    let model = MODEL.replace("HASH (customer_id)", "RANGE (customer_id)");
    let (_dir, settings) = project(&model);
    let err = run(&settings, &options("broken")).await.unwrap_err();
    assert!(err.is_configuration_error());
    assert!(versions(&settings).is_empty());
}

// ── Through the registry ────────────────────────────────────────────

#[tokio::test]
async fn test_registry_dispatch() {
    let (_dir, settings) = project(MODEL);
    let registry = registry();

    let matches = registry
        .build_cli()
        .try_get_matches_from(["pgshard", "makemigrations", "-m", "via cli", "--offline"])
        .unwrap();
    registry.execute(&matches, &settings).await.unwrap();
    assert_eq!(versions(&settings), vec!["0001_via_cli.json", "0001_via_cli.sql"]);

    let matches = registry
        .build_cli()
        .try_get_matches_from(["pgshard", "showpartitions", "orders"])
        .unwrap();
    registry.execute(&matches, &settings).await.unwrap();

    let matches = registry
        .build_cli()
        .try_get_matches_from(["pgshard", "check"])
        .unwrap();
    registry.execute(&matches, &settings).await.unwrap();
}

#[tokio::test]
async fn test_check_fails_on_invalid_model() {
    let model = MODEL.replace("HASH (customer_id)", "HASH (missing)");
    let (_dir, settings) = project(&model);
    let registry = registry();
    let matches = registry
        .build_cli()
        .try_get_matches_from(["pgshard", "check"])
        .unwrap();
    assert!(registry.execute(&matches, &settings).await.is_err());
}

#[test]
fn test_settings_file_paths() {
    let (dir, settings) = project(MODEL);
    assert_eq!(
        settings.versions_dir(),
        dir.path().join("migrations").join("versions")
    );
    let model: PathBuf = dir.path().join("model.json");
    assert_eq!(settings.metadata_path.as_deref(), Some(model.as_path()));
}
