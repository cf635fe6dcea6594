// Integration tests for the migration engine and its ledger

use std::time::Duration;

use micasa_core::ExErrorKind;
use micasa_core_types::CancellationToken;
use micasa_store::errors::from_rusqlite;
use micasa_store::migrations::{ledger_records, pending_versions, LEDGER_TABLE};
use micasa_store::{apply_migrations, default_catalog, Catalog, MigrationUnit, Store};

fn schema_objects(store: &Store) -> Vec<String> {
    store
        .with_connection("schema_objects", &CancellationToken::new(), |conn| {
            let mut stmt = conn
                .prepare("SELECT type || ':' || name FROM sqlite_master ORDER BY type, name")
                .map_err(|e| from_rusqlite("schema_objects", e))?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| from_rusqlite("schema_objects", e))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| from_rusqlite("schema_objects", e))?;
            Ok(names)
        })
        .unwrap()
}

fn failing_catalog() -> Catalog {
    Catalog::new(vec![
        MigrationUnit::new(1, ["CREATE TABLE IF NOT EXISTS first (x INTEGER)"]),
        MigrationUnit::new(
            2,
            [
                "CREATE TABLE IF NOT EXISTS second (y INTEGER)",
                "INSERT INTO no_such_table VALUES (1)",
            ],
        ),
        MigrationUnit::new(3, ["CREATE TABLE IF NOT EXISTS third (z INTEGER)"]),
    ])
    .unwrap()
}

#[test]
fn test_apply_default_catalog_on_empty_db() {
    // Given: An empty database
    let store = Store::open_in_memory().unwrap();
    let cancel = CancellationToken::new();

    // When: The application catalog is applied
    let report = apply_migrations(&store, &default_catalog(), &cancel).unwrap();

    // Then: Every version ran and is recorded as succeeded
    assert_eq!(report.applied, vec![1, 2, 3]);
    assert!(report.skipped.is_empty());

    let records = ledger_records(&store, &cancel).unwrap();
    assert_eq!(records.len(), 3);
    for record in &records {
        assert!(record.succeeded, "version {} not succeeded", record.version);
        assert!(record.applied_at.is_some());
    }

    let objects = schema_objects(&store);
    assert!(objects.contains(&"table:Users".to_string()));
    assert!(objects.contains(&format!("table:{}", LEDGER_TABLE)));
    assert!(objects.contains(&"index:Users_name_lower".to_string()));
    assert!(objects.contains(&"index:Users_fullName_lower".to_string()));
}

#[test]
fn test_apply_twice_is_idempotent() {
    // Given: A database with the catalog applied
    let store = Store::open_in_memory().unwrap();
    let cancel = CancellationToken::new();
    apply_migrations(&store, &default_catalog(), &cancel).unwrap();
    let schema_before = schema_objects(&store);

    // When: The same catalog is applied again
    let report = apply_migrations(&store, &default_catalog(), &cancel).unwrap();

    // Then: Nothing re-executes and the schema is unchanged
    assert!(report.applied.is_empty());
    assert_eq!(report.skipped, vec![1, 2, 3]);
    assert_eq!(schema_objects(&store), schema_before);
    assert!(ledger_records(&store, &cancel)
        .unwrap()
        .iter()
        .all(|r| r.succeeded));
}

#[test]
fn test_second_run_does_not_reexecute_statements() {
    // Given: A unit whose insert would duplicate rows if run twice
    let store = Store::open_in_memory().unwrap();
    let cancel = CancellationToken::new();
    let catalog = Catalog::new(vec![MigrationUnit::new(
        1,
        ["CREATE TABLE IF NOT EXISTS seeded (x INTEGER)", "INSERT INTO seeded VALUES (1)"],
    )])
    .unwrap();

    // When: The catalog is applied twice
    apply_migrations(&store, &catalog, &cancel).unwrap();
    apply_migrations(&store, &catalog, &cancel).unwrap();

    // Then: The insert ran exactly once
    let rows: i64 = store
        .with_connection("count_seeded", &cancel, |conn| {
            conn.query_row("SELECT COUNT(*) FROM seeded", [], |row| row.get(0))
                .map_err(|e| from_rusqlite("count_seeded", e))
        })
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn test_failure_stops_at_failing_version() {
    // Given: A catalog whose second unit fails at its second statement
    let store = Store::open_in_memory().unwrap();
    let cancel = CancellationToken::new();

    // When: It is applied
    let err = apply_migrations(&store, &failing_catalog(), &cancel).unwrap_err();

    // Then: The error names version and statement
    assert_eq!(err.kind(), ExErrorKind::Migration);
    assert_eq!(err.version(), Some(2));
    assert_eq!(err.statement_index(), Some(1));

    // And: 1 succeeded, 2 is recorded unsucceeded, 3 was never attempted
    let records = ledger_records(&store, &cancel).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!((records[0].version, records[0].succeeded), (1, true));
    assert_eq!((records[1].version, records[1].succeeded), (2, false));
    assert!(records[1].applied_at.is_none());

    // And: The failed unit left no partial schema behind
    let objects = schema_objects(&store);
    assert!(objects.contains(&"table:first".to_string()));
    assert!(!objects.contains(&"table:second".to_string()));
    assert!(!objects.contains(&"table:third".to_string()));

    assert_eq!(
        pending_versions(&store, &failing_catalog(), &cancel).unwrap(),
        vec![2, 3]
    );
}

#[test]
fn test_failed_version_retried_on_next_run() {
    // Given: A run that failed at version 2
    let store = Store::open_in_memory().unwrap();
    let cancel = CancellationToken::new();
    assert!(apply_migrations(&store, &failing_catalog(), &cancel).is_err());

    // When: A corrected catalog is applied
    let fixed = Catalog::new(vec![
        MigrationUnit::new(1, ["CREATE TABLE IF NOT EXISTS first (x INTEGER)"]),
        MigrationUnit::new(2, ["CREATE TABLE IF NOT EXISTS second (y INTEGER)"]),
        MigrationUnit::new(3, ["CREATE TABLE IF NOT EXISTS third (z INTEGER)"]),
    ])
    .unwrap();
    let report = apply_migrations(&store, &fixed, &cancel).unwrap();

    // Then: Only the unsucceeded versions run
    assert_eq!(report.skipped, vec![1]);
    assert_eq!(report.applied, vec![2, 3]);
    assert!(pending_versions(&store, &fixed, &cancel)
        .unwrap()
        .is_empty());
}

#[test]
fn test_empty_catalog_creates_only_ledger() {
    let store = Store::open_in_memory().unwrap();
    let cancel = CancellationToken::new();

    let report = apply_migrations(&store, &Catalog::default(), &cancel).unwrap();

    assert!(report.applied.is_empty());
    assert!(ledger_records(&store, &cancel).unwrap().is_empty());
    assert_eq!(schema_objects(&store), vec![format!("table:{}", LEDGER_TABLE)]);
}

#[test]
fn test_pre_cancelled_token_touches_nothing() {
    // Given: A token that has already fired
    let store = Store::open_in_memory().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    // When: Migrations are applied with it
    let err = apply_migrations(&store, &default_catalog(), &cancel).unwrap_err();

    // Then: The call is cancelled and not even the ledger exists
    assert_eq!(err.kind(), ExErrorKind::Cancelled);
    assert!(schema_objects(&store).is_empty());
}

#[test]
fn test_deadline_interrupts_long_migration() {
    // Given: A unit that would run for a long time
    let store = Store::open_in_memory().unwrap();
    let slow = Catalog::new(vec![MigrationUnit::new(
        1,
        ["CREATE TABLE slow AS
          WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 500000000)
          SELECT COUNT(*) AS total FROM n"],
    )])
    .unwrap();

    // When: It is applied under a short deadline
    let cancel = CancellationToken::with_timeout(Duration::from_millis(200));
    let err = apply_migrations(&store, &slow, &cancel).unwrap_err();

    // Then: It is cancelled and the version stays pending
    assert_eq!(err.kind(), ExErrorKind::Cancelled);
    assert_eq!(err.version(), Some(1));
    assert_eq!(
        pending_versions(&store, &slow, &CancellationToken::new()).unwrap(),
        vec![1]
    );
}
