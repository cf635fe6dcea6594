// Repository operations log through the canonical macros and never leak secrets

mod common;

use common::{new_repo, test_user};
use micasa_core::logging_facility::test_capture::init_test_capture;
use micasa_core::UserRepository;
use micasa_core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_ERR_CODE, FIELD_ERR_KIND,
    FIELD_MIGRATION_VERSION, FIELD_USER_ID, FIELD_USER_NAME,
};
use micasa_core_types::CancellationToken;
use micasa_store::{apply_migrations, Catalog, MigrationUnit, Store};

#[test]
fn test_login_logs_reason_without_password() {
    let capture = init_test_capture();
    let repo = new_repo();
    let cancel = CancellationToken::new();

    let mut user = test_user("donna", "Donna Noble");
    repo.create(&mut user, &cancel).unwrap();
    capture.assert_event_exists("create_user", EVENT_START);
    capture.assert_event_exists("create_user", EVENT_END);
    assert_eq!(
        capture.count_events(|e| e.op.as_deref() == Some("create_user")
            && e.field(FIELD_USER_NAME) == Some("donna")
            && e.field(FIELD_USER_ID) == Some(user.id.as_str())),
        1
    );

    // Wrong password and unknown user both end in the same error event
    assert!(repo
        .get_by_credentials("donna", "hunter2-wrong", &cancel)
        .is_err());
    assert!(repo
        .get_by_credentials("nobody", "hunter2-unknown", &cancel)
        .is_err());

    let errors: Vec<_> = capture
        .events_for_op("login_user")
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .collect();
    assert_eq!(errors.len(), 2);
    for event in &errors {
        assert_eq!(event.field(FIELD_ERR_CODE), Some("ERR_AUTHENTICATION_FAILED"));
    }

    // The distinction is only visible in the warn events
    assert_eq!(
        capture.count_events(|e| e.field("reason") == Some("wrong_password")),
        1
    );
    assert_eq!(
        capture.count_events(|e| e.field("reason") == Some("unknown_user")),
        1
    );

    // Neither plaintext nor hash shows up anywhere
    capture.assert_nothing_contains("hunter2");
    capture.assert_nothing_contains(&user.password_hash);
}

#[test]
fn test_failed_migration_logs_version_and_kind() {
    let capture = init_test_capture();
    let store = Store::open_in_memory().unwrap();
    let catalog = Catalog::new(vec![
        MigrationUnit::new(41, ["CREATE TABLE IF NOT EXISTS fine (x INTEGER)"]),
        MigrationUnit::new(42, ["CREATE TABEL broken"]),
    ])
    .unwrap();

    assert!(apply_migrations(&store, &catalog, &CancellationToken::new()).is_err());

    // Each attempted unit announces itself with its version
    for version in ["41", "42"] {
        assert_eq!(
            capture.count_events(|e| e.field(FIELD_MIGRATION_VERSION) == Some(version)
                && e.fields.contains_key("statements")),
            1
        );
    }

    let failures: Vec<_> = capture
        .events_for_op("apply_migrations")
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].field(FIELD_ERR_KIND), Some("Migration"));
    assert_eq!(failures[0].field(FIELD_ERR_CODE), Some("ERR_MIGRATION"));
}
