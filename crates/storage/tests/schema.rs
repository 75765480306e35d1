#![forbid(unsafe_code)]

mod support;

use std::time::Duration;
use support::{Harness, collect, create};
use tv_storage::{Cx, DatastoreConfig, SqliteStore, StoreError};

#[test]
fn fresh_database_is_at_head_version() {
    let h = Harness::with_defaults();
    let version = h
        .store
        .migration_driver()
        .read_current_version()
        .expect("version");
    assert_eq!(version, "add-xid-columns");
}

#[test]
fn reopening_keeps_data_and_version() {
    let mut h = Harness::with_defaults();
    let cx = Cx::new();
    let r = h
        .store
        .write_tuples(&cx, &[], &[create("doc:1#viewer@user:alice")])
        .expect("write");

    let reopened = h.open_handle(DatastoreConfig::default());
    assert_eq!(
        reopened
            .migration_driver()
            .read_current_version()
            .expect("version"),
        "add-xid-columns"
    );
    assert_eq!(collect(&reopened.query_tuples("doc", r)).len(), 1);
}

#[test]
fn unknown_schema_version_requires_reset() {
    let h = Harness::with_defaults();
    h.raw()
        .execute("UPDATE schema_version SET version_num = 'from-the-future'", [])
        .expect("bump marker");

    let err = SqliteStore::open_with_clock(h.dir.path(), DatastoreConfig::default(), h.clock.clone())
        .expect_err("unknown version");
    assert_eq!(err.code(), "RESET_REQUIRED");
    assert!(err.to_string().contains("from-the-future"), "{err}");
}

#[test]
fn unversioned_tables_require_reset() {
    let dir = tempfile::tempdir().expect("temp dir");
    let raw = rusqlite::Connection::open(dir.path().join("tuplevault.db")).expect("raw db");
    raw.execute_batch("CREATE TABLE stray (id INTEGER PRIMARY KEY);")
        .expect("stray table");
    drop(raw);

    let err = SqliteStore::open(dir.path(), DatastoreConfig::default()).expect_err("stray");
    assert!(matches!(err, StoreError::UnsupportedSchemaVersion(ref detail) if detail.contains("stray")));
}

#[test]
fn stale_marker_update_is_a_conflict() {
    let h = Harness::with_defaults();
    let driver = h.store.migration_driver();
    let err = driver
        .write_version("something-else", "initial")
        .expect_err("marker already moved on");
    assert!(matches!(
        err,
        StoreError::VersionConflict { affected: 0, ref expected } if expected == "initial"
    ));
    assert_eq!(
        driver.read_current_version().expect("version"),
        "add-xid-columns"
    );
}

#[test]
fn invalid_config_is_rejected_before_touching_disk() {
    let dir = tempfile::tempdir().expect("temp dir");
    let target = dir.path().join("never-created");
    let config = DatastoreConfig::default()
        .with_gc_window(Duration::from_secs(1))
        .with_revision_fuzzing_window(Duration::from_secs(5));
    let err = SqliteStore::open(&target, config).expect_err("fuzz wider than gc");
    assert_eq!(err.code(), "INVALID_CONFIG");
    assert!(!target.exists());
}
