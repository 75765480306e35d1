#![forbid(unsafe_code)]

mod support;

use std::time::Duration;
use support::{Harness, START_MS, collect, create, touch};
use tv_core::Revision;
use tv_storage::{Cx, DatastoreConfig, RevisionProblem, StoreError};

fn expired(err: &StoreError) -> bool {
    matches!(
        err,
        StoreError::InvalidRevision {
            problem: RevisionProblem::Expired,
            ..
        }
    )
}

#[test]
fn empty_store_has_no_valid_revision() {
    let h = Harness::with_defaults();
    let cx = Cx::new();
    assert_eq!(h.store.head_revision(&cx).expect("head"), Revision::NONE);
    assert_eq!(h.store.optimized_revision(&cx).expect("now"), Revision::NONE);
    let err = h
        .store
        .check_revision(&cx, Revision::NONE)
        .expect_err("nothing committed");
    assert!(matches!(
        err,
        StoreError::InvalidRevision {
            problem: RevisionProblem::Unknown,
            ..
        }
    ));
}

#[test]
fn revisions_expire_only_once_a_newer_write_exists() {
    let mut h = Harness::new(DatastoreConfig::default().with_gc_window(Duration::from_secs(10)));
    let cx = Cx::new();
    let r1 = h
        .store
        .write_tuples(&cx, &[], &[create("doc:1#viewer@user:alice")])
        .expect("r1");

    h.clock.advance(Duration::from_secs(60));
    h.store
        .check_revision(&cx, r1)
        .expect("head stays valid while nothing newer exists");

    h.clock.advance(Duration::from_secs(1));
    let r2 = h
        .store
        .write_tuples(&cx, &[], &[touch("doc:1#viewer@user:alice")])
        .expect("r2");
    h.store
        .check_revision(&cx, r1)
        .expect("superseded revision stays valid for the window");

    h.clock.advance(Duration::from_secs(10) + Duration::from_millis(1));
    let err = h.store.check_revision(&cx, r1).expect_err("r1 expired");
    assert!(expired(&err), "{err}");
    let err = h
        .store
        .query_tuples("doc", r1)
        .execute(&cx)
        .err()
        .expect("query at expired revision");
    assert!(expired(&err), "{err}");
    assert_eq!(h.store.lowest_valid_revision(&cx).expect("floor"), r2);
    h.store.check_revision(&cx, r2).expect("r2 valid");
}

#[test]
fn handed_out_revision_survives_an_immediate_write() {
    let mut h = Harness::new(DatastoreConfig::default().with_gc_window(Duration::from_secs(10)));
    let cx = Cx::new();
    let r1 = h
        .store
        .write_tuples(&cx, &[], &[create("doc:1#viewer@user:alice")])
        .expect("r1");
    h.clock.advance(Duration::from_secs(60));
    assert_eq!(h.store.optimized_revision(&cx).expect("now"), r1);

    h.clock.advance(Duration::from_millis(1));
    let r2 = h
        .store
        .write_tuples(&cx, &[], &[touch("doc:1#viewer@user:alice")])
        .expect("r2");
    assert_eq!(h.store.lowest_valid_revision(&cx).expect("floor"), r1);
    assert_eq!(collect(&h.store.query_tuples("doc", r1)).len(), 1);

    // Collection leaves everything r1 can see in place.
    let stats = h.store.collect_garbage(&cx).expect("gc");
    assert_eq!(stats.floor, r1);
    assert_eq!(stats.total(), 0);

    h.clock.advance(Duration::from_secs(9));
    assert_eq!(collect(&h.store.query_tuples("doc", r1)).len(), 1);
    h.clock.advance(Duration::from_millis(1_001));
    assert!(expired(
        &h.store.check_revision(&cx, r1).expect_err("window elapsed")
    ));
    assert_eq!(collect(&h.store.query_tuples("doc", r2)).len(), 1);
}

#[test]
fn older_revisions_inside_the_window_stay_valid() {
    let mut h = Harness::new(DatastoreConfig::default().with_gc_window(Duration::from_secs(10)));
    let cx = Cx::new();
    let r1 = h
        .store
        .write_tuples(&cx, &[], &[create("doc:1#viewer@user:alice")])
        .expect("r1");
    h.clock.advance(Duration::from_secs(5));
    let r2 = h
        .store
        .write_tuples(&cx, &[], &[create("doc:2#viewer@user:alice")])
        .expect("r2");
    h.clock.advance(Duration::from_secs(4));

    h.store.check_revision(&cx, r1).expect("r1 still in window");
    assert_eq!(collect(&h.store.query_tuples("doc", r1)).len(), 1);
    assert_eq!(collect(&h.store.query_tuples("doc", r2)).len(), 2);

    // Superseded at +5s, so r1 lasts until the window has passed that point.
    h.clock.advance(Duration::from_secs(2));
    h.store.check_revision(&cx, r1).expect("r2 not yet a window old");
    h.clock.advance(Duration::from_secs(5));
    assert!(expired(
        &h.store.check_revision(&cx, r1).expect_err("r1 left the window")
    ));
}

#[test]
fn fuzzing_only_affects_the_window_after_a_write() {
    let config = DatastoreConfig::default().with_revision_fuzzing_window(Duration::from_secs(1));
    let mut h = Harness::new(config);
    let cx = Cx::new();
    let r1 = h
        .store
        .write_tuples(&cx, &[], &[create("doc:1#viewer@user:alice")])
        .expect("r1");
    h.clock.advance(Duration::from_millis(100));
    let r2 = h
        .store
        .write_tuples(&cx, &[], &[create("doc:2#viewer@user:alice")])
        .expect("r2");
    h.clock.advance(Duration::from_millis(100));

    let fuzzed = h.store.optimized_revision(&cx).expect("fuzzed now");
    assert_eq!(fuzzed, r1);
    assert!(fuzzed <= h.store.head_revision(&cx).expect("head"));
    assert_eq!(h.store.fuzz(&cx, Duration::from_secs(1)).expect("fuzz"), r1);
    assert_eq!(h.store.fuzz(&cx, Duration::from_millis(150)).expect("fuzz"), r2);

    h.clock.advance(Duration::from_millis(1_000));
    assert_eq!(h.store.optimized_revision(&cx).expect("settled now"), r2);
}

#[test]
fn optimized_revision_never_goes_backwards_on_a_handle() {
    let config = DatastoreConfig::default().with_revision_fuzzing_window(Duration::from_secs(1));
    let mut h = Harness::new(config.clone());
    let cx = Cx::new();
    h.store
        .write_tuples(&cx, &[], &[create("doc:1#viewer@user:alice")])
        .expect("r1");
    h.clock.advance(Duration::from_secs(2));
    let r2 = h
        .store
        .write_tuples(&cx, &[], &[create("doc:2#viewer@user:alice")])
        .expect("r2");
    h.clock.advance(Duration::from_secs(2));
    assert_eq!(h.store.optimized_revision(&cx).expect("now"), r2);

    // A write from another handle opens a fresh fuzz window.
    let mut other = h.open_handle(config);
    let r3 = other
        .write_tuples(&cx, &[], &[create("doc:3#viewer@user:alice")])
        .expect("r3");
    assert!(r3 > r2);
    assert_eq!(h.store.optimized_revision(&cx).expect("now"), r3);
    h.clock.advance(Duration::from_millis(10));
    let again = h.store.optimized_revision(&cx).expect("now again");
    assert!(again >= r3);
}

#[test]
fn quantization_pins_reads_to_the_previous_bucket() {
    let config = DatastoreConfig::default().with_revision_quantization(Duration::from_secs(1));
    let mut h = Harness::new(config);
    let cx = Cx::new();

    h.clock.set_ms(START_MS + 100);
    let r1 = h
        .store
        .write_tuples(&cx, &[], &[create("doc:1#viewer@user:alice")])
        .expect("r1");
    h.clock.set_ms(START_MS + 1_100);
    let r2 = h
        .store
        .write_tuples(&cx, &[], &[create("doc:2#viewer@user:alice")])
        .expect("r2");
    h.clock.set_ms(START_MS + 1_200);
    let r3 = h
        .store
        .write_tuples(&cx, &[], &[create("doc:3#viewer@user:alice")])
        .expect("r3");

    h.clock.set_ms(START_MS + 1_300);
    assert_eq!(h.store.optimized_revision(&cx).expect("now"), r1);
    assert_eq!(h.store.quantize(&cx, r3).expect("quantize"), r1);
    assert_eq!(h.store.quantize(&cx, r2).expect("quantize"), r1);

    h.clock.set_ms(START_MS + 2_050);
    assert_eq!(h.store.optimized_revision(&cx).expect("next bucket"), r3);
    assert_eq!(h.store.quantize(&cx, r2).expect("quantize"), r2);
}

#[test]
fn quantization_is_a_no_op_when_disabled() {
    let mut h = Harness::with_defaults();
    let cx = Cx::new();
    let r1 = h
        .store
        .write_tuples(&cx, &[], &[create("doc:1#viewer@user:alice")])
        .expect("r1");
    let r2 = h
        .store
        .write_tuples(&cx, &[], &[create("doc:2#viewer@user:alice")])
        .expect("r2");
    assert_eq!(h.store.quantize(&cx, r1).expect("quantize"), r1);
    assert_eq!(h.store.optimized_revision(&cx).expect("now"), r2);
}

#[test]
fn snapshot_reader_checks_its_revision() {
    let mut h = Harness::new(DatastoreConfig::default().with_gc_window(Duration::from_secs(10)));
    let cx = Cx::new();
    let r1 = h
        .store
        .write_tuples(&cx, &[], &[create("doc:1#viewer@user:alice")])
        .expect("r1");
    let reader = h.store.snapshot_reader(&cx, r1).expect("reader");
    assert_eq!(reader.revision(), r1);
    assert_eq!(collect(&reader.query_tuples("doc")).len(), 1);

    let err = h
        .store
        .snapshot_reader(&cx, Revision::new(r1.as_i64() + 5))
        .expect_err("future revision");
    assert_eq!(err.code(), "INVALID_REVISION");
}
