#![forbid(unsafe_code)]

mod support;

use std::thread;
use std::time::{Duration, Instant};
use support::{Harness, collect, create};
use tv_core::Revision;
use tv_storage::{Cx, DatastoreConfig, StoreError};

#[test]
fn cancelled_write_commits_nothing() {
    let mut h = Harness::with_defaults();
    let cx = Cx::new();
    cx.cancel();
    let err = h
        .store
        .write_tuples(&cx, &[], &[create("doc:1#viewer@user:alice")])
        .expect_err("cancelled");
    assert!(matches!(err, StoreError::Cancelled));
    assert_eq!(
        h.store.head_revision(&Cx::new()).expect("head"),
        Revision::NONE
    );
}

#[test]
fn expired_deadline_fails_reads_and_writes() {
    let mut h = Harness::with_defaults();
    let r = h
        .store
        .write_tuples(&Cx::new(), &[], &[create("doc:1#viewer@user:alice")])
        .expect("seed");

    let late = Cx::new().with_deadline(Instant::now());
    assert!(matches!(
        h.store.head_revision(&late),
        Err(StoreError::DeadlineExceeded)
    ));
    assert!(matches!(
        h.store.query_tuples("doc", r).execute(&late).err(),
        Some(StoreError::DeadlineExceeded)
    ));
    assert!(matches!(
        h.store
            .write_tuples(&late, &[], &[create("doc:2#viewer@user:alice")])
            .err(),
        Some(StoreError::DeadlineExceeded)
    ));
    assert_eq!(h.store.head_revision(&Cx::new()).expect("head"), r);
}

#[test]
fn cancelling_mid_iteration_stops_with_an_error() {
    let mut h = Harness::new(DatastoreConfig::default().with_query_page_size(2));
    let cx = Cx::new();
    let updates: Vec<_> = (0..5)
        .map(|i| create(&format!("doc:{i}#viewer@user:alice")))
        .collect();
    let r = h.store.write_tuples(&cx, &[], &updates).expect("seed");

    let query = h.store.query_tuples("doc", r);
    let mut iter = query.execute(&cx).expect("execute");
    assert!(iter.next().is_some());
    assert!(iter.next().is_some());
    cx.cancel();
    assert!(iter.next().is_none());
    assert!(matches!(iter.err(), Some(StoreError::Cancelled)));
    assert!(iter.is_closed());
    drop(iter);

    // The handle is usable again once the iterator let go of its snapshot.
    assert_eq!(collect(&h.store.query_tuples("doc", r)).len(), 5);
}

#[test]
fn generous_timeout_does_not_interfere() {
    let mut h = Harness::with_defaults();
    let cx = Cx::new().with_timeout(Duration::from_secs(60));
    let r = h
        .store
        .write_tuples(&cx, &[], &[create("doc:1#viewer@user:alice")])
        .expect("write");
    assert_eq!(collect(&h.store.query_tuples("doc", r)).len(), 1);
}

fn hold_write_lock(h: &Harness) -> rusqlite::Connection {
    let holder = h.raw();
    holder
        .execute_batch("BEGIN IMMEDIATE")
        .expect("hold write lock");
    holder
}

#[test]
fn cancel_reaches_a_write_waiting_for_the_lock() {
    let mut h = Harness::new(DatastoreConfig::default().with_busy_timeout(Duration::from_secs(3)));
    let holder = hold_write_lock(&h);

    let cx = Cx::new();
    let canceller = cx.clone();
    let cancelling = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        canceller.cancel();
    });
    let started = Instant::now();
    let err = h
        .store
        .write_tuples(&cx, &[], &[create("doc:1#viewer@user:alice")])
        .expect_err("cancelled while queued");
    cancelling.join().expect("canceller thread");
    assert!(matches!(err, StoreError::Cancelled), "{err}");
    assert!(started.elapsed() < Duration::from_secs(2), "{:?}", started.elapsed());

    holder.execute_batch("ROLLBACK").expect("release lock");
    assert_eq!(
        h.store.head_revision(&Cx::new()).expect("head"),
        Revision::NONE
    );
    h.store
        .write_tuples(&Cx::new(), &[], &[create("doc:1#viewer@user:alice")])
        .expect("lock is free again");
}

#[test]
fn deadline_caps_the_wait_for_the_lock() {
    let mut h = Harness::new(DatastoreConfig::default().with_busy_timeout(Duration::from_secs(3)));
    let holder = hold_write_lock(&h);

    let cx = Cx::new().with_timeout(Duration::from_millis(200));
    let started = Instant::now();
    let err = h.store.collect_garbage(&cx).expect_err("deadline while queued");
    assert!(matches!(err, StoreError::DeadlineExceeded), "{err}");
    assert!(started.elapsed() < Duration::from_secs(2), "{:?}", started.elapsed());
    drop(holder);
}

#[test]
fn busy_timeout_still_bounds_an_uncancelled_wait() {
    let mut h =
        Harness::new(DatastoreConfig::default().with_busy_timeout(Duration::from_millis(150)));
    let holder = hold_write_lock(&h);

    let err = h
        .store
        .write_tuples(&Cx::new(), &[], &[create("doc:1#viewer@user:alice")])
        .expect_err("lock never freed");
    assert_eq!(err.code(), "STORAGE");
    assert!(err.is_transient(), "{err}");
    drop(holder);
}
