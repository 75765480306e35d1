#![allow(dead_code)]

use std::sync::Arc;
use tempfile::TempDir;
use tv_core::{RelationTuple, RelationTupleUpdate};
use tv_storage::{Cx, DatastoreConfig, ManualClock, SqliteStore, TupleQuery};

/// A round second, so quantization buckets line up with test offsets.
pub const START_MS: i64 = 1_700_000_000_000;

pub struct Harness {
    pub dir: TempDir,
    pub clock: Arc<ManualClock>,
    pub store: SqliteStore,
}

impl Harness {
    pub fn new(config: DatastoreConfig) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let clock = Arc::new(ManualClock::new(START_MS));
        let store =
            SqliteStore::open_with_clock(dir.path(), config, clock.clone()).expect("open store");
        Self { dir, clock, store }
    }

    pub fn with_defaults() -> Self {
        Self::new(DatastoreConfig::default())
    }

    /// Another handle on the same database and clock.
    pub fn open_handle(&self, config: DatastoreConfig) -> SqliteStore {
        SqliteStore::open_with_clock(self.dir.path(), config, self.clock.clone())
            .expect("open second handle")
    }

    pub fn db_path(&self) -> std::path::PathBuf {
        self.dir.path().join("tuplevault.db")
    }

    pub fn raw(&self) -> rusqlite::Connection {
        rusqlite::Connection::open(self.db_path()).expect("open raw connection")
    }
}

pub fn tuple(text: &str) -> RelationTuple {
    text.parse().expect("valid tuple literal")
}

pub fn create(text: &str) -> RelationTupleUpdate {
    RelationTupleUpdate::create(tuple(text))
}

pub fn touch(text: &str) -> RelationTupleUpdate {
    RelationTupleUpdate::touch(tuple(text))
}

pub fn delete(text: &str) -> RelationTupleUpdate {
    RelationTupleUpdate::delete(tuple(text))
}

/// Runs the query and returns its tuples in canonical text form, sorted.
pub fn collect(query: &TupleQuery<'_>) -> Vec<String> {
    let iter = query.execute(&Cx::new()).expect("execute query");
    let mut out: Vec<String> = iter
        .collect_tuples()
        .expect("iterate query")
        .iter()
        .map(ToString::to_string)
        .collect();
    out.sort();
    out
}
