#![forbid(unsafe_code)]

mod backfill;
mod caveats;
mod clock;
mod config;
mod cx;
mod error;
mod gc;
mod namespaces;
mod revisions;
mod snapshot;
mod support;
mod tuples;
mod version_marker;
mod writer;

pub use backfill::BackfillStats;
pub use clock::{ManualClock, SystemClock, WallClock};
pub use config::{
    DatastoreConfig, ENV_BUSY_TIMEOUT_MS, ENV_GC_WINDOW_MS, ENV_MIGRATION_PHASE,
    ENV_QUERY_PAGE_SIZE, ENV_REVISION_FUZZING_MS, ENV_REVISION_QUANTIZATION_MS,
};
pub use cx::Cx;
pub use error::{BackendError, RevisionProblem, StorageKind, StoreError};
pub use gc::GcStats;
pub use snapshot::SnapshotReader;
pub use tuples::{TupleIterator, TupleQuery};
pub use version_marker::MigrationDriver;

use rusqlite::{Connection, Transaction};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use support::{
    HEAD_VERSION, InterruptGuard, ReadScope, begin_immediate, is_known_version,
    migrate_sqlite_schema,
};
use tracing::info;
use tv_core::MigrationPhase;

const DB_FILE_NAME: &str = "tuplevault.db";

/// Handle on a tuple store database.
///
/// A handle owns one SQLite connection and is meant for one thread or task at a
/// time. Any number of handles may point at the same storage directory; writers
/// serialize through SQLite's write lock and readers run on WAL snapshots.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
    config: DatastoreConfig,
    clock: Arc<dyn WallClock>,
    /// Highest revision `optimized_revision` has handed out from this handle.
    issued_high_water: AtomicI64,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>, config: DatastoreConfig) -> Result<Self, StoreError> {
        Self::open_with_clock(storage_dir, config, Arc::new(SystemClock))
    }

    pub fn open_with_clock(
        storage_dir: impl AsRef<Path>,
        config: DatastoreConfig,
        clock: Arc<dyn WallClock>,
    ) -> Result<Self, StoreError> {
        config.validate()?;
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let mut conn = Connection::open(&db_path).map_err(|err| StoreError::from(err).during("open"))?;
        conn.busy_timeout(config.busy_timeout)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            "#,
        )?;

        preflight_gate(&conn)?;
        migrate_sqlite_schema(&mut conn)?;

        info!(
            path = %db_path.display(),
            phase = %config.migration_phase,
            schema = HEAD_VERSION,
            "opened tuple store"
        );

        Ok(Self {
            conn,
            storage_dir,
            config,
            clock,
            issued_high_water: AtomicI64::new(0),
        })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn config(&self) -> &DatastoreConfig {
        &self.config
    }

    pub fn migration_phase(&self) -> MigrationPhase {
        self.config.migration_phase
    }

    /// Version marker access on this handle's connection.
    pub fn migration_driver(&self) -> MigrationDriver<'_> {
        MigrationDriver::new(&self.conn)
    }

    fn read_scope(&self) -> Result<ReadScope<'_>, StoreError> {
        ReadScope::begin(&self.conn).map_err(|err| StoreError::from(err).during("begin read"))
    }

    /// Write transaction; waiting for the lock honours `cx` and the configured
    /// busy timeout.
    fn begin_write(&self, cx: &Cx) -> Result<Transaction<'_>, StoreError> {
        begin_immediate(&self.conn, cx, self.config.busy_timeout)
    }

    fn interruptible(&self, cx: &Cx) -> InterruptGuard<'_> {
        InterruptGuard::install(&self.conn, cx)
    }

    fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }
}

/// Refuses databases this build cannot read instead of guessing.
fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let version = MigrationDriver::new(conn).read_current_version()?;
    if !is_known_version(&version) {
        return Err(StoreError::UnsupportedSchemaVersion(version));
    }
    if !version.is_empty() {
        return Ok(());
    }

    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }
    tables.remove("schema_version");
    if tables.is_empty() {
        return Ok(());
    }

    let found = tables.into_iter().collect::<Vec<_>>().join(", ");
    Err(StoreError::UnsupportedSchemaVersion(format!(
        "unversioned tables: {found}"
    )))
}
