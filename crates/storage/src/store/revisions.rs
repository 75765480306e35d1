#![forbid(unsafe_code)]

use super::clock::duration_ms;
use super::{Cx, RevisionProblem, SqliteStore, StoreError};
use rusqlite::{Connection, Transaction, params};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::debug;
use tv_core::Revision;

impl SqliteStore {
    /// Exact newest committed revision, or [`Revision::NONE`] on an empty store.
    pub fn head_revision(&self, cx: &Cx) -> Result<Revision, StoreError> {
        cx.checkpoint()?;
        head_revision_tx(&self.conn).map_err(|err| err.during("head revision"))
    }

    /// Revision to hand to readers: quantized, then fuzzed, never below the GC
    /// floor and never below what this handle returned before.
    pub fn optimized_revision(&self, cx: &Cx) -> Result<Revision, StoreError> {
        cx.checkpoint()?;
        let scope = self.read_scope()?;
        let now_ms = self.now_ms();
        let head = head_revision_tx(&scope)?;
        let mut revision = head;
        if !self.config.revision_quantization.is_zero() {
            revision = quantize_tx(&scope, head, now_ms, self.quantization_ms())?;
        }
        if !self.config.revision_fuzzing_window.is_zero() {
            let fuzzed = fuzz_tx(&scope, now_ms, duration_ms(self.config.revision_fuzzing_window))?;
            revision = revision.min(fuzzed);
        }
        let floor = lowest_valid_revision_tx(&scope, now_ms, self.gc_window_ms())?;
        revision = revision.max(floor);
        scope
            .finish()
            .map_err(|err| StoreError::from(err).during("optimized revision"))?;

        let previous = self
            .issued_high_water
            .fetch_max(revision.as_i64(), Ordering::AcqRel);
        let revision = revision.max(Revision::new(previous));
        debug!(head = %head, revision = %revision, "optimized revision");
        Ok(revision)
    }

    /// Snaps `raw` down to the newest revision committed before the current
    /// quantization bucket began. A no-op when quantization is disabled.
    pub fn quantize(&self, cx: &Cx, raw: Revision) -> Result<Revision, StoreError> {
        cx.checkpoint()?;
        if self.config.revision_quantization.is_zero() {
            return Ok(raw);
        }
        let scope = self.read_scope()?;
        let now_ms = self.now_ms();
        let quantized = quantize_tx(&scope, raw, now_ms, self.quantization_ms())?;
        let floor = lowest_valid_revision_tx(&scope, now_ms, self.gc_window_ms())?;
        scope
            .finish()
            .map_err(|err| StoreError::from(err).during("quantize revision"))?;
        Ok(quantized.max(floor))
    }

    /// Oldest revision committed within `window` of now, else head; never
    /// below the GC floor.
    pub fn fuzz(&self, cx: &Cx, window: Duration) -> Result<Revision, StoreError> {
        cx.checkpoint()?;
        let scope = self.read_scope()?;
        let now_ms = self.now_ms();
        let fuzzed = fuzz_tx(&scope, now_ms, duration_ms(window))?;
        let floor = lowest_valid_revision_tx(&scope, now_ms, self.gc_window_ms())?;
        scope
            .finish()
            .map_err(|err| StoreError::from(err).during("fuzz revision"))?;
        Ok(fuzzed.max(floor))
    }

    /// Oldest revision still readable: the one that was head when the GC
    /// window began, else the oldest recorded. A revision stays valid for the
    /// whole window after it was superseded, so the floor only moves when
    /// newer writes exist.
    pub fn lowest_valid_revision(&self, cx: &Cx) -> Result<Revision, StoreError> {
        cx.checkpoint()?;
        lowest_valid_revision_tx(&self.conn, self.now_ms(), self.gc_window_ms())
            .map_err(|err| err.during("lowest valid revision"))
    }

    pub fn check_revision(&self, cx: &Cx, revision: Revision) -> Result<(), StoreError> {
        cx.checkpoint()?;
        let scope = self.read_scope()?;
        check_revision_tx(&scope, revision, self.now_ms(), self.gc_window_ms())?;
        scope
            .finish()
            .map_err(|err| StoreError::from(err).during("check revision"))
    }

    pub(in crate::store) fn gc_window_ms(&self) -> i64 {
        duration_ms(self.config.gc_window)
    }

    fn quantization_ms(&self) -> i64 {
        duration_ms(self.config.revision_quantization)
    }
}

pub(in crate::store) fn head_revision_tx(conn: &Connection) -> Result<Revision, StoreError> {
    let id = conn.query_row(
        "SELECT COALESCE(MAX(id), 0) FROM relation_tuple_transaction",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(Revision::new(id))
}

pub(in crate::store) fn lowest_valid_revision_tx(
    conn: &Connection,
    now_ms: i64,
    gc_window_ms: i64,
) -> Result<Revision, StoreError> {
    let id = conn.query_row(
        "SELECT COALESCE( \
           (SELECT MAX(id) FROM relation_tuple_transaction WHERE timestamp_ms < ?1), \
           (SELECT MIN(id) FROM relation_tuple_transaction), \
           0)",
        params![now_ms.saturating_sub(gc_window_ms)],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(Revision::new(id))
}

pub(in crate::store) fn check_revision_tx(
    conn: &Connection,
    revision: Revision,
    now_ms: i64,
    gc_window_ms: i64,
) -> Result<(), StoreError> {
    let head = head_revision_tx(conn)?;
    if head.is_none() || revision > head {
        return Err(StoreError::InvalidRevision {
            revision,
            problem: RevisionProblem::Unknown,
        });
    }
    let floor = lowest_valid_revision_tx(conn, now_ms, gc_window_ms)?;
    if revision < floor {
        return Err(StoreError::InvalidRevision {
            revision,
            problem: RevisionProblem::Expired,
        });
    }
    Ok(())
}

fn quantize_tx(
    conn: &Connection,
    raw: Revision,
    now_ms: i64,
    quantization_ms: i64,
) -> Result<Revision, StoreError> {
    let bucket_start = now_ms - now_ms.rem_euclid(quantization_ms.max(1));
    let id = conn.query_row(
        "SELECT COALESCE( \
           (SELECT MAX(id) FROM relation_tuple_transaction WHERE id <= ?1 AND timestamp_ms < ?2), \
           (SELECT MIN(id) FROM relation_tuple_transaction WHERE id <= ?1 AND timestamp_ms >= ?2), \
           ?1)",
        params![raw.as_i64(), bucket_start],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(Revision::new(id))
}

fn fuzz_tx(conn: &Connection, now_ms: i64, window_ms: i64) -> Result<Revision, StoreError> {
    let id = conn.query_row(
        "SELECT COALESCE( \
           (SELECT MIN(id) FROM relation_tuple_transaction WHERE timestamp_ms >= ?1), \
           (SELECT MAX(id) FROM relation_tuple_transaction), \
           0)",
        params![now_ms.saturating_sub(window_ms)],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(Revision::new(id))
}

/// Records a new write transaction stamped with `now_ms`; its id is the
/// commit revision.
pub(in crate::store) fn allocate_revision_tx(
    tx: &Transaction<'_>,
    now_ms: i64,
) -> Result<Revision, StoreError> {
    tx.execute(
        "INSERT INTO relation_tuple_transaction(timestamp_ms) VALUES (?1)",
        params![now_ms],
    )?;
    Ok(Revision::new(tx.last_insert_rowid()))
}
