#![forbid(unsafe_code)]

use super::revisions::lowest_valid_revision_tx;
use super::support::read_columns;
use super::{Cx, SqliteStore, StoreError};
use rusqlite::{Transaction, params};
use tracing::info;
use tv_core::{MigrationPhase, Revision};

/// Rows physically removed by one [`SqliteStore::collect_garbage`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Lowest valid revision at the time of the run.
    pub floor: Revision,
    pub transactions: usize,
    pub tuples: usize,
    pub namespaces: usize,
    pub caveats: usize,
}

impl GcStats {
    pub fn total(&self) -> usize {
        self.transactions + self.tuples + self.namespaces + self.caveats
    }
}

impl SqliteStore {
    /// Deletes rows no valid revision can observe: versioned rows deleted
    /// before the GC floor, and transaction rows older than it.
    pub fn collect_garbage(&mut self, cx: &Cx) -> Result<GcStats, StoreError> {
        let phase = self.config.migration_phase;
        let gc_window_ms = self.gc_window_ms();
        let interrupts = self.interruptible(cx);
        let result = (|| -> Result<GcStats, StoreError> {
            cx.checkpoint()?;
            let tx = self.begin_write(cx)?;
            let floor = lowest_valid_revision_tx(&tx, self.clock.now_ms(), gc_window_ms)?;
            if floor.is_none() {
                return Ok(GcStats::default());
            }

            cx.checkpoint()?;
            let tuples = delete_expired_rows_tx(&tx, "relation_tuple", phase, floor)?;
            cx.checkpoint()?;
            let namespaces = delete_expired_rows_tx(&tx, "namespace_config", phase, floor)?;
            cx.checkpoint()?;
            let caveats = delete_expired_rows_tx(&tx, "caveat", phase, floor)?;
            cx.checkpoint()?;
            let transactions = tx.execute(
                "DELETE FROM relation_tuple_transaction WHERE id < ?1",
                params![floor.as_i64()],
            )?;

            cx.checkpoint()?;
            tx.commit()?;
            Ok(GcStats {
                floor,
                transactions,
                tuples,
                namespaces,
                caveats,
            })
        })();
        drop(interrupts);
        let stats = result.map_err(|err| cx.attribute(err).during("collect garbage"))?;
        info!(
            floor = %stats.floor,
            transactions = stats.transactions,
            tuples = stats.tuples,
            namespaces = stats.namespaces,
            caveats = stats.caveats,
            "garbage collection finished"
        );
        Ok(stats)
    }
}

fn delete_expired_rows_tx(
    tx: &Transaction<'_>,
    table: &str,
    phase: MigrationPhase,
    floor: Revision,
) -> Result<usize, StoreError> {
    let deleted = read_columns(phase).deleted;
    let sql = format!("DELETE FROM {table} WHERE {deleted} < ?1");
    Ok(tx.execute(&sql, params![floor.as_i64()])?)
}
