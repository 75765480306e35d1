#![forbid(unsafe_code)]

use super::support::{LEGACY_COLUMNS, VersionColumns, XID_COLUMNS};
use super::{Cx, SqliteStore, StoreError};
use rusqlite::Transaction;
use tracing::info;

const BACKFILLED_TABLES: [&str; 3] = ["relation_tuple", "namespace_config", "caveat"];

/// Markers copied by one [`SqliteStore::backfill_xid_columns`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BackfillStats {
    pub created: usize,
    pub deleted: usize,
}

impl SqliteStore {
    /// Copies legacy created/deleted markers into still-empty xid columns.
    ///
    /// Run while writing both encodings, before switching reads to the new
    /// one; rows written earlier under `legacy-only` have no xid markers.
    pub fn backfill_xid_columns(&mut self, cx: &Cx) -> Result<BackfillStats, StoreError> {
        let interrupts = self.interruptible(cx);
        let result = (|| -> Result<BackfillStats, StoreError> {
            cx.checkpoint()?;
            let tx = self.begin_write(cx)?;
            let mut stats = BackfillStats::default();
            for table in BACKFILLED_TABLES {
                cx.checkpoint()?;
                stats.created += copy_marker_tx(&tx, table, LEGACY_COLUMNS, XID_COLUMNS, true)?;
                stats.deleted += copy_marker_tx(&tx, table, LEGACY_COLUMNS, XID_COLUMNS, false)?;
            }
            cx.checkpoint()?;
            tx.commit()?;
            Ok(stats)
        })();
        drop(interrupts);
        let stats = result.map_err(|err| cx.attribute(err).during("backfill xid columns"))?;
        info!(
            created = stats.created,
            deleted = stats.deleted,
            "backfilled xid columns"
        );
        Ok(stats)
    }
}

fn copy_marker_tx(
    tx: &Transaction<'_>,
    table: &str,
    from: VersionColumns,
    to: VersionColumns,
    created: bool,
) -> Result<usize, StoreError> {
    let (source, target) = if created {
        (from.created, to.created)
    } else {
        (from.deleted, to.deleted)
    };
    let sql = format!(
        "UPDATE {table} SET {target} = {source} WHERE {target} IS NULL AND {source} IS NOT NULL"
    );
    Ok(tx.execute(&sql, [])?)
}
