#![forbid(unsafe_code)]

use super::super::super::super::StoreError;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

/// Adds `column` unless an earlier, interrupted run already did.
/// Returns whether the column was added now.
pub(super) fn ensure_column(
    conn: &Connection,
    table: &str,
    column: &str,
    decl: &str,
) -> Result<bool, StoreError> {
    let present = conn
        .query_row(
            "SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2",
            params![table, column],
            |_| Ok(()),
        )
        .optional()
        .map_err(|err| StoreError::from(err).during("inspect columns"))?;
    if present.is_some() {
        debug!(table, column, "column already present");
        return Ok(false);
    }

    conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl}"), [])
        .map_err(|err| StoreError::from(err).during("add column"))?;
    Ok(true)
}
