#![forbid(unsafe_code)]

use super::StoreError;
use rusqlite::{Connection, OptionalExtension, params};

/// Reads and advances the single-row `schema_version` marker.
///
/// Works on a plain connection or inside a transaction (`&Transaction` derefs
/// to `&Connection`).
#[derive(Debug, Clone, Copy)]
pub struct MigrationDriver<'c> {
    conn: &'c Connection,
}

impl<'c> MigrationDriver<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Currently applied version; `""` when the marker table does not exist
    /// yet or holds no row.
    pub fn read_current_version(&self) -> Result<String, StoreError> {
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version'",
                [],
                |_| Ok(()),
            )
            .optional()
            .map_err(|err| StoreError::from(err).during("read schema version"))?;
        if exists.is_none() {
            return Ok(String::new());
        }

        let version = self
            .conn
            .query_row("SELECT version_num FROM schema_version", [], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .map_err(|err| StoreError::from(err).during("read schema version"))?;
        Ok(version.unwrap_or_default())
    }

    /// Replaces `replaced` with `version`; anything other than exactly one
    /// updated row means someone else moved the marker.
    pub fn write_version(&self, version: &str, replaced: &str) -> Result<(), StoreError> {
        let affected = self
            .conn
            .execute(
                "UPDATE schema_version SET version_num=?1 WHERE version_num=?2",
                params![version, replaced],
            )
            .map_err(|err| StoreError::from(err).during("write schema version"))?;
        if affected != 1 {
            return Err(StoreError::VersionConflict {
                expected: replaced.to_string(),
                affected,
            });
        }
        Ok(())
    }
}
