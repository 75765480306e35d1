#![forbid(unsafe_code)]

use rusqlite::types::Value as SqlValue;
use tv_core::{MigrationPhase, Revision};

/// `deleted_*` value of a row that has not been deleted.
pub(in crate::store) const LIVE_SENTINEL: i64 = i64::MAX;

/// One physical encoding of the created/deleted markers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::store) struct VersionColumns {
    pub(in crate::store) created: &'static str,
    pub(in crate::store) deleted: &'static str,
}

pub(in crate::store) const LEGACY_COLUMNS: VersionColumns = VersionColumns {
    created: "created_transaction",
    deleted: "deleted_transaction",
};

pub(in crate::store) const XID_COLUMNS: VersionColumns = VersionColumns {
    created: "created_xid",
    deleted: "deleted_xid",
};

/// Columns that decide visibility for reads in this phase.
pub(in crate::store) fn read_columns(phase: MigrationPhase) -> VersionColumns {
    if phase.reads_new() {
        XID_COLUMNS
    } else {
        LEGACY_COLUMNS
    }
}

/// Every column pair an insert or soft-delete must stamp in this phase.
pub(in crate::store) fn written_columns(phase: MigrationPhase) -> Vec<VersionColumns> {
    let mut out = Vec::with_capacity(2);
    if phase.writes_legacy() {
        out.push(LEGACY_COLUMNS);
    }
    if phase.writes_new() {
        out.push(XID_COLUMNS);
    }
    out
}

/// `created <= R AND deleted > R` on the phase's read columns.
pub(in crate::store) fn append_visible_clause(
    sql: &mut String,
    params: &mut Vec<SqlValue>,
    phase: MigrationPhase,
    revision: Revision,
) {
    let columns = read_columns(phase);
    sql.push_str(columns.created);
    sql.push_str(" <= ? AND ");
    sql.push_str(columns.deleted);
    sql.push_str(" > ?");
    params.push(SqlValue::Integer(revision.as_i64()));
    params.push(SqlValue::Integer(revision.as_i64()));
}

/// Rows not yet soft-deleted according to the phase's read columns.
pub(in crate::store) fn append_live_clause(
    sql: &mut String,
    params: &mut Vec<SqlValue>,
    phase: MigrationPhase,
) {
    sql.push_str(read_columns(phase).deleted);
    sql.push_str(" = ?");
    params.push(SqlValue::Integer(LIVE_SENTINEL));
}
