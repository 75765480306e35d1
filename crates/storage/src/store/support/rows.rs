#![forbid(unsafe_code)]

use super::versioning::{LIVE_SENTINEL, append_live_clause, written_columns};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Transaction, params_from_iter};
use tv_core::{MigrationPhase, Revision};

/// Inserts a row created at `revision`, stamping every column pair the phase
/// writes. Returns the new rowid.
pub(in crate::store) fn insert_versioned_row_tx(
    tx: &Transaction<'_>,
    table: &str,
    values: &[(&'static str, SqlValue)],
    phase: MigrationPhase,
    revision: Revision,
) -> rusqlite::Result<i64> {
    let mut columns: Vec<&str> = values.iter().map(|(column, _)| *column).collect();
    let mut params: Vec<SqlValue> = values.iter().map(|(_, value)| value.clone()).collect();
    for pair in written_columns(phase) {
        columns.push(pair.created);
        columns.push(pair.deleted);
        params.push(SqlValue::Integer(revision.as_i64()));
        params.push(SqlValue::Integer(LIVE_SENTINEL));
    }
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {table}({}) VALUES ({placeholders})",
        columns.join(", ")
    );
    tx.execute(&sql, params_from_iter(params.iter()))?;
    Ok(tx.last_insert_rowid())
}

/// Soft-deletes the live row(s) whose key columns equal `key`.
pub(in crate::store) fn soft_delete_by_key_tx(
    tx: &Transaction<'_>,
    table: &str,
    key: &[(&'static str, SqlValue)],
    phase: MigrationPhase,
    revision: Revision,
) -> rusqlite::Result<usize> {
    let mut where_sql = String::new();
    let mut where_params = Vec::with_capacity(key.len());
    for (column, value) in key {
        where_sql.push_str(" AND ");
        where_sql.push_str(column);
        where_sql.push_str(" = ?");
        where_params.push(value.clone());
    }
    soft_delete_where_tx(tx, table, &where_sql, where_params, phase, revision)
}

/// Soft-deletes live rows matching `where_sql`, which must start with ` AND`.
/// Deleting nothing is not an error.
pub(in crate::store) fn soft_delete_where_tx(
    tx: &Transaction<'_>,
    table: &str,
    where_sql: &str,
    where_params: Vec<SqlValue>,
    phase: MigrationPhase,
    revision: Revision,
) -> rusqlite::Result<usize> {
    let mut sql = format!("UPDATE {table} SET ");
    let mut params = Vec::with_capacity(where_params.len() + 3);
    for (index, pair) in written_columns(phase).into_iter().enumerate() {
        if index > 0 {
            sql.push_str(", ");
        }
        sql.push_str(pair.deleted);
        sql.push_str(" = ?");
        params.push(SqlValue::Integer(revision.as_i64()));
    }
    sql.push_str(" WHERE ");
    append_live_clause(&mut sql, &mut params, phase);
    sql.push_str(where_sql);
    params.extend(where_params);
    tx.execute(&sql, params_from_iter(params.iter()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{Connection, params};

    fn scratch() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch(
            "CREATE TABLE item (
               id INTEGER PRIMARY KEY AUTOINCREMENT,
               name TEXT NOT NULL,
               created_transaction INTEGER,
               deleted_transaction INTEGER,
               created_xid INTEGER,
               deleted_xid INTEGER
             );",
        )
        .expect("create scratch table");
        conn
    }

    fn markers(conn: &Connection, id: i64) -> (Option<i64>, Option<i64>, Option<i64>, Option<i64>) {
        conn.query_row(
            "SELECT created_transaction, deleted_transaction, created_xid, deleted_xid \
             FROM item WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .expect("read markers")
    }

    #[test]
    fn each_phase_stamps_its_columns() {
        let mut conn = scratch();
        let key = [("name", SqlValue::Text("a".to_string()))];
        let cases = [
            (MigrationPhase::LegacyOnly, (Some(1), Some(2), None, None)),
            (
                MigrationPhase::WriteBothReadLegacy,
                (Some(1), Some(2), Some(1), Some(2)),
            ),
            (
                MigrationPhase::WriteBothReadNew,
                (Some(1), Some(2), Some(1), Some(2)),
            ),
            (MigrationPhase::NewOnly, (None, None, Some(1), Some(2))),
        ];
        for (phase, expected) in cases {
            let tx = conn.transaction().expect("tx");
            tx.execute("DELETE FROM item", []).expect("reset");
            let id = insert_versioned_row_tx(&tx, "item", &key, phase, Revision::new(1))
                .expect("insert");
            let deleted = soft_delete_by_key_tx(&tx, "item", &key, phase, Revision::new(2))
                .expect("soft delete");
            assert_eq!(deleted, 1, "{phase}");
            tx.commit().expect("commit");
            assert_eq!(markers(&conn, id), expected, "{phase}");
        }
    }

    #[test]
    fn soft_delete_skips_already_deleted_rows() {
        let mut conn = scratch();
        let key = [("name", SqlValue::Text("a".to_string()))];
        let phase = MigrationPhase::NewOnly;
        let tx = conn.transaction().expect("tx");
        let id = insert_versioned_row_tx(&tx, "item", &key, phase, Revision::new(1))
            .expect("insert");
        assert_eq!(
            soft_delete_by_key_tx(&tx, "item", &key, phase, Revision::new(2)).expect("first"),
            1
        );
        assert_eq!(
            soft_delete_by_key_tx(&tx, "item", &key, phase, Revision::new(3)).expect("second"),
            0
        );
        tx.commit().expect("commit");
        assert_eq!(markers(&conn, id).3, Some(2));
    }
}
