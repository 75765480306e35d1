#![forbid(unsafe_code)]

use super::super::StoreError;
use super::rows::{insert_versioned_row_tx, soft_delete_where_tx};
use super::versioning::{append_visible_clause, read_columns};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, Transaction, params_from_iter};
use tracing::warn;
use tv_core::{Definition, MigrationPhase, Revision};

/// Versioned table holding `(name, blob)` definitions.
#[derive(Clone, Copy, Debug)]
pub(in crate::store) struct DefinitionTable {
    pub(in crate::store) table: &'static str,
    pub(in crate::store) name_column: &'static str,
    pub(in crate::store) body_column: &'static str,
}

pub(in crate::store) const CAVEAT_TABLE: DefinitionTable = DefinitionTable {
    table: "caveat",
    name_column: "name",
    body_column: "definition",
};

pub(in crate::store) const NAMESPACE_TABLE: DefinitionTable = DefinitionTable {
    table: "namespace_config",
    name_column: "namespace",
    body_column: "serialized_config",
};

/// The definition visible at `revision` plus the revision that wrote it.
pub(in crate::store) fn read_definition_tx<D: Definition>(
    conn: &Connection,
    table: DefinitionTable,
    phase: MigrationPhase,
    revision: Revision,
    name: &str,
) -> Result<Option<(D, Revision)>, StoreError> {
    let created = read_columns(phase).created;
    let mut sql = format!(
        "SELECT {}, {created} FROM {} WHERE ",
        table.body_column, table.table
    );
    let mut params = Vec::new();
    append_visible_clause(&mut sql, &mut params, phase, revision);
    sql.push_str(&format!(" AND {} = ?", table.name_column));
    params.push(SqlValue::Text(name.to_string()));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let bytes: Vec<u8> = row.get(0)?;
    let created_at: i64 = row.get(1)?;
    let definition = decode_row::<D>(name, &bytes)?;
    Ok(Some((definition, Revision::new(created_at))))
}

/// Definitions visible at `revision`, ordered by name; empty `names` means all.
pub(in crate::store) fn list_definitions_tx<D: Definition>(
    conn: &Connection,
    table: DefinitionTable,
    phase: MigrationPhase,
    revision: Revision,
    names: &[&str],
) -> Result<Vec<D>, StoreError> {
    let mut sql = format!(
        "SELECT {}, {} FROM {} WHERE ",
        table.name_column, table.body_column, table.table
    );
    let mut params = Vec::new();
    append_visible_clause(&mut sql, &mut params, phase, revision);
    append_name_list(&mut sql, &mut params, table, names);
    sql.push_str(&format!(" ORDER BY {} ASC", table.name_column));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(0)?;
        let bytes: Vec<u8> = row.get(1)?;
        out.push(decode_row::<D>(&name, &bytes)?);
    }
    Ok(out)
}

/// Supersedes any live row per name, then inserts the new bodies.
pub(in crate::store) fn write_definitions_tx<D: Definition>(
    tx: &Transaction<'_>,
    table: DefinitionTable,
    phase: MigrationPhase,
    revision: Revision,
    definitions: &[D],
) -> Result<(), StoreError> {
    let names: Vec<&str> = definitions.iter().map(|def| def.name()).collect();
    delete_definitions_tx(tx, table, phase, revision, &names)?;
    for definition in definitions {
        let bytes = definition
            .encode()
            .map_err(|err| StoreError::InvalidInput(format!("{} `{}`: {err}", D::KIND, definition.name())))?;
        insert_versioned_row_tx(
            tx,
            table.table,
            &[
                (table.name_column, SqlValue::Text(definition.name().to_string())),
                (table.body_column, SqlValue::Blob(bytes)),
            ],
            phase,
            revision,
        )?;
    }
    Ok(())
}

/// Soft-deletes live rows for `names`; absent names are ignored.
pub(in crate::store) fn delete_definitions_tx(
    tx: &Transaction<'_>,
    table: DefinitionTable,
    phase: MigrationPhase,
    revision: Revision,
    names: &[&str],
) -> Result<usize, StoreError> {
    if names.is_empty() {
        return Ok(0);
    }
    let mut where_sql = String::new();
    let mut where_params = Vec::with_capacity(names.len());
    append_name_list(&mut where_sql, &mut where_params, table, names);
    Ok(soft_delete_where_tx(
        tx,
        table.table,
        &where_sql,
        where_params,
        phase,
        revision,
    )?)
}

fn append_name_list(
    sql: &mut String,
    params: &mut Vec<SqlValue>,
    table: DefinitionTable,
    names: &[&str],
) {
    if names.is_empty() {
        return;
    }
    sql.push_str(" AND ");
    sql.push_str(table.name_column);
    sql.push_str(" IN (");
    for (index, name) in names.iter().enumerate() {
        if index > 0 {
            sql.push_str(", ");
        }
        sql.push('?');
        params.push(SqlValue::Text((*name).to_string()));
    }
    sql.push(')');
}

fn decode_row<D: Definition>(name: &str, bytes: &[u8]) -> Result<D, StoreError> {
    D::decode(bytes).map_err(|source| {
        warn!(kind = D::KIND, name, error = %source, "stored definition does not decode");
        StoreError::CorruptDefinition {
            kind: D::KIND,
            name: name.to_string(),
            source,
        }
    })
}
