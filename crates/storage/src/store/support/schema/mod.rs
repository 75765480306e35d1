#![forbid(unsafe_code)]

mod migrations;
mod sql;

use super::super::StoreError;
use rusqlite::Connection;

pub(in crate::store) use migrations::{HEAD_VERSION, is_known_version};

pub(in crate::store) fn migrate_sqlite_schema(conn: &mut Connection) -> Result<(), StoreError> {
    migrations::apply(conn)
}
