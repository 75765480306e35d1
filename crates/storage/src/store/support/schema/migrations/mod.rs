#![forbid(unsafe_code)]

mod util;

use super::super::super::{MigrationDriver, StoreError};
use super::sql::{VERSIONED_TABLES, initial_schema_sql, xid_indexes_sql};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};
use util::ensure_column;

struct Migration {
    version: &'static str,
    replaces: &'static str,
    apply: fn(&Transaction<'_>) -> Result<(), StoreError>,
}

const MIGRATIONS: [Migration; 2] = [
    Migration {
        version: "initial",
        replaces: "",
        apply: apply_initial,
    },
    Migration {
        version: "add-xid-columns",
        replaces: "initial",
        apply: apply_xid_columns,
    },
];

pub(in crate::store) const HEAD_VERSION: &str = "add-xid-columns";

/// `""` (nothing applied) or the version of any migration this build knows.
pub(in crate::store) fn is_known_version(version: &str) -> bool {
    version.is_empty()
        || MIGRATIONS
            .iter()
            .any(|migration| migration.version == version)
}

/// Applies every pending migration, one transaction each. Concurrent openers
/// serialize on the write lock; whoever loses sees the advanced marker and
/// skips.
pub(super) fn apply(conn: &mut Connection) -> Result<(), StoreError> {
    for migration in &MIGRATIONS {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let driver = MigrationDriver::new(&tx);
        let current = driver.read_current_version()?;
        if current != migration.replaces {
            debug!(version = migration.version, current = %current, "schema migration not pending");
            continue;
        }
        (migration.apply)(&tx)?;
        driver.write_version(migration.version, migration.replaces)?;
        tx.commit()?;
        info!(
            version = migration.version,
            replaces = migration.replaces,
            "applied schema migration"
        );
    }
    Ok(())
}

fn apply_initial(tx: &Transaction<'_>) -> Result<(), StoreError> {
    tx.execute_batch(&initial_schema_sql())
        .map_err(|err| StoreError::from(err).during("initial schema"))
}

fn apply_xid_columns(tx: &Transaction<'_>) -> Result<(), StoreError> {
    for table in VERSIONED_TABLES {
        for column in ["created_xid", "deleted_xid"] {
            if ensure_column(tx, table, column, "INTEGER")? {
                debug!(table, column, "added xid column");
            }
        }
    }
    tx.execute_batch(xid_indexes_sql())
        .map_err(|err| StoreError::from(err).during("xid indexes"))
}
