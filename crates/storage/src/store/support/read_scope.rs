#![forbid(unsafe_code)]

use rusqlite::{Connection, Transaction};
use std::ops::Deref;

/// Read transaction scope.
///
/// SQLite has no nested `BEGIN`, so a read started while another scope is
/// open on the same connection (an unfinished iterator, say) joins that
/// scope's snapshot instead of opening its own. A joined scope does not keep
/// the outer one alive: once the owner finishes, the joined reader is back in
/// autocommit and must take a new snapshot ([`ReadScope::is_orphaned`]).
pub(in crate::store) enum ReadScope<'c> {
    Owned(Transaction<'c>),
    Joined(&'c Connection),
}

impl<'c> ReadScope<'c> {
    pub(in crate::store) fn begin(conn: &'c Connection) -> rusqlite::Result<Self> {
        if conn.is_autocommit() {
            Ok(Self::Owned(conn.unchecked_transaction()?))
        } else {
            Ok(Self::Joined(conn))
        }
    }

    /// Joined to a scope that has since finished.
    pub(in crate::store) fn is_orphaned(&self) -> bool {
        matches!(self, Self::Joined(conn) if conn.is_autocommit())
    }

    /// Changes whenever another connection commits; stable for the life of
    /// one snapshot.
    pub(in crate::store) fn data_version(&self) -> rusqlite::Result<i64> {
        self.query_row("PRAGMA data_version", [], |row| row.get(0))
    }

    /// Ends an owned scope; a joined scope leaves the outer one untouched.
    pub(in crate::store) fn finish(self) -> rusqlite::Result<()> {
        match self {
            Self::Owned(tx) => tx.commit(),
            Self::Joined(_) => Ok(()),
        }
    }
}

impl Deref for ReadScope<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        match self {
            Self::Owned(tx) => tx,
            Self::Joined(conn) => conn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_scope_joins_the_first() {
        let conn = Connection::open_in_memory().expect("open");
        let outer = ReadScope::begin(&conn).expect("outer");
        assert!(matches!(outer, ReadScope::Owned(_)));
        assert!(!conn.is_autocommit());

        let inner = ReadScope::begin(&conn).expect("inner");
        assert!(matches!(inner, ReadScope::Joined(_)));
        inner.finish().expect("finish inner");
        assert!(!conn.is_autocommit());

        outer.finish().expect("finish outer");
        assert!(conn.is_autocommit());
    }

    #[test]
    fn joined_scope_is_orphaned_when_the_owner_finishes() {
        let conn = Connection::open_in_memory().expect("open");
        let outer = ReadScope::begin(&conn).expect("outer");
        let inner = ReadScope::begin(&conn).expect("inner");
        assert!(!inner.is_orphaned());
        outer.finish().expect("finish outer");
        assert!(inner.is_orphaned());
    }
}
