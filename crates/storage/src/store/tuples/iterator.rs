#![forbid(unsafe_code)]

use super::super::revisions::check_revision_tx;
use super::super::support::{InterruptGuard, ReadScope, tuple_from_row};
use super::super::{Cx, SqliteStore, StoreError};
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use std::collections::VecDeque;
use tracing::debug;
use tv_core::{RelationTuple, Revision};

/// Streaming result of [`super::TupleQuery::execute`].
///
/// Rows are fetched in id-ordered pages from the read scope opened by
/// `execute`. `next()` returning `None` means exhausted *or* failed; check
/// [`TupleIterator::err`] afterwards. The scope is released on exhaustion,
/// on error, on [`TupleIterator::close`] and on drop.
///
/// An iterator that joined another iterator's snapshot keeps paging after that
/// one closes. If other connections committed in between, the revision is
/// checked again first, so a garbage-collected revision fails with
/// [`StoreError::InvalidRevision`] instead of returning partial results.
pub struct TupleIterator<'s> {
    store: &'s SqliteStore,
    scope: Option<ReadScope<'s>>,
    cx: Cx,
    revision: Revision,
    /// `PRAGMA data_version` of the snapshot pages are read from.
    data_version: i64,
    sql: String,
    params: Vec<SqlValue>,
    page_size: usize,
    buffer: VecDeque<RelationTuple>,
    last_id: i64,
    exhausted: bool,
    err: Option<StoreError>,
}

impl<'s> TupleIterator<'s> {
    pub(in crate::store) fn new(
        store: &'s SqliteStore,
        scope: ReadScope<'s>,
        cx: Cx,
        revision: Revision,
        sql: String,
        params: Vec<SqlValue>,
    ) -> Result<Self, StoreError> {
        let data_version = scope.data_version()?;
        Ok(Self {
            store,
            scope: Some(scope),
            cx,
            revision,
            data_version,
            sql,
            params,
            page_size: store.config.query_page_size,
            buffer: VecDeque::new(),
            last_id: 0,
            exhausted: false,
            err: None,
        })
    }

    pub fn err(&self) -> Option<&StoreError> {
        self.err.as_ref()
    }

    pub fn take_err(&mut self) -> Option<StoreError> {
        self.err.take()
    }

    pub fn is_closed(&self) -> bool {
        self.scope.is_none()
    }

    /// Releases the read scope. Safe to call any number of times.
    pub fn close(&mut self) -> Result<(), StoreError> {
        self.buffer.clear();
        self.exhausted = true;
        self.release()
    }

    /// Drains the iterator, surfacing any iteration error.
    pub fn collect_tuples(mut self) -> Result<Vec<RelationTuple>, StoreError> {
        let mut out = Vec::new();
        for tuple in self.by_ref() {
            out.push(tuple);
        }
        if let Some(err) = self.err.take() {
            return Err(err);
        }
        self.close()?;
        Ok(out)
    }

    fn release(&mut self) -> Result<(), StoreError> {
        match self.scope.take() {
            Some(scope) => scope
                .finish()
                .map_err(|err| StoreError::from(err).during("close tuple iterator")),
            None => Ok(()),
        }
    }

    /// Keeps a joined iterator on data that still holds everything visible at
    /// its revision.
    fn confirm_snapshot(&mut self) -> Result<(), StoreError> {
        let Some(current) = self.scope.as_ref() else {
            return Ok(());
        };
        let ReadScope::Joined(conn) = current else {
            return Ok(());
        };
        let conn = *conn;
        let scope = if current.is_orphaned() {
            ReadScope::begin(conn)?
        } else {
            ReadScope::Joined(conn)
        };
        let data_version = scope.data_version()?;
        if data_version != self.data_version {
            check_revision_tx(
                &scope,
                self.revision,
                self.store.now_ms(),
                self.store.gc_window_ms(),
            )?;
            debug!(revision = %self.revision, "tuple iterator moved to a newer snapshot");
            self.data_version = data_version;
        }
        self.scope = Some(scope);
        Ok(())
    }

    fn fetch_page(&mut self) -> Result<(), StoreError> {
        self.cx.checkpoint()?;
        self.confirm_snapshot()?;
        let Some(scope) = self.scope.as_ref() else {
            self.exhausted = true;
            return Ok(());
        };
        let _interrupts = InterruptGuard::install(scope, &self.cx);

        let mut params = self.params.clone();
        params.push(SqlValue::Integer(self.last_id));
        params.push(SqlValue::Integer(
            i64::try_from(self.page_size).unwrap_or(i64::MAX),
        ));

        let mut stmt = scope.prepare_cached(&self.sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut fetched = 0usize;
        while let Some(row) = rows.next()? {
            self.last_id = row.get(0)?;
            self.buffer.push_back(tuple_from_row(row, 1)?);
            fetched += 1;
        }
        if fetched < self.page_size {
            self.exhausted = true;
        }
        Ok(())
    }

    fn fail(&mut self, err: StoreError) {
        self.buffer.clear();
        self.exhausted = true;
        if self.err.is_none() {
            self.err = Some(self.cx.attribute(err).during("iterate tuples"));
        }
        let _ = self.release();
    }
}

impl Iterator for TupleIterator<'_> {
    type Item = RelationTuple;

    fn next(&mut self) -> Option<RelationTuple> {
        loop {
            if let Some(tuple) = self.buffer.pop_front() {
                return Some(tuple);
            }
            if self.exhausted || self.err.is_some() || self.scope.is_none() {
                if let Err(err) = self.release() {
                    self.fail(err);
                }
                return None;
            }
            if let Err(err) = self.fetch_page() {
                self.fail(err);
                return None;
            }
        }
    }
}

impl Drop for TupleIterator<'_> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
