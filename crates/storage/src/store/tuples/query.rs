#![forbid(unsafe_code)]

use super::super::revisions::check_revision_tx;
use super::super::support::{TUPLE_COLUMNS, append_filter_clauses, append_visible_clause};
use super::super::{Cx, SqliteStore, StoreError};
use super::TUPLE_TABLE;
use super::iterator::TupleIterator;
use tracing::debug;
use tv_core::{ObjectAndRelation, Revision, TupleFilter};

/// Tuple query pinned to one namespace and one revision.
///
/// Builder methods return new values, so a base query can be branched into
/// variants without affecting each other.
#[derive(Clone, Debug)]
pub struct TupleQuery<'s> {
    store: &'s SqliteStore,
    filter: TupleFilter,
    revision: Revision,
}

impl SqliteStore {
    pub fn query_tuples(&self, namespace: impl Into<String>, revision: Revision) -> TupleQuery<'_> {
        TupleQuery {
            store: self,
            filter: TupleFilter::new(namespace),
            revision,
        }
    }
}

impl<'s> TupleQuery<'s> {
    pub fn with_object_id(&self, object_id: impl Into<String>) -> Self {
        self.with_filter(self.filter.with_object_id(object_id))
    }

    pub fn with_relation(&self, relation: impl Into<String>) -> Self {
        self.with_filter(self.filter.with_relation(relation))
    }

    pub fn with_userset(&self, userset: ObjectAndRelation) -> Self {
        self.with_filter(self.filter.with_userset(userset))
    }

    pub fn filter(&self) -> &TupleFilter {
        &self.filter
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Validates the revision and opens a read scope that the returned
    /// iterator keeps until it is exhausted, closed or dropped.
    pub fn execute(&self, cx: &Cx) -> Result<TupleIterator<'s>, StoreError> {
        cx.checkpoint()?;
        let store = self.store;
        let scope = store.read_scope()?;
        check_revision_tx(&scope, self.revision, store.now_ms(), store.gc_window_ms())
            .map_err(|err| err.during("query tuples"))?;

        let mut sql = format!("SELECT id, {TUPLE_COLUMNS} FROM {TUPLE_TABLE} WHERE ");
        let mut params = Vec::new();
        append_visible_clause(
            &mut sql,
            &mut params,
            store.config.migration_phase,
            self.revision,
        );
        append_filter_clauses(&mut sql, &mut params, &self.filter);
        sql.push_str(" AND id > ? ORDER BY id LIMIT ?");

        debug!(revision = %self.revision, filter = %self.filter, "executing tuple query");
        TupleIterator::new(store, scope, cx.clone(), self.revision, sql, params)
            .map_err(|err| err.during("query tuples"))
    }

    fn with_filter(&self, filter: TupleFilter) -> Self {
        Self {
            store: self.store,
            filter,
            revision: self.revision,
        }
    }
}
