#![forbid(unsafe_code)]

use super::revisions::{check_revision_tx, head_revision_tx};
use super::support::ReadScope;
use super::{Cx, SqliteStore, StoreError, TupleQuery};
use tv_core::Revision;

/// Reads pinned to one validated revision.
#[derive(Clone, Copy, Debug)]
pub struct SnapshotReader<'s> {
    pub(in crate::store) store: &'s SqliteStore,
    pub(in crate::store) revision: Revision,
}

impl SqliteStore {
    /// Fails with `InvalidRevision` unless `revision` is currently readable.
    pub fn snapshot_reader(&self, cx: &Cx, revision: Revision) -> Result<SnapshotReader<'_>, StoreError> {
        self.check_revision(cx, revision)?;
        Ok(SnapshotReader {
            store: self,
            revision,
        })
    }

    /// Opens a read scope and resolves the revision to read at: the head when
    /// `pinned` is `None` (possibly `Revision::NONE`), otherwise the checked
    /// pinned revision.
    pub(in crate::store) fn begin_read(
        &self,
        cx: &Cx,
        pinned: Option<Revision>,
    ) -> Result<(ReadScope<'_>, Revision), StoreError> {
        cx.checkpoint()?;
        let scope = self.read_scope()?;
        let revision = match pinned {
            Some(revision) => {
                check_revision_tx(&scope, revision, self.now_ms(), self.gc_window_ms())?;
                revision
            }
            None => head_revision_tx(&scope)?,
        };
        Ok((scope, revision))
    }
}

impl<'s> SnapshotReader<'s> {
    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn query_tuples(&self, namespace: impl Into<String>) -> TupleQuery<'s> {
        self.store.query_tuples(namespace, self.revision)
    }
}
