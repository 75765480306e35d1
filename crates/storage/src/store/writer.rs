#![forbid(unsafe_code)]

use super::revisions::allocate_revision_tx;
use super::tuples::check_preconditions_tx;
use super::{Cx, SqliteStore, StoreError};
use rusqlite::Transaction;
use tracing::warn;
use tv_core::{Precondition, Revision};

impl SqliteStore {
    /// Runs one write transaction: preconditions at head, a fresh commit
    /// revision, `apply`, commit. Any error or cancellation before commit
    /// drops the transaction, which rolls everything back.
    pub(in crate::store) fn write_with<T>(
        &mut self,
        cx: &Cx,
        op: &'static str,
        preconditions: &[Precondition],
        apply: impl FnOnce(&Transaction<'_>, Revision) -> Result<T, StoreError>,
    ) -> Result<(Revision, T), StoreError> {
        let phase = self.config.migration_phase;
        let _interrupts = self.interruptible(cx);
        let result = (|| -> Result<(Revision, T), StoreError> {
            cx.checkpoint()?;
            let tx = self.begin_write(cx)?;

            cx.checkpoint()?;
            if let Err(err) = check_preconditions_tx(&tx, phase, preconditions) {
                if let StoreError::PreconditionFailed(detail) = &err {
                    warn!(op, precondition = %detail, "write precondition failed");
                }
                return Err(err);
            }

            cx.checkpoint()?;
            let revision = allocate_revision_tx(&tx, self.clock.now_ms())?;
            let out = apply(&tx, revision)?;

            cx.checkpoint()?;
            tx.commit()?;
            Ok((revision, out))
        })();
        result.map_err(|err| cx.attribute(err).during(op))
    }
}
