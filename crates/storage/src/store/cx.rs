#![forbid(unsafe_code)]

use super::{StorageKind, StoreError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Cancellation context passed to every store operation.
///
/// Clones share the cancellation flag, so a request handler can hand one clone
/// to the store and cancel through another. Operations call [`Cx::checkpoint`]
/// before each statement, each result page and before commit, and SQLite polls
/// it while a statement runs or waits for the write lock. A failed checkpoint
/// drops the open transaction, which rolls it back.
#[derive(Clone, Debug, Default)]
pub struct Cx {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        };
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn checkpoint(&self) -> Result<(), StoreError> {
        if self.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if self
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
        {
            return Err(StoreError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Reports an interrupted statement as the reason this context fired.
    pub(crate) fn attribute(&self, err: StoreError) -> StoreError {
        if err.storage_kind() == Some(StorageKind::Interrupted) {
            if let Err(reason) = self.checkpoint() {
                return reason;
            }
        }
        err
    }
}
