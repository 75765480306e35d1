#![forbid(unsafe_code)]

use super::super::{Cx, StoreError};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::{Duration, Instant};
use tracing::debug;

/// Virtual machine steps between cancellation polls.
const PROGRESS_STEPS: i32 = 1_000;
/// Longest single busy wait while queueing for the write lock.
const LOCK_POLL: Duration = Duration::from_millis(20);

/// Lets `cx` interrupt whatever runs on `conn` until the guard drops.
/// An interrupted statement fails with [`super::super::StorageKind::Interrupted`];
/// [`Cx::attribute`] turns that back into the cancellation reason.
pub(in crate::store) struct InterruptGuard<'c> {
    conn: &'c Connection,
}

impl<'c> InterruptGuard<'c> {
    pub(in crate::store) fn install(conn: &'c Connection, cx: &Cx) -> Self {
        let cx = cx.clone();
        conn.progress_handler(PROGRESS_STEPS, Some(move || cx.checkpoint().is_err()));
        Self { conn }
    }
}

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

/// Opens an `IMMEDIATE` transaction, waiting at most `budget` for the write
/// lock. The wait is sliced so cancellation and the `cx` deadline cut it short.
pub(in crate::store) fn begin_immediate<'c>(
    conn: &'c Connection,
    cx: &Cx,
    budget: Duration,
) -> Result<Transaction<'c>, StoreError> {
    let acquired = acquire_write_lock(conn, cx, budget);
    conn.busy_timeout(budget)?;
    acquired
}

fn acquire_write_lock<'c>(
    conn: &'c Connection,
    cx: &Cx,
    budget: Duration,
) -> Result<Transaction<'c>, StoreError> {
    let started = Instant::now();
    let mut attempts = 0u32;
    loop {
        cx.checkpoint()?;
        let mut wait = budget.saturating_sub(started.elapsed()).min(LOCK_POLL);
        if let Some(deadline) = cx.deadline() {
            wait = wait.min(deadline.saturating_duration_since(Instant::now()));
        }
        conn.busy_timeout(wait)?;

        match Transaction::new_unchecked(conn, TransactionBehavior::Immediate) {
            Ok(tx) => {
                if attempts > 0 {
                    let waited_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                    debug!(attempts, waited_ms, "write lock acquired after waiting");
                }
                return Ok(tx);
            }
            Err(err) => {
                let err = StoreError::from(err);
                if !err.is_transient() || started.elapsed() >= budget {
                    return Err(err);
                }
                attempts += 1;
            }
        }
    }
}
