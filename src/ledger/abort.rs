//! Caller-controlled cancellation for ledger mutations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{LedgerError, LedgerResult};

/// A cancellation flag plus an optional deadline.
///
/// Checked before a mutation starts and again right before it commits; a
/// tripped check rolls the mutation back.
#[derive(Debug, Clone, Default)]
pub struct Abort {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Abort {
    /// Never aborts unless [`Abort::cancel`] is called.
    pub fn none() -> Self {
        Self::default()
    }

    /// Abort once `timeout` has elapsed from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::default(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Cancel every operation sharing this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> LedgerResult<()> {
        if self.is_cancelled() {
            return Err(LedgerError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(LedgerError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
