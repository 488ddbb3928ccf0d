//! Cooperative cancellation.
//!
//! A [`CancelToken`] is polled at the top of every evaluation step. It trips
//! when another thread (typically a Ctrl-C handler) calls [`CancelToken::cancel`]
//! or when its deadline passes. A native builtin that is already running is
//! never interrupted; the next step observes the token.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::Error;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Token that only trips when cancelled explicitly
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Token that also trips once `deadline` has passed
    pub fn with_deadline(deadline: Instant) -> Self {
        CancelToken {
            flag: Arc::default(),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Request cancellation. Clones of this token observe it too.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Re-arm the token after a cancelled evaluation
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// `Interrupt` wins over `Timeout` when both apply
    pub fn check(&self) -> Result<(), Error> {
        if self.is_cancelled() {
            tracing::debug!("evaluation interrupted");
            return Err(Error::Interrupt);
        }
        if self.deadline_passed() {
            tracing::debug!("evaluation deadline exceeded");
            return Err(Error::Timeout);
        }
        Ok(())
    }
}
