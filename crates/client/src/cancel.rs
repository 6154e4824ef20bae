//! Cooperative cancellation for async flows.
//!
//! A [`CancelToken`] is handed to every flow by its caller. When the caller
//! goes away (a screen is closed, the CLI gets Ctrl-C) it cancels the token;
//! read flows then drop their results and write flows stop before touching
//! the backend.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::Notify;

/// The flow was cancelled by its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Shared cancellation flag.
///
/// Cloning is cheap; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    /// Create a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the token and wake everything waiting on it.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with [`Cancelled`] if the token has been cancelled.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` once the token is cancelled.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolve once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Run `fut` unless the token is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` if the token fires before `fut` completes. The
    /// future is dropped in that case.
    pub async fn run_until_cancelled<F>(&self, fut: F) -> Result<F::Output, Cancelled>
    where
        F: Future,
    {
        self.check()?;
        tokio::select! {
            biased;
            () = self.cancelled() => Err(Cancelled),
            output = fut => Ok(output),
        }
    }
}
