//! Per-pass execution context.
//!
//! Each reconciliation pass gets its own `PassContext`: a child of the
//! controller's shutdown token plus a deadline. The pass holds a drop guard
//! for the context, so the token is cancelled on every exit path.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Cancellation signal and deadline bounding a single reconciliation pass
#[derive(Debug, Clone)]
pub struct PassContext {
    token: CancellationToken,
    deadline: Instant,
}

impl PassContext {
    /// Derive a context from `parent` that also expires after `timeout`.
    pub fn with_timeout(parent: &CancellationToken, timeout: Duration) -> Self {
        Self {
            token: parent.child_token(),
            deadline: Instant::now() + timeout,
        }
    }

    /// True once the context was cancelled or its deadline passed.
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Resolves when the context is cancelled or expires.
    pub async fn done(&self) {
        tokio::select! {
            () = self.token.cancelled() => {}
            () = tokio::time::sleep_until(self.deadline) => {}
        }
    }

    /// Run `fut` until it completes or the context ends, whichever comes first.
    ///
    /// Returns `None` when the context ended first; `fut` is dropped in that case.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            () = self.done() => None,
            out = fut => Some(out),
        }
    }

    /// Guard that cancels the context when dropped.
    pub fn drop_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    /// Time left before the deadline.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}
