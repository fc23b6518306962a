//! Shared cancellation flag for pipeline runs.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct Inner {
    requested: AtomicBool,
    request: Mutex<Option<CancelRequest>>,
}

/// Why and when a run was asked to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelRequest {
    /// Caller-supplied reason.
    pub reason: String,
    /// When the request was made.
    pub requested_at: DateTime<Utc>,
}

/// A handle a caller flips to ask a running pipeline to stop advancing.
///
/// Clones share the same flag, so one clone can be handed to the
/// orchestrator and another kept by whoever decides to stop the run.
/// Only the first request is kept.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the run to stop before its next stage.
    ///
    /// Returns false if the token was already cancelled.
    pub fn cancel(&self, reason: impl Into<String>) -> bool {
        if self
            .inner
            .requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        let request = CancelRequest {
            reason: reason.into(),
            requested_at: Utc::now(),
        };
        debug!(reason = %request.reason, "Cancellation requested");
        *self.inner.request.lock() = Some(request);
        true
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Returns the reason given to the first `cancel` call.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.inner
            .request
            .lock()
            .as_ref()
            .map(|request| request.reason.clone())
    }

    /// Returns the full cancellation request, if any.
    #[must_use]
    pub fn request(&self) -> Option<CancelRequest> {
        self.inner.request.lock().clone()
    }
}
