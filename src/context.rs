//! Borrow-time context: cooperative cancellation and caller metadata.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

/// Context passed to [`GenericObjectPool::borrow`](crate::pool::GenericObjectPool::borrow).
///
/// Carries a cancellation token so a waiting borrower can be woken and
/// unwound without leaking capacity or counters: an interrupted waiter
/// wakes and propagates a [`crate::error::Error::Cancelled`] without
/// leaving its reservation behind.
#[derive(Clone)]
pub struct BorrowContext {
    /// Cooperative cancellation; checked while waiting for a permit or an
    /// idle instance.
    pub cancellation: CancellationToken,
    /// Arbitrary key-value pairs a factory may inspect during `create`.
    pub metadata: HashMap<String, String>,
}

impl std::fmt::Debug for BorrowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BorrowContext")
            .field("cancellation", &self.cancellation)
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl Default for BorrowContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BorrowContext {
    /// Create a fresh context with its own cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata key-value pair.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Use the given cancellation token instead of a freshly created one.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}
