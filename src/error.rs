//! Error taxonomy for pool operations.

use thiserror::Error;

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by [`crate::pool::GenericObjectPool`] and
/// [`crate::keyed_pool::KeyedObjectPool`].
#[derive(Error, Debug)]
pub enum Error {
    /// The pool (or sub-pool) has been closed.
    #[error("pool is closed")]
    PoolClosed,

    /// No capacity was available and the wait deadline elapsed.
    #[error("pool exhausted: {active}/{max_total} active, {waiters} waiting")]
    PoolExhausted {
        /// Number of currently active (borrowed) objects.
        active: usize,
        /// Configured `maxTotal`, or `usize::MAX` when unbounded.
        max_total: usize,
        /// Number of other borrowers waiting at the time of failure.
        waiters: usize,
    },

    /// The calling task was cancelled while waiting to borrow.
    #[error("borrow cancelled while waiting")]
    Cancelled,

    /// `factory.create` failed, or returned in a way forbidden by the
    /// factory contract (a null/empty object is always a creation error).
    #[error("object creation failed: {0}")]
    FactoryCreateFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Consecutive validation failures during borrow reached the
    /// `(maxTotal * 2) + 1` ceiling.
    #[error("object failed validation repeatedly on borrow")]
    ValidationFailed,

    /// `return`/`invalidate` was called with an object the pool does not
    /// track.
    #[error("object is not tracked by this pool")]
    UnknownObject,

    /// API misuse: e.g. returning an object that is not in the `Allocated`
    /// state (other than the permitted `Abandoned` case).
    #[error("illegal state: {0}")]
    IllegalState(String),
}

impl Error {
    /// Whether retrying the failed operation might succeed without any
    /// other state change (used by callers implementing their own backoff).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PoolExhausted { .. } | Self::ValidationFailed | Self::Cancelled
        )
    }
}
