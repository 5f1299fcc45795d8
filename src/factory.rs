//! The factory contract: the pool's sole external collaborator.

use async_trait::async_trait;

use crate::error::Result;

/// Error from [`PooledObjectFactory::create`] or
/// [`KeyedPooledObjectFactory::create`].
///
/// Opaque on purpose: a factory has no business constructing the pool's own
/// [`crate::error::Error`] (a rogue factory could otherwise report a forced
/// failure as `Error::IllegalState`, a variant reserved for API misuse). The
/// pool wraps whatever a factory returns here into
/// `Error::FactoryCreateFailed` at the call site.
pub type CreateError = Box<dyn std::error::Error + Send + Sync>;

/// Why a factory is being asked to destroy an instance.
///
/// Passed to [`PooledObjectFactory::destroy`] so factories that want to
/// distinguish routine recycling from failure paths can do so (e.g. to
/// avoid emitting a warning log for an ordinary over-capacity destroy).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyReason {
    /// An abandoned object was reclaimed by the sweeper.
    Abandoned,
    /// `clear()` removed an idle instance.
    Clear,
    /// `close()` drained the pool.
    Close,
    /// The evictor destroyed an idle instance (age or failed `testWhileIdle`).
    EvictorFailure,
    /// `factory.passivate` failed on return.
    PassivationFailure,
    /// `factory.validate` failed on return (`testOnReturn`).
    ReturnValidationFailure,
    /// `factory.validate` failed on borrow (`testOnBorrow`).
    BorrowValidationFailure,
    /// The pool was already at `maxIdle` when the object was returned.
    OverCapacity,
    /// `invalidate()` was called explicitly.
    Invalidated,
}

impl std::fmt::Display for DestroyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Abandoned => "abandoned",
            Self::Clear => "clear",
            Self::Close => "close",
            Self::EvictorFailure => "evictor-failure",
            Self::PassivationFailure => "passivation-failure",
            Self::ReturnValidationFailure => "return-validation-failure",
            Self::BorrowValidationFailure => "borrow-validation-failure",
            Self::OverCapacity => "over-capacity",
            Self::Invalidated => "invalidated",
        };
        f.write_str(s)
    }
}

/// User-supplied object lifecycle.
///
/// Every method has a safe default except `create`: only `create` is
/// mandatory, the rest are opt-in hooks. `validate` must never be allowed
/// to panic the caller's task; a factory that might panic internally
/// should catch it itself, but if `validate` genuinely cannot decide,
/// returning `false` is the conservative choice — a factory has no way to
/// return an `Err` from `validate` at all, by design, so there is no
/// error path to reconcile here.
#[async_trait]
pub trait PooledObjectFactory<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    /// Produce a new underlying value. A factory must never return a
    /// value that the caller would treat as "absent" — there is no sense
    /// of null in this trait signature, so that failure mode is ruled out
    /// by construction; factories that previously might have returned a
    /// sentinel should return `Err` instead.
    async fn create(&self) -> std::result::Result<T, CreateError>;

    /// Prepare `instance` for a borrow. Default: no-op.
    async fn activate(&self, _instance: &mut T) -> Result<()> {
        Ok(())
    }

    /// Check whether `instance` is still usable. Default: always valid.
    async fn validate(&self, _instance: &T) -> bool {
        true
    }

    /// Prepare `instance` for storage in the idle deque. Default: no-op.
    async fn passivate(&self, _instance: &mut T) -> Result<()> {
        Ok(())
    }

    /// Best-effort cleanup when `instance` is permanently removed. Errors
    /// are swallowed by the caller, logged, and only counted — destroy is
    /// never retried.
    async fn destroy(&self, _instance: T, _reason: DestroyReason) -> Result<()> {
        Ok(())
    }
}

/// The keyed counterpart of [`PooledObjectFactory`]: every lifecycle hook
/// is also handed the key, since what a connection (or other resource)
/// looks like typically depends on which key it was borrowed for.
#[async_trait]
pub trait KeyedPooledObjectFactory<K, T>: Send + Sync + 'static
where
    K: Send + Sync + 'static,
    T: Send + 'static,
{
    async fn create(&self, key: &K) -> std::result::Result<T, CreateError>;

    async fn activate(&self, _key: &K, _instance: &mut T) -> Result<()> {
        Ok(())
    }

    async fn validate(&self, _key: &K, _instance: &T) -> bool {
        true
    }

    async fn passivate(&self, _key: &K, _instance: &mut T) -> Result<()> {
        Ok(())
    }

    async fn destroy(&self, _key: &K, _instance: T, _reason: DestroyReason) -> Result<()> {
        Ok(())
    }
}
