//! The pooled-object wrapper and its state machine.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

/// States a [`PooledObject`] may be in. This enum only names the states;
/// the pool engines enforce the transitions between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ObjectState {
    /// Sitting in the idle deque, available to be borrowed.
    Idle = 0,
    /// Checked out to a borrower.
    Allocated = 1,
    /// The evictor has taken this wrapper out of the idle deque for
    /// examination.
    Evicting = 2,
    /// A concurrent borrow raced the evictor; the wrapper is being placed
    /// back at the head of the idle deque instead of being destroyed.
    EvictionReturnToHead = 3,
    /// `return()` is in progress (passivation/validation running).
    Returning = 4,
    /// Terminal: the wrapper has been destroyed and removed from the
    /// all-objects index.
    Invalid = 5,
    /// The sweeper has flagged this as abandoned; still occupies its
    /// capacity slot until reclaimed or returned.
    Abandoned = 6,
}

impl ObjectState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Allocated,
            2 => Self::Evicting,
            3 => Self::EvictionReturnToHead,
            4 => Self::Returning,
            5 => Self::Invalid,
            6 => Self::Abandoned,
            _ => unreachable!("invalid encoded ObjectState"),
        }
    }
}

/// An optional captured call-site, recorded only when abandoned-object
/// tracking is enabled.
#[derive(Debug, Clone)]
pub struct CallSite {
    /// Caller-supplied identity (thread name, task id, or similar) —
    /// always available even on hosts without a reliable stack-capture
    /// mechanism.
    pub caller: String,
    /// A full backtrace, captured only when `requireFullStackTrace` is set.
    pub backtrace: Option<String>,
}

/// One managed object plus its pool bookkeeping.
///
/// Wrappers carry only plain data and an atomically-transitioned state
/// word; they never call back into the engine — the engine calls methods
/// on the wrapper, not the other way around.
pub struct PooledObject<T> {
    object: Mutex<Option<T>>,
    state: AtomicU8,
    create_instant: Instant,
    last_borrow_instant: Mutex<Instant>,
    last_return_instant: Mutex<Instant>,
    last_used_instant: Mutex<Instant>,
    borrowed_count: AtomicU64,
    borrow_call_site: Mutex<Option<CallSite>>,
    use_call_site: Mutex<Option<CallSite>>,
    /// Monotonic creation token, used by the engine to identify this
    /// wrapper in the all-objects index.
    creation_token: u64,
}

static NEXT_CREATION_TOKEN: AtomicU64 = AtomicU64::new(0);

impl<T> PooledObject<T> {
    /// Wrap a freshly created object. Starts in `Idle`; the caller
    /// (pool engine) CASes to `Allocated` immediately if this was a
    /// direct borrow-path creation.
    pub fn new(object: T) -> Self {
        let now = Instant::now();
        Self {
            object: Mutex::new(Some(object)),
            state: AtomicU8::new(ObjectState::Idle as u8),
            create_instant: now,
            last_borrow_instant: Mutex::new(now),
            last_return_instant: Mutex::new(now),
            last_used_instant: Mutex::new(now),
            borrowed_count: AtomicU64::new(0),
            borrow_call_site: Mutex::new(None),
            use_call_site: Mutex::new(None),
            creation_token: NEXT_CREATION_TOKEN.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ObjectState {
        ObjectState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Attempt to CAS from `from` to `to`. Returns `true` on success.
    pub fn cas_state(&self, from: ObjectState, to: ObjectState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Unconditionally set the state. Used for terminal transitions
    /// (`* -> Invalid`) where the caller already holds exclusive access.
    pub fn force_state(&self, to: ObjectState) {
        self.state.store(to as u8, Ordering::Release);
    }

    /// Monotonic creation token, used for fair admission ordering.
    #[must_use]
    pub fn creation_token(&self) -> u64 {
        self.creation_token
    }

    #[must_use]
    pub fn create_instant(&self) -> Instant {
        self.create_instant
    }

    #[must_use]
    pub fn last_borrow_instant(&self) -> Instant {
        *self.last_borrow_instant.lock()
    }

    #[must_use]
    pub fn last_return_instant(&self) -> Instant {
        *self.last_return_instant.lock()
    }

    #[must_use]
    pub fn last_used_instant(&self) -> Instant {
        *self.last_used_instant.lock()
    }

    /// Idle duration, measured from the later of return/creation.
    #[must_use]
    pub fn idle_duration(&self) -> std::time::Duration {
        self.last_return_instant().elapsed()
    }

    #[must_use]
    pub fn borrowed_count(&self) -> u64 {
        self.borrowed_count.load(Ordering::Relaxed)
    }

    /// Record a borrow: bump the counter, stamp `lastBorrowInstant`, and
    /// optionally capture the call-site.
    pub fn record_borrow(&self, call_site: Option<CallSite>) {
        self.borrowed_count.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        *self.last_borrow_instant.lock() = now;
        *self.last_used_instant.lock() = now;
        *self.borrow_call_site.lock() = call_site;
        *self.use_call_site.lock() = None;
    }

    /// Record a `use()` call (usage tracking), updating `lastUsedInstant`
    /// and optionally the full-stack call-site.
    pub fn record_use(&self, call_site: Option<CallSite>) {
        *self.last_used_instant.lock() = Instant::now();
        if call_site.is_some() {
            *self.use_call_site.lock() = call_site;
        }
    }

    /// Record a return: stamp `lastReturnInstant` and clear call-site
    /// capture (it is only relevant while the object is Allocated).
    pub fn record_return(&self) {
        *self.last_return_instant.lock() = Instant::now();
        *self.borrow_call_site.lock() = None;
        *self.use_call_site.lock() = None;
    }

    /// The most recent of `lastBorrowInstant`/`lastUsedInstant`, used by
    /// the abandoned-object sweeper.
    #[must_use]
    pub fn last_activity_instant(&self) -> Instant {
        self.last_borrow_instant().max(self.last_used_instant())
    }

    #[must_use]
    pub fn borrow_call_site(&self) -> Option<CallSite> {
        self.borrow_call_site.lock().clone()
    }

    #[must_use]
    pub fn use_call_site(&self) -> Option<CallSite> {
        self.use_call_site.lock().clone()
    }

    /// Take the underlying object out, leaving `None` behind. Used when
    /// destroying a wrapper (the object is handed to `factory.destroy`).
    ///
    /// # Panics
    /// Panics if the object was already taken — a programmer error, since
    /// a wrapper is destroyed exactly once.
    pub fn take_object(&self) -> T {
        self.object
            .lock()
            .take()
            .expect("PooledObject::take_object called twice")
    }

    /// Put a previously-taken object back, e.g. when a borrow is returned
    /// to the idle deque rather than destroyed.
    pub fn restore_object(&self, object: T) {
        *self.object.lock() = Some(object);
    }

    /// Run `f` with a shared reference to the underlying object.
    ///
    /// # Panics
    /// Panics if the object has already been taken.
    pub fn with_object<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.object.lock();
        f(guard.as_ref().expect("PooledObject used after destruction"))
    }

    /// Run `f` with a mutable reference to the underlying object.
    ///
    /// # Panics
    /// Panics if the object has already been taken.
    pub fn with_object_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.object.lock();
        f(guard.as_mut().expect("PooledObject used after destruction"))
    }
}

impl<T> std::fmt::Debug for PooledObject<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledObject")
            .field("state", &self.state())
            .field("borrowed_count", &self.borrowed_count())
            .field("creation_token", &self.creation_token)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_wrapper_starts_idle() {
        let w = PooledObject::new(42);
        assert_eq!(w.state(), ObjectState::Idle);
        assert_eq!(w.borrowed_count(), 0);
    }

    #[test]
    fn cas_state_succeeds_on_match() {
        let w = PooledObject::new(42);
        assert!(w.cas_state(ObjectState::Idle, ObjectState::Allocated));
        assert_eq!(w.state(), ObjectState::Allocated);
    }

    #[test]
    fn cas_state_fails_on_mismatch() {
        let w = PooledObject::new(42);
        assert!(!w.cas_state(ObjectState::Allocated, ObjectState::Idle));
        assert_eq!(w.state(), ObjectState::Idle);
    }

    #[test]
    fn record_borrow_increments_and_stamps() {
        let w = PooledObject::new(42);
        let before = w.last_borrow_instant();
        std::thread::sleep(std::time::Duration::from_millis(5));
        w.record_borrow(None);
        assert_eq!(w.borrowed_count(), 1);
        assert!(w.last_borrow_instant() > before);
    }

    #[test]
    fn take_object_then_with_object_panics() {
        let w = PooledObject::new(42);
        let _ = w.take_object();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            w.with_object(|_| ());
        }));
        assert!(result.is_err());
    }

    #[test]
    fn creation_tokens_are_monotonic() {
        let a = PooledObject::new(1);
        let b = PooledObject::new(2);
        assert!(b.creation_token() > a.creation_token());
    }

    #[test]
    fn restore_object_allows_reuse() {
        let w = PooledObject::new(42);
        let obj = w.take_object();
        w.restore_object(obj);
        assert_eq!(w.with_object(|v| *v), 42);
    }
}
