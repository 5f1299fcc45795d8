//! RAII guard returned by `borrow`.

/// Wraps a borrowed object. Dropping the guard runs the pool's return
/// path; call [`PoolGuard::invalidate`] instead of dropping if the
/// borrower knows the object is broken, or [`PoolGuard::into_inner`] to
/// take ownership without running either path (e.g. when handing the
/// object to code that will manage its lifetime itself from here on).
pub struct PoolGuard<T> {
    object: Option<T>,
    on_drop: Option<Box<dyn FnOnce(T, bool) + Send>>,
    on_use: Option<Box<dyn Fn() + Send + Sync>>,
    invalidate: bool,
}

impl<T> PoolGuard<T> {
    /// `on_drop(object, invalidate)` is invoked exactly once, either on
    /// drop or via an explicit call to [`invalidate`](Self::invalidate).
    pub fn new<F>(object: T, on_drop: F) -> Self
    where
        F: FnOnce(T, bool) + Send + 'static,
    {
        Self {
            object: Some(object),
            on_drop: Some(Box::new(on_drop)),
            on_use: None,
            invalidate: false,
        }
    }

    /// Attach the hook [`mark_used`](Self::mark_used) invokes. Builder used
    /// by the engines that construct a guard; not meant to be called
    /// outside this crate.
    #[must_use]
    pub(crate) fn with_use_hook<F>(mut self, on_use: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_use = Some(Box::new(on_use));
        self
    }

    /// Report that the held object is still in active use. With
    /// `use_usage_tracking` enabled, this resets the abandoned-borrow clock
    /// the same way a fresh borrow would, so a long-lived checkout that
    /// calls this periodically is never reclaimed as abandoned. A no-op
    /// when the guard has no use hook attached (usage tracking is off, or
    /// the guard was built outside a pool's `borrow`).
    pub fn mark_used(&self) {
        if let Some(on_use) = &self.on_use {
            on_use();
        }
    }

    /// Mark the object for invalidation instead of returning it to the
    /// idle deque, then immediately run the drop path.
    pub fn invalidate(mut self) {
        self.invalidate = true;
        drop(self);
    }

    /// Take the object out, skipping both return and invalidation. The
    /// caller becomes fully responsible for the object from here on.
    #[must_use]
    pub fn into_inner(mut self) -> T {
        self.on_drop.take();
        self.object.take().expect("guard used after into_inner")
    }
}

impl<T> std::ops::Deref for PoolGuard<T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.object.as_ref().expect("guard used after into_inner")
    }
}

impl<T> std::ops::DerefMut for PoolGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.object.as_mut().expect("guard used after into_inner")
    }
}

impl<T> Drop for PoolGuard<T> {
    fn drop(&mut self) {
        if let (Some(object), Some(on_drop)) = (self.object.take(), self.on_drop.take()) {
            on_drop(object, self.invalidate);
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for PoolGuard<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolGuard").field("object", &self.object).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[test]
    fn drop_runs_on_drop_with_invalidate_false() {
        let flag = Arc::new(AtomicBool::new(false));
        let f = flag.clone();
        let guard = PoolGuard::new(1, move |_obj, invalidate| {
            f.store(invalidate, Ordering::SeqCst);
        });
        drop(guard);
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[test]
    fn explicit_invalidate_passes_true() {
        let flag = Arc::new(AtomicBool::new(false));
        let f = flag.clone();
        let guard = PoolGuard::new(1, move |_obj, invalidate| {
            f.store(invalidate, Ordering::SeqCst);
        });
        guard.invalidate();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn into_inner_skips_on_drop() {
        let called = Arc::new(AtomicBool::new(false));
        let c = called.clone();
        let guard = PoolGuard::new(7, move |_obj, _inv| {
            c.store(true, Ordering::SeqCst);
        });
        assert_eq!(guard.into_inner(), 7);
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn mark_used_forwards_to_the_attached_hook() {
        let uses = Arc::new(AtomicUsize::new(0));
        let u = uses.clone();
        let guard = PoolGuard::new(1, |_obj, _inv| {}).with_use_hook(move || {
            u.fetch_add(1, Ordering::SeqCst);
        });
        guard.mark_used();
        guard.mark_used();
        assert_eq!(uses.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn mark_used_is_a_no_op_without_a_hook() {
        let guard = PoolGuard::new(1, |_obj, _inv| {});
        guard.mark_used();
    }
}
