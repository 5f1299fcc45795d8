//! The single, un-keyed pool engine: an `Arc`-shared inner holding the
//! idle deque and a capacity counter, a `Guard`-returning `borrow`, and a
//! background-spawned return path so `Drop` never blocks. Built out to the
//! full wrapper state machine, an identity index keyed by creation token,
//! FIFO/LIFO idle ordering, fair waiter wakeups, and the abandoned sweeper
//! hook.

use std::collections::VecDeque;
use std::future::pending;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::abandoned;
use crate::config::PoolConfig;
use crate::context::BorrowContext;
use crate::error::{Error, Result};
use crate::eviction_policy::{DefaultEvictionPolicy, EvictionPolicy, EvictionVerdict};
use crate::factory::{DestroyReason, PooledObjectFactory};
use crate::guard::PoolGuard;
use crate::wrapper::{CallSite, ObjectState, PooledObject};

/// Point-in-time counters for a single pool.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub num_idle: usize,
    pub num_active: usize,
    pub num_waiters: usize,
    pub create_count: u64,
    pub destroyed_count: u64,
    pub destroyed_by_evictor: u64,
    pub destroyed_by_borrow_validation: u64,
}

/// An ordered set of parked borrowers. Always FIFO: that is a strictly
/// stronger guarantee than `fairness: false` requires, not a weaker one,
/// so one waiter-wake strategy satisfies both settings.
struct WaiterQueue {
    queue: Mutex<VecDeque<Arc<Notify>>>,
}

impl WaiterQueue {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    fn register(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.queue.lock().push_back(notify.clone());
        notify
    }

    fn forget(&self, notify: &Arc<Notify>) {
        let mut queue = self.queue.lock();
        if let Some(pos) = queue.iter().position(|n| Arc::ptr_eq(n, notify)) {
            queue.remove(pos);
        }
    }

    fn wake_one(&self) {
        if let Some(notify) = self.queue.lock().pop_front() {
            notify.notify_one();
        }
    }

    fn wake_all(&self) {
        let mut queue = self.queue.lock();
        while let Some(notify) = queue.pop_front() {
            notify.notify_one();
        }
    }

    fn len(&self) -> usize {
        self.queue.lock().len()
    }
}

struct PoolInner<T, F> {
    factory: F,
    config: PoolConfig,
    idle: Mutex<VecDeque<Arc<PooledObject<T>>>>,
    all_objects: DashMap<u64, Arc<PooledObject<T>>>,
    total_count: AtomicUsize,
    closed: AtomicBool,
    waiters: WaiterQueue,
    eviction_cursor: Mutex<usize>,
    create_count: AtomicU64,
    destroyed_count: AtomicU64,
    destroyed_by_evictor: AtomicU64,
    destroyed_by_borrow_validation: AtomicU64,
}

/// A single generic object pool, parameterized over the pooled type `T`
/// and its factory `F`.
pub struct GenericObjectPool<T, F> {
    inner: Arc<PoolInner<T, F>>,
}

impl<T, F> Clone for GenericObjectPool<T, F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

enum BorrowPrepOutcome {
    Ready,
    Destroyed,
}

impl<T, F> GenericObjectPool<T, F>
where
    T: Send + 'static,
    F: PooledObjectFactory<T>,
{
    /// Build a new pool. Fails if `config` is internally inconsistent.
    pub fn new(factory: F, config: PoolConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(max_total = ?config.max_total, max_idle = config.max_idle, "pool created");
        Ok(Self {
            inner: Arc::new(PoolInner {
                factory,
                config,
                idle: Mutex::new(VecDeque::new()),
                all_objects: DashMap::new(),
                total_count: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                waiters: WaiterQueue::new(),
                eviction_cursor: Mutex::new(0),
                create_count: AtomicU64::new(0),
                destroyed_count: AtomicU64::new(0),
                destroyed_by_evictor: AtomicU64::new(0),
                destroyed_by_borrow_validation: AtomicU64::new(0),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn num_idle(&self) -> usize {
        self.inner.idle.lock().len()
    }

    #[must_use]
    pub fn num_active(&self) -> usize {
        let total = self.inner.total_count.load(Ordering::Acquire);
        total.saturating_sub(self.num_idle())
    }

    #[must_use]
    pub fn num_waiters(&self) -> usize {
        self.inner.waiters.len()
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let num_idle = self.num_idle();
        let num_active = self.num_active();
        #[cfg(feature = "metrics")]
        {
            metrics::gauge!("objectpool.idle").set(num_idle as f64);
            metrics::gauge!("objectpool.active").set(num_active as f64);
        }
        PoolStats {
            num_idle,
            num_active,
            num_waiters: self.num_waiters(),
            create_count: self.inner.create_count.load(Ordering::Relaxed),
            destroyed_count: self.inner.destroyed_count.load(Ordering::Relaxed),
            destroyed_by_evictor: self.inner.destroyed_by_evictor.load(Ordering::Relaxed),
            destroyed_by_borrow_validation: self
                .inner
                .destroyed_by_borrow_validation
                .load(Ordering::Relaxed),
        }
    }

    /// Borrow an object, waiting up to the configured `max_wait`.
    pub async fn borrow(&self, ctx: &BorrowContext) -> Result<PoolGuard<T>> {
        self.borrow_for(ctx, self.inner.config.max_wait).await
    }

    /// Borrow an object, overriding the configured wait for this call only.
    /// `None` blocks indefinitely; `Some(Duration::ZERO)` never blocks.
    pub async fn borrow_for(
        &self,
        ctx: &BorrowContext,
        wait: Option<Duration>,
    ) -> Result<PoolGuard<T>> {
        if self.inner.config.remove_abandoned_on_borrow {
            self.sweep_abandoned().await;
        }

        let deadline = wait.map(|d| tokio::time::Instant::now() + d);
        let failure_ceiling = self
            .inner
            .config
            .max_total
            .map(|max| (max as u64) * 2 + 1);
        let mut consecutive_failures: u64 = 0;

        loop {
            if self.is_closed() {
                return Err(Error::PoolClosed);
            }

            let candidate = if let Some(wrapper) = self.pop_idle() {
                if wrapper.cas_state(ObjectState::Idle, ObjectState::Allocated) {
                    Some(wrapper)
                } else if wrapper.cas_state(ObjectState::Evicting, ObjectState::EvictionReturnToHead)
                    || wrapper.state() == ObjectState::EvictionReturnToHead
                {
                    // The evictor claimed this wrapper (or already sent it
                    // back once) between our pop and this CAS. It is still
                    // live and undecided, so it must go back or it becomes a
                    // ghost: still counted in total_count/all_objects but
                    // present nowhere in the idle deque. Put it back at the
                    // head rather than the tail so the evictor's own
                    // end-of-pass `retain` still finds and resolves it, and
                    // so another racing pop sees it again immediately.
                    self.push_idle_front(wrapper);
                    // Yield so the evictor (or whatever else is deciding
                    // this wrapper's fate) gets a chance to run instead of
                    // this loop spinning on a single-threaded runtime.
                    tokio::task::yield_now().await;
                    continue;
                } else {
                    // Already resolved (evicted and about to be destroyed,
                    // or reclaimed some other way); not ours to hand out or
                    // requeue.
                    continue;
                }
            } else if self.try_admit() {
                match self.create_and_register().await {
                    Ok(wrapper) => {
                        wrapper.force_state(ObjectState::Allocated);
                        Some(wrapper)
                    }
                    Err(e) => return Err(e),
                }
            } else {
                None
            };

            let wrapper = match candidate {
                Some(w) => w,
                None => {
                    if !self.inner.config.block_when_exhausted {
                        return Err(self.exhausted_error());
                    }
                    if !self.wait_for_capacity(ctx, deadline).await? {
                        return Err(self.exhausted_error());
                    }
                    continue;
                }
            };

            match self.prepare_borrowed(&wrapper).await {
                BorrowPrepOutcome::Ready => return Ok(self.make_guard(wrapper)),
                BorrowPrepOutcome::Destroyed => {
                    consecutive_failures += 1;
                    if let Some(ceiling) = failure_ceiling {
                        if consecutive_failures > ceiling {
                            return Err(Error::ValidationFailed);
                        }
                    }
                }
            }
        }
    }

    /// Add one freshly created object directly to the idle deque, subject
    /// to the same capacity admission as a borrow-triggered create.
    pub async fn add_object(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::PoolClosed);
        }
        if !self.try_admit() {
            return Err(self.exhausted_error());
        }
        let wrapper = self.create_and_register().await?;
        wrapper.force_state(ObjectState::Idle);
        self.push_idle(wrapper);
        self.inner.waiters.wake_one();
        Ok(())
    }

    /// Destroy every currently idle object. Borrowed objects are
    /// unaffected; they are re-evaluated against capacity when returned.
    pub async fn clear(&self) {
        let drained: Vec<_> = self.inner.idle.lock().drain(..).collect();
        for wrapper in drained {
            self.destroy_wrapper(wrapper, DestroyReason::Clear).await;
        }
    }

    /// Close the pool: idempotent, drains idle objects, wakes every
    /// waiter with [`Error::PoolClosed`], and fails subsequent borrows.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let drained: Vec<_> = self.inner.idle.lock().drain(..).collect();
        for wrapper in drained {
            self.destroy_wrapper(wrapper, DestroyReason::Close).await;
        }
        self.inner.waiters.wake_all();
    }

    /// Run one eviction sweep: visits up to `numTestsPerEvictionRun`
    /// idle objects starting from a stable cursor, then tops idle back up
    /// to `min_idle`. Also runs the abandoned sweep first when
    /// `removeAbandonedOnMaintenance` is set.
    pub async fn run_eviction_pass(&self) {
        if self.inner.config.remove_abandoned_on_maintenance {
            self.sweep_abandoned().await;
        }

        let snapshot: Vec<Arc<PooledObject<T>>> = self.inner.idle.lock().iter().cloned().collect();
        let idle_len = snapshot.len();

        if idle_len > 0 {
            let test_count = self.eviction_test_count(idle_len);
            let start = {
                let mut cursor = self.inner.eviction_cursor.lock();
                let s = *cursor % idle_len;
                *cursor = (s + test_count) % idle_len;
                s
            };

            let mut remaining_idle = idle_len;
            let mut to_destroy: Vec<(Arc<PooledObject<T>>, T)> = Vec::new();
            let mut evicted_tokens = Vec::new();

            for i in 0..test_count {
                let wrapper = snapshot[(start + i) % idle_len].clone();
                if !wrapper.cas_state(ObjectState::Idle, ObjectState::Evicting) {
                    continue;
                }
                if let Some((wrapper, obj)) = self.evict_or_keep(wrapper, remaining_idle).await {
                    remaining_idle = remaining_idle.saturating_sub(1);
                    evicted_tokens.push(wrapper.creation_token());
                    to_destroy.push((wrapper, obj));
                }
            }

            if !evicted_tokens.is_empty() {
                let mut idle = self.inner.idle.lock();
                idle.retain(|w| !evicted_tokens.contains(&w.creation_token()));
            }

            for (wrapper, obj) in to_destroy {
                self.finalize_destroy(wrapper, obj, DestroyReason::EvictorFailure)
                    .await;
            }
        }

        self.top_up_min_idle().await;
    }

    /// Flag overdue borrows as abandoned. Runs inline when
    /// `removeAbandonedOnBorrow` is set, and from [`Self::run_eviction_pass`]
    /// when `removeAbandonedOnMaintenance` is set.
    pub async fn sweep_abandoned(&self) -> usize {
        if !self.inner.config.abandoned_tracking_enabled() {
            return 0;
        }

        let candidates: Vec<Arc<PooledObject<T>>> = self
            .inner
            .all_objects
            .iter()
            .filter(|entry| entry.value().state() == ObjectState::Allocated)
            .map(|entry| entry.value().clone())
            .collect();

        let mut reclaimed = 0;
        for wrapper in candidates {
            let overdue = abandoned::is_overdue(
                &wrapper,
                self.inner.config.remove_abandoned_timeout,
                self.inner.config.use_usage_tracking,
            );
            if overdue && wrapper.cas_state(ObjectState::Allocated, ObjectState::Abandoned) {
                reclaimed += 1;
                if self.inner.config.log_abandoned {
                    abandoned::log_report(&abandoned::build_report(&wrapper));
                }
            }
        }
        reclaimed
    }

    /// Destroy one idle object, if any. Used by the keyed engine to make
    /// room for another key when the cross-key total is exhausted but
    /// this key still has idle slack.
    pub async fn evict_one_idle(&self) -> bool {
        match self.pop_idle() {
            Some(wrapper) => {
                self.destroy_wrapper(wrapper, DestroyReason::OverCapacity).await;
                true
            }
            None => false,
        }
    }

    // -- internals --------------------------------------------------

    fn try_admit(&self) -> bool {
        loop {
            let current = self.inner.total_count.load(Ordering::Acquire);
            if let Some(max) = self.inner.config.max_total {
                if current >= max {
                    return false;
                }
            }
            if self
                .inner
                .total_count
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    fn release_admission(&self) {
        self.inner.total_count.fetch_sub(1, Ordering::AcqRel);
    }

    fn pop_idle(&self) -> Option<Arc<PooledObject<T>>> {
        let mut idle = self.inner.idle.lock();
        if self.inner.config.lifo {
            idle.pop_back()
        } else {
            idle.pop_front()
        }
    }

    fn push_idle(&self, wrapper: Arc<PooledObject<T>>) {
        self.inner.idle.lock().push_back(wrapper);
    }

    /// Requeue a wrapper the evictor is still examining back to the head of
    /// the deque, so it surfaces again immediately rather than waiting
    /// behind everything else — and so the eviction pass that raced us
    /// still finds it when resolving `evicted_tokens` at the end of its
    /// sweep.
    fn push_idle_front(&self, wrapper: Arc<PooledObject<T>>) {
        self.inner.idle.lock().push_front(wrapper);
    }

    fn exhausted_error(&self) -> Error {
        Error::PoolExhausted {
            active: self.num_active(),
            max_total: self.inner.config.max_total_or_unbounded(),
            waiters: self.inner.waiters.len(),
        }
    }

    async fn wait_for_capacity(
        &self,
        ctx: &BorrowContext,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<bool> {
        let remaining = match deadline {
            None => None,
            Some(d) => {
                let now = tokio::time::Instant::now();
                if now >= d {
                    return Ok(false);
                }
                Some(d - now)
            }
        };

        let notify = self.inner.waiters.register();
        let woke = tokio::select! {
            () = notify.notified() => true,
            () = ctx.cancellation.cancelled() => {
                self.inner.waiters.forget(&notify);
                return Err(Error::Cancelled);
            }
            () = sleep_or_pending(remaining) => false,
        };
        if !woke {
            self.inner.waiters.forget(&notify);
        }
        Ok(woke)
    }

    fn capture_call_site(&self) -> Option<CallSite> {
        if !self.inner.config.abandoned_tracking_enabled() {
            return None;
        }
        let caller = std::thread::current()
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| "<unnamed task>".to_string());
        let backtrace = if self.inner.config.require_full_stack_trace {
            Some(format!("{:?}", std::backtrace::Backtrace::force_capture()))
        } else {
            None
        };
        Some(CallSite { caller, backtrace })
    }

    async fn create_and_register(&self) -> Result<Arc<PooledObject<T>>> {
        let obj = match self.inner.factory.create().await {
            Ok(obj) => obj,
            Err(e) => {
                self.release_admission();
                // A factory error is opaque, but crate-internal factory
                // adapters (e.g. the keyed engine's cross-key capacity
                // gate) box the crate's own `Error` to signal a specific
                // variant through this same path. Unwrap it rather than
                // double-wrapping so a `PoolExhausted` surfaces as itself.
                let err = match e.downcast::<Error>() {
                    Ok(inner) => *inner,
                    Err(opaque) => Error::FactoryCreateFailed(opaque),
                };
                return Err(err);
            }
        };
        if self.inner.config.test_on_create && !self.inner.factory.validate(&obj).await {
            self.release_admission();
            // Reused rather than adding a dedicated variant: a failed
            // test_on_create is just a borrow-time validation failure
            // that happened to occur immediately after creation.
            let _ = self
                .inner
                .factory
                .destroy(obj, DestroyReason::BorrowValidationFailure)
                .await;
            return Err(Error::ValidationFailed);
        }
        let wrapper = Arc::new(PooledObject::new(obj));
        self.inner
            .all_objects
            .insert(wrapper.creation_token(), wrapper.clone());
        self.inner.create_count.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(creation_token = wrapper.creation_token(), "object created");
        #[cfg(feature = "metrics")]
        metrics::counter!("objectpool.create.total").increment(1);
        Ok(wrapper)
    }

    async fn prepare_borrowed(&self, wrapper: &Arc<PooledObject<T>>) -> BorrowPrepOutcome {
        let mut obj = wrapper.take_object();
        if let Err(e) = self.inner.factory.activate(&mut obj).await {
            tracing::debug!(error = %e, "activation failed on borrow, discarding");
            self.finalize_destroy(wrapper.clone(), obj, DestroyReason::BorrowValidationFailure)
                .await;
            return BorrowPrepOutcome::Destroyed;
        }
        if self.inner.config.test_on_borrow && !self.inner.factory.validate(&obj).await {
            self.finalize_destroy(wrapper.clone(), obj, DestroyReason::BorrowValidationFailure)
                .await;
            return BorrowPrepOutcome::Destroyed;
        }
        wrapper.restore_object(obj);
        wrapper.record_borrow(self.capture_call_site());
        BorrowPrepOutcome::Ready
    }

    fn make_guard(&self, wrapper: Arc<PooledObject<T>>) -> PoolGuard<T> {
        let obj = wrapper.take_object();
        let pool = self.clone();
        let use_wrapper = wrapper.clone();
        let use_pool = self.clone();
        PoolGuard::new(obj, move |object, invalidate| {
            tokio::spawn(async move {
                if invalidate {
                    pool.finalize_destroy(wrapper, object, DestroyReason::Invalidated)
                        .await;
                } else {
                    pool.do_return(wrapper, object).await;
                }
            });
        })
        .with_use_hook(move || {
            use_wrapper.record_use(use_pool.capture_call_site());
        })
    }

    async fn do_return(&self, wrapper: Arc<PooledObject<T>>, mut obj: T) {
        match wrapper.state() {
            ObjectState::Invalid => {
                // Something else already finalized this wrapper (capacity
                // released, index entry removed) before this guard dropped.
                // Just dispose of the real object without touching
                // bookkeeping a second time.
                let _ = self.inner.factory.destroy(obj, DestroyReason::Abandoned).await;
                return;
            }
            ObjectState::Abandoned => {
                // A returned-but-abandoned object is always destroyed,
                // even if there is idle capacity.
                if self.inner.config.test_on_return {
                    let _ = self.inner.factory.validate(&obj).await;
                }
                let _ = self.inner.factory.passivate(&mut obj).await;
                self.finalize_destroy(wrapper, obj, DestroyReason::Abandoned).await;
                return;
            }
            ObjectState::Allocated => {
                if !wrapper.cas_state(ObjectState::Allocated, ObjectState::Returning) {
                    // Lost a race with the sweeper between the match and
                    // the CAS; fall back to the abandoned-return path.
                    self.finalize_destroy(wrapper, obj, DestroyReason::Abandoned).await;
                    return;
                }
            }
            other => {
                tracing::warn!(?other, "return called on a wrapper in an unexpected state");
                self.finalize_destroy(wrapper, obj, DestroyReason::Invalidated).await;
                return;
            }
        }

        if self.inner.config.test_on_return && !self.inner.factory.validate(&obj).await {
            self.finalize_destroy(wrapper, obj, DestroyReason::ReturnValidationFailure)
                .await;
            return;
        }

        if let Err(e) = self.inner.factory.passivate(&mut obj).await {
            tracing::debug!(error = %e, "passivation failed on return, discarding");
            self.finalize_destroy(wrapper, obj, DestroyReason::PassivationFailure)
                .await;
            return;
        }

        let over_capacity = self.inner.idle.lock().len() >= self.inner.config.max_idle;
        if self.is_closed() || over_capacity {
            let reason = if self.is_closed() {
                DestroyReason::Close
            } else {
                DestroyReason::OverCapacity
            };
            self.finalize_destroy(wrapper, obj, reason).await;
            return;
        }

        wrapper.restore_object(obj);
        wrapper.record_return();
        wrapper.force_state(ObjectState::Idle);
        self.push_idle(wrapper);
        self.inner.waiters.wake_one();
    }

    async fn destroy_wrapper(&self, wrapper: Arc<PooledObject<T>>, reason: DestroyReason) {
        if wrapper.state() == ObjectState::Invalid {
            return;
        }
        let obj = wrapper.take_object();
        self.finalize_destroy(wrapper, obj, reason).await;
    }

    async fn finalize_destroy(&self, wrapper: Arc<PooledObject<T>>, obj: T, reason: DestroyReason) {
        wrapper.force_state(ObjectState::Invalid);
        self.inner.all_objects.remove(&wrapper.creation_token());
        self.release_admission();
        self.inner.destroyed_count.fetch_add(1, Ordering::Relaxed);
        match reason {
            DestroyReason::EvictorFailure => {
                self.inner.destroyed_by_evictor.fetch_add(1, Ordering::Relaxed);
            }
            DestroyReason::BorrowValidationFailure => {
                self.inner
                    .destroyed_by_borrow_validation
                    .fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        let token = wrapper.creation_token();
        #[cfg(feature = "metrics")]
        metrics::counter!("objectpool.destroy.total", "reason" => reason.to_string()).increment(1);
        if let Err(e) = self.inner.factory.destroy(obj, reason).await {
            tracing::warn!(error = %e, creation_token = token, %reason, "factory.destroy failed");
        }
        self.inner.waiters.wake_one();
    }

    async fn evict_or_keep(
        &self,
        wrapper: Arc<PooledObject<T>>,
        idle_count_before: usize,
    ) -> Option<(Arc<PooledObject<T>>, T)> {
        let policy = DefaultEvictionPolicy;
        let verdict = policy.evaluate(&wrapper, idle_count_before, &self.inner.config);
        if verdict == EvictionVerdict::Evict {
            let obj = wrapper.take_object();
            return Some((wrapper, obj));
        }

        if self.inner.config.test_while_idle {
            let mut obj = wrapper.take_object();
            if let Err(e) = self.inner.factory.activate(&mut obj).await {
                tracing::debug!(error = %e, "test_while_idle activation failed, discarding");
                return Some((wrapper, obj));
            }
            if !self.inner.factory.validate(&obj).await {
                return Some((wrapper, obj));
            }
            if let Err(e) = self.inner.factory.passivate(&mut obj).await {
                tracing::debug!(error = %e, "test_while_idle passivation failed, discarding");
                return Some((wrapper, obj));
            }
            wrapper.restore_object(obj);
        }

        wrapper.force_state(ObjectState::Idle);
        None
    }

    async fn top_up_min_idle(&self) {
        loop {
            if self.is_closed() || self.num_idle() >= self.inner.config.min_idle {
                return;
            }
            if !self.try_admit() {
                return;
            }
            match self.create_and_register().await {
                Ok(wrapper) => {
                    wrapper.force_state(ObjectState::Idle);
                    self.push_idle(wrapper);
                    self.inner.waiters.wake_one();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "min_idle top-up creation failed");
                    return;
                }
            }
        }
    }

    fn eviction_test_count(&self, idle_len: usize) -> usize {
        let n = self.inner.config.num_tests_per_eviction_run;
        if n > 0 {
            (n as usize).min(idle_len)
        } else {
            let divisor = n.unsigned_abs().max(1) as usize;
            idle_len.div_ceil(divisor)
        }
    }
}

impl<T, F> std::fmt::Debug for GenericObjectPool<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericObjectPool")
            .field("num_idle", &self.num_idle())
            .field("num_active", &self.num_active())
            .field("closed", &self.is_closed())
            .finish()
    }
}

pub(crate) async fn sleep_or_pending(duration: Option<Duration>) {
    match duration {
        Some(d) => tokio::time::sleep(d).await,
        None => pending::<()>().await,
    }
}
