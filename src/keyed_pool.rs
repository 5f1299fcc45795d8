//! The keyed pool engine: one sub-pool per key, sharing a cross-key
//! capacity ceiling.
//!
//! Built on a get-or-insert-by-key registry over a `DashMap`, the same
//! pattern a type-keyed registry uses for heterogeneous handles —
//! generalized here to an arbitrary `K`, with each entry a full
//! [`GenericObjectPool`] rather than a trait object, since every sub-pool
//! shares the same concrete factory and element type.

use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::config::{Bound, PoolConfig};
use crate::context::BorrowContext;
use crate::error::{Error, Result};
use crate::factory::{CreateError, DestroyReason, KeyedPooledObjectFactory, PooledObjectFactory};
use crate::guard::PoolGuard;
use crate::pool::{sleep_or_pending, GenericObjectPool, PoolStats};

/// Configuration for a [`KeyedObjectPool`].
#[derive(Debug, Clone)]
pub struct KeyedPoolConfig {
    /// Applied independently to each key's sub-pool. Its `max_total` field
    /// is therefore `maxTotalPerKey`, not the cross-key total.
    pub per_key: PoolConfig,
    /// Upper bound on active+idle summed across every key. `None` means
    /// only each key's own `per_key.max_total` constrains it.
    pub max_total: Bound,
}

impl KeyedPoolConfig {
    pub fn validate(&self) -> Result<()> {
        self.per_key.validate()
    }
}

/// Adapts a [`KeyedPooledObjectFactory`] bound to one key into a plain
/// [`PooledObjectFactory`], so each key's sub-pool can be an ordinary
/// [`GenericObjectPool`]. Also enforces the cross-key total: `create`
/// reserves a global slot before delegating, blocking and retrying on
/// `global_notify` the same way a single pool's own borrow blocks on local
/// capacity, and `destroy` always releases its slot and wakes waiters.
struct KeyedFactoryAdapter<K, T, KF> {
    key: K,
    inner: Arc<KF>,
    global_total: Arc<AtomicUsize>,
    global_max: Bound,
    global_notify: Arc<tokio::sync::Notify>,
    block_when_exhausted: bool,
    max_wait: Option<Duration>,
}

impl<K, T, KF> KeyedFactoryAdapter<K, T, KF> {
    fn try_reserve_global_slot(&self) -> bool {
        loop {
            let current = self.global_total.load(Ordering::Acquire);
            if let Some(max) = self.global_max {
                if current >= max {
                    return false;
                }
            }
            if self
                .global_total
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    fn global_exhausted_error(&self) -> Error {
        Error::PoolExhausted {
            active: self.global_total.load(Ordering::Acquire),
            max_total: self.global_max.unwrap_or(usize::MAX),
            waiters: 0,
        }
    }
}

#[async_trait]
impl<K, T, KF> PooledObjectFactory<T> for KeyedFactoryAdapter<K, T, KF>
where
    K: Send + Sync + 'static,
    T: Send + 'static,
    KF: KeyedPooledObjectFactory<K, T>,
{
    async fn create(&self) -> std::result::Result<T, CreateError> {
        let deadline = self.max_wait.map(|d| tokio::time::Instant::now() + d);

        loop {
            // Register interest before re-checking capacity: a `destroy()`
            // on any key that lands between the check and the await below
            // must not be missed.
            let notified = self.global_notify.notified();
            if self.try_reserve_global_slot() {
                break;
            }
            if !self.block_when_exhausted {
                return Err(Box::new(self.global_exhausted_error()));
            }
            let remaining = match deadline {
                None => None,
                Some(d) => {
                    let now = tokio::time::Instant::now();
                    if now >= d {
                        return Err(Box::new(self.global_exhausted_error()));
                    }
                    Some(d - now)
                }
            };
            tokio::select! {
                () = notified => {}
                () = sleep_or_pending(remaining) => {
                    return Err(Box::new(self.global_exhausted_error()));
                }
            }
        }

        match self.inner.create(&self.key).await {
            Ok(obj) => Ok(obj),
            Err(e) => {
                self.global_total.fetch_sub(1, Ordering::AcqRel);
                self.global_notify.notify_waiters();
                Err(e)
            }
        }
    }

    async fn activate(&self, instance: &mut T) -> Result<()> {
        self.inner.activate(&self.key, instance).await
    }

    async fn validate(&self, instance: &T) -> bool {
        self.inner.validate(&self.key, instance).await
    }

    async fn passivate(&self, instance: &mut T) -> Result<()> {
        self.inner.passivate(&self.key, instance).await
    }

    async fn destroy(&self, instance: T, reason: DestroyReason) -> Result<()> {
        self.global_total.fetch_sub(1, Ordering::AcqRel);
        self.global_notify.notify_waiters();
        self.inner.destroy(&self.key, instance, reason).await
    }
}

type SubPool<K, T, KF> = GenericObjectPool<T, KeyedFactoryAdapter<K, T, KF>>;

struct KeyedInner<K, T, KF> {
    factory: Arc<KF>,
    config: KeyedPoolConfig,
    global_total: Arc<AtomicUsize>,
    global_notify: Arc<tokio::sync::Notify>,
    sub_pools: DashMap<K, SubPool<K, T, KF>>,
    interested: DashMap<K, AtomicUsize>,
    eviction_cursor: AtomicUsize,
}

/// One pool per key, sharing an optional cross-key capacity ceiling.
pub struct KeyedObjectPool<K, T, KF> {
    inner: Arc<KeyedInner<K, T, KF>>,
}

impl<K, T, KF> Clone for KeyedObjectPool<K, T, KF> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, T, KF> KeyedObjectPool<K, T, KF>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + 'static,
    KF: KeyedPooledObjectFactory<K, T>,
{
    pub fn new(factory: KF, config: KeyedPoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(KeyedInner {
                factory: Arc::new(factory),
                config,
                global_total: Arc::new(AtomicUsize::new(0)),
                global_notify: Arc::new(tokio::sync::Notify::new()),
                sub_pools: DashMap::new(),
                interested: DashMap::new(),
                eviction_cursor: AtomicUsize::new(0),
            }),
        })
    }

    /// Borrow an object for `key`, creating its sub-pool on first use.
    pub async fn borrow(&self, key: &K, ctx: &BorrowContext) -> Result<PoolGuard<T>> {
        self.mark_interested(key);
        self.make_room_if_needed(key).await;
        let pool = self.sub_pool(key);
        let result = pool.borrow(ctx).await;
        self.unmark_interested(key);
        result
    }

    pub async fn clear_key(&self, key: &K) {
        if let Some(pool) = self.inner.sub_pools.get(key) {
            pool.clear().await;
        }
    }

    pub async fn clear_all(&self) {
        let pools: Vec<_> = self.inner.sub_pools.iter().map(|e| e.value().clone()).collect();
        for pool in pools {
            pool.clear().await;
        }
    }

    pub async fn close(&self) {
        let pools: Vec<_> = self.inner.sub_pools.iter().map(|e| e.value().clone()).collect();
        for pool in pools {
            pool.close().await;
        }
    }

    /// Run one eviction pass across every key's sub-pool, then drop any
    /// sub-pool left with no idle objects, no active borrows, and no
    /// currently-interested borrower.
    pub async fn run_eviction_pass(&self) {
        let pools: Vec<(K, SubPool<K, T, KF>)> = self
            .inner
            .sub_pools
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        for (_, pool) in &pools {
            pool.run_eviction_pass().await;
        }
        self.retire_idle_keys();
    }

    #[must_use]
    pub fn num_keys(&self) -> usize {
        self.inner.sub_pools.len()
    }

    #[must_use]
    pub fn num_idle_for_key(&self, key: &K) -> usize {
        self.inner.sub_pools.get(key).map(|p| p.num_idle()).unwrap_or(0)
    }

    #[must_use]
    pub fn num_active_for_key(&self, key: &K) -> usize {
        self.inner
            .sub_pools
            .get(key)
            .map(|p| p.num_active())
            .unwrap_or(0)
    }

    #[must_use]
    pub fn stats_for_key(&self, key: &K) -> Option<PoolStats> {
        self.inner.sub_pools.get(key).map(|p| p.stats())
    }

    #[must_use]
    pub fn num_active_total(&self) -> usize {
        self.inner.sub_pools.iter().map(|e| e.value().num_active()).sum()
    }

    #[must_use]
    pub fn num_idle_total(&self) -> usize {
        self.inner.sub_pools.iter().map(|e| e.value().num_idle()).sum()
    }

    fn sub_pool(&self, key: &K) -> SubPool<K, T, KF> {
        if let Some(pool) = self.inner.sub_pools.get(key) {
            return pool.clone();
        }
        let adapter = KeyedFactoryAdapter {
            key: key.clone(),
            inner: self.inner.factory.clone(),
            global_total: self.inner.global_total.clone(),
            global_max: self.inner.config.max_total,
            global_notify: self.inner.global_notify.clone(),
            block_when_exhausted: self.inner.config.per_key.block_when_exhausted,
            max_wait: self.inner.config.per_key.max_wait,
        };
        let pool = GenericObjectPool::new(adapter, self.inner.config.per_key.clone())
            .expect("per-key config was already validated in KeyedObjectPool::new");
        self.inner
            .sub_pools
            .entry(key.clone())
            .or_insert_with(|| pool.clone());
        self.inner.sub_pools.get(key).expect("just inserted").clone()
    }

    fn mark_interested(&self, key: &K) {
        self.inner
            .interested
            .entry(key.clone())
            .or_insert_with(|| AtomicUsize::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    fn unmark_interested(&self, key: &K) {
        if let Some(counter) = self.inner.interested.get(key) {
            counter.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// When the cross-key total is already at capacity, evict one idle
    /// object from another key's sub-pool (round-robin) to make room,
    /// rather than failing `key`'s borrow outright.
    async fn make_room_if_needed(&self, key: &K) {
        let Some(max) = self.inner.config.max_total else {
            return;
        };
        if self.inner.global_total.load(Ordering::Acquire) < max {
            return;
        }

        let keys: Vec<K> = self.inner.sub_pools.iter().map(|e| e.key().clone()).collect();
        if keys.is_empty() {
            return;
        }
        let start = self.inner.eviction_cursor.fetch_add(1, Ordering::Relaxed) % keys.len();
        for i in 0..keys.len() {
            let candidate = &keys[(start + i) % keys.len()];
            if candidate == key {
                continue;
            }
            if let Some(pool) = self.inner.sub_pools.get(candidate) {
                if pool.evict_one_idle().await {
                    return;
                }
            }
        }
    }

    fn retire_idle_keys(&self) {
        let victims: Vec<K> = self
            .inner
            .sub_pools
            .iter()
            .filter(|e| {
                let pool = e.value();
                let uninterested = self
                    .inner
                    .interested
                    .get(e.key())
                    .map(|c| c.load(Ordering::Relaxed) == 0)
                    .unwrap_or(true);
                pool.num_idle() == 0 && pool.num_active() == 0 && uninterested
            })
            .map(|e| e.key().clone())
            .collect();
        for key in victims {
            self.inner.sub_pools.remove(&key);
            self.inner.interested.remove(&key);
        }
    }
}

impl<K, T, KF> std::fmt::Debug for KeyedObjectPool<K, T, KF> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedObjectPool")
            .field("num_keys", &self.num_keys())
            .finish()
    }
}
