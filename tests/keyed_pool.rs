//! End-to-end coverage of the keyed engine: independent per-key capacity,
//! a shared cross-key ceiling, and round-robin eviction to make room under
//! that ceiling.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use objectpool::{
    BorrowContext, CreateError, Error, KeyedObjectPool, KeyedPoolConfig, KeyedPooledObjectFactory,
    PoolConfig,
};

struct KeyedCounterFactory(AtomicUsize);

impl KeyedCounterFactory {
    fn new() -> Self {
        Self(AtomicUsize::new(0))
    }
}

#[async_trait]
impl KeyedPooledObjectFactory<String, usize> for KeyedCounterFactory {
    async fn create(&self, _key: &String) -> std::result::Result<usize, CreateError> {
        Ok(self.0.fetch_add(1, Ordering::SeqCst))
    }
}

fn config(per_key_max: usize, global_max: Option<usize>) -> KeyedPoolConfig {
    KeyedPoolConfig {
        per_key: PoolConfig {
            max_total: Some(per_key_max),
            max_idle: per_key_max,
            max_wait: Some(Duration::from_millis(80)),
            ..Default::default()
        },
        max_total: global_max,
    }
}

#[tokio::test]
async fn each_key_gets_its_own_capacity() {
    let pool = KeyedObjectPool::new(KeyedCounterFactory::new(), config(1, None)).unwrap();
    let ctx = BorrowContext::new();

    let _tenant_a = pool.borrow(&"tenant-a".to_string(), &ctx).await.unwrap();
    let _tenant_b = pool.borrow(&"tenant-b".to_string(), &ctx).await.unwrap();
    assert_eq!(pool.num_keys(), 2);
}

#[tokio::test]
async fn a_saturated_key_does_not_block_other_keys() {
    let pool = KeyedObjectPool::new(KeyedCounterFactory::new(), config(1, None)).unwrap();
    let ctx = BorrowContext::new();

    let _busy = pool.borrow(&"busy".to_string(), &ctx).await.unwrap();
    let saturated = pool.borrow(&"busy".to_string(), &ctx).await;
    assert!(matches!(saturated, Err(Error::PoolExhausted { .. })));

    let other = pool.borrow(&"idle-key".to_string(), &ctx).await;
    assert!(other.is_ok(), "a different key must not be affected by busy's exhaustion");
}

#[tokio::test]
async fn global_ceiling_is_enforced_across_keys() {
    let pool = KeyedObjectPool::new(KeyedCounterFactory::new(), config(10, Some(1))).unwrap();
    let ctx = BorrowContext::new();

    let _a = pool.borrow(&"a".to_string(), &ctx).await.unwrap();
    let started = tokio::time::Instant::now();
    let b = pool.borrow(&"b".to_string(), &ctx).await;
    assert!(
        matches!(b, Err(Error::PoolExhausted { .. })),
        "global max_total=1 should reject a second key's borrow while the first is still active"
    );
    // "a" never frees its slot in this test, so "b" must have genuinely
    // blocked for the configured max_wait (80ms) rather than failing fast.
    assert!(
        started.elapsed() >= Duration::from_millis(60),
        "borrow against an exhausted global ceiling should honor block_when_exhausted/max_wait, not fail immediately"
    );
}

#[tokio::test]
async fn global_ceiling_wakes_a_waiter_once_a_key_frees_its_slot() {
    let pool = KeyedObjectPool::new(KeyedCounterFactory::new(), config(1, Some(1))).unwrap();
    let ctx = BorrowContext::new();

    let guard_a = pool.borrow(&"a".to_string(), &ctx).await.unwrap();

    let releaser = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        // `invalidate` forces a real destroy, which is what actually frees
        // global capacity; a plain drop only returns "a" to idle.
        guard_a.invalidate();
    });

    let started = tokio::time::Instant::now();
    let guard_b = pool
        .borrow(&"b".to_string(), &ctx)
        .await
        .expect("borrow should succeed once a's slot is freed, well within max_wait");
    assert!(started.elapsed() >= Duration::from_millis(15));
    assert_eq!(*guard_b, 1);
    releaser.await.unwrap();
}

#[tokio::test]
async fn idle_object_in_another_key_is_evicted_to_make_room() {
    let pool = KeyedObjectPool::new(KeyedCounterFactory::new(), config(10, Some(1))).unwrap();
    let ctx = BorrowContext::new();

    let guard = pool.borrow(&"a".to_string(), &ctx).await.unwrap();
    drop(guard);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(pool.num_idle_for_key(&"a".to_string()), 1);

    let _b = pool
        .borrow(&"b".to_string(), &ctx)
        .await
        .expect("borrowing b should evict a's idle object to stay under the global ceiling");
    assert_eq!(pool.num_idle_for_key(&"a".to_string()), 0);
}
