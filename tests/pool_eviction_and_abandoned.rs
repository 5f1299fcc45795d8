//! End-to-end coverage of the background evictor and the abandoned-object
//! sweeper: idle objects age out, `min_idle` is topped back up, and
//! borrows that are never returned are eventually reclaimed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use objectpool::{BorrowContext, CreateError, Evictor, GenericObjectPool, PoolConfig, PooledObjectFactory};

struct CounterFactory(AtomicUsize);

impl CounterFactory {
    fn new() -> Self {
        Self(AtomicUsize::new(0))
    }
}

#[async_trait]
impl PooledObjectFactory<usize> for CounterFactory {
    async fn create(&self) -> std::result::Result<usize, CreateError> {
        Ok(self.0.fetch_add(1, Ordering::SeqCst))
    }
}

#[tokio::test]
async fn evictor_destroys_objects_past_the_idle_threshold() {
    let config = PoolConfig {
        max_total: Some(4),
        max_idle: 4,
        min_evictable_idle_duration: Some(Duration::from_millis(10)),
        time_between_eviction_runs: Some(Duration::from_millis(15)),
        num_tests_per_eviction_run: 10,
        ..Default::default()
    };
    let pool = GenericObjectPool::new(CounterFactory::new(), config).unwrap();
    pool.add_object().await.unwrap();
    pool.add_object().await.unwrap();
    assert_eq!(pool.num_idle(), 2);

    let mut evictor = Evictor::spawn(pool.clone());
    tokio::time::sleep(Duration::from_millis(60)).await;
    evictor.shutdown().await;

    assert_eq!(pool.num_idle(), 0, "both idle objects should have aged past the threshold");
    assert_eq!(pool.stats().destroyed_by_evictor, 2);
}

#[tokio::test]
async fn evictor_maintains_the_min_idle_floor() {
    let config = PoolConfig {
        max_total: Some(5),
        max_idle: 5,
        min_idle: 3,
        time_between_eviction_runs: Some(Duration::from_millis(15)),
        ..Default::default()
    };
    let pool = GenericObjectPool::new(CounterFactory::new(), config).unwrap();
    assert_eq!(pool.num_idle(), 0);

    let mut evictor = Evictor::spawn(pool.clone());
    tokio::time::sleep(Duration::from_millis(40)).await;
    evictor.shutdown().await;

    assert_eq!(pool.num_idle(), 3, "evictor should have topped idle up to min_idle");
}

#[tokio::test]
async fn abandoned_borrow_is_reclaimed_on_maintenance_and_destroyed_on_eventual_return() {
    let config = PoolConfig {
        max_total: Some(1),
        max_idle: 1,
        remove_abandoned_on_maintenance: true,
        remove_abandoned_timeout: Duration::from_millis(10),
        log_abandoned: true,
        time_between_eviction_runs: Some(Duration::from_millis(15)),
        ..Default::default()
    };
    let pool = GenericObjectPool::new(CounterFactory::new(), config).unwrap();
    let ctx = BorrowContext::new();

    let forgotten = pool.borrow(&ctx).await.unwrap();
    assert_eq!(pool.num_active(), 1);

    let mut evictor = Evictor::spawn(pool.clone());
    tokio::time::sleep(Duration::from_millis(60)).await;
    evictor.shutdown().await;

    // A subsequent borrow of a different logical slot still can't proceed
    // yet: capacity is only actually released once the forgotten guard is
    // dropped, since only then does the pool get the object back to
    // dispose of.
    drop(forgotten);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(pool.num_active(), 0, "dropping the abandoned guard must finally free its slot");
    assert!(pool.borrow(&ctx).await.is_ok());
}

#[tokio::test]
async fn mark_used_keeps_a_long_borrow_from_being_reclaimed_as_abandoned() {
    let config = PoolConfig {
        max_total: Some(1),
        max_idle: 1,
        remove_abandoned_on_maintenance: true,
        remove_abandoned_timeout: Duration::from_millis(30),
        use_usage_tracking: true,
        ..Default::default()
    };
    let pool = GenericObjectPool::new(CounterFactory::new(), config).unwrap();
    let ctx = BorrowContext::new();

    let guard = pool.borrow(&ctx).await.unwrap();

    // Each interval is under the timeout, but the total elapsed time across
    // all of them is well past it. mark_used must reset the clock every
    // time or this borrow would otherwise be flagged.
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(15)).await;
        guard.mark_used();
        assert_eq!(
            pool.sweep_abandoned().await,
            0,
            "a borrow checkpointed via mark_used must never be flagged abandoned"
        );
    }

    // Without a further checkpoint, the same borrow is now overdue.
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(
        pool.sweep_abandoned().await,
        1,
        "an un-checkpointed borrow past the timeout must be flagged abandoned"
    );

    drop(guard);
}
