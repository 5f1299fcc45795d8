//! A small in-memory factory test double, so downstream integration tests
//! (and this crate's own) don't each hand-roll one.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::factory::{CreateError, PooledObjectFactory};

/// Hands out sequential `usize` ids. `set_fail_create`/`set_valid` let a
/// test flip failure modes on mid-run to exercise the pool's create- and
/// validation-failure paths without a bespoke factory per scenario.
pub struct CountingFactory {
    next_id: AtomicUsize,
    fail_create: AtomicBool,
    valid: AtomicBool,
}

impl CountingFactory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicUsize::new(0),
            fail_create: AtomicBool::new(false),
            valid: AtomicBool::new(true),
        }
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_valid(&self, valid: bool) {
        self.valid.store(valid, Ordering::SeqCst);
    }

    #[must_use]
    pub fn created_count(&self) -> usize {
        self.next_id.load(Ordering::SeqCst)
    }
}

impl Default for CountingFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PooledObjectFactory<usize> for CountingFactory {
    async fn create(&self) -> std::result::Result<usize, CreateError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err("forced create failure".into());
        }
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn validate(&self, _instance: &usize) -> bool {
        self.valid.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_sequential_ids() {
        let factory = CountingFactory::new();
        assert_eq!(factory.create().await.unwrap(), 0);
        assert_eq!(factory.create().await.unwrap(), 1);
        assert_eq!(factory.created_count(), 2);
    }

    #[tokio::test]
    async fn fail_create_flag_forces_errors() {
        let factory = CountingFactory::new();
        factory.set_fail_create(true);
        assert!(factory.create().await.is_err());
    }

    #[tokio::test]
    async fn valid_flag_controls_validation() {
        let factory = CountingFactory::new();
        let id = factory.create().await.unwrap();
        assert!(factory.validate(&id).await);
        factory.set_valid(false);
        assert!(!factory.validate(&id).await);
    }
}
