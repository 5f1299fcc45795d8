//! Process-wide maintenance bookkeeping.
//!
//! A dedicated shared background-thread pool that every
//! `GenericObjectPool`/`KeyedObjectPool` instance in a process borrows
//! from has no equivalent notion of "the" thread pool to attach to on the
//! ambient Tokio runtime, so this registry instead keeps a
//! reference-counted list of the [`Evictor`] tasks it was handed, letting
//! an application shut every pool's maintenance task down from one place
//! without owning each pool directly.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::evictor::Evictor;

/// A shared handle for the background maintenance tasks of however many
/// pools an application wants grouped together.
#[derive(Clone)]
pub struct MaintenanceRegistry {
    evictors: Arc<Mutex<Vec<Evictor>>>,
}

impl MaintenanceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            evictors: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Take ownership of `evictor`'s lifetime. It is shut down, along
    /// with every other registered task, on [`Self::shutdown_all`].
    pub fn register(&self, evictor: Evictor) {
        self.evictors.lock().push(evictor);
    }

    /// Shut down and forget every registered task. Idempotent.
    pub async fn shutdown_all(&self) {
        let mut evictors = std::mem::take(&mut *self.evictors.lock());
        for evictor in &mut evictors {
            evictor.shutdown().await;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.evictors.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MaintenanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::factory::{CreateError, PooledObjectFactory};
    use crate::pool::GenericObjectPool;
    use async_trait::async_trait;
    use std::time::Duration;

    struct NoopFactory;

    #[async_trait]
    impl PooledObjectFactory<()> for NoopFactory {
        async fn create(&self) -> std::result::Result<(), CreateError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn registry_tracks_and_shuts_down_evictors() {
        let registry = MaintenanceRegistry::new();
        assert!(registry.is_empty());

        let config = PoolConfig {
            time_between_eviction_runs: Some(Duration::from_millis(10)),
            ..Default::default()
        };
        let pool = GenericObjectPool::new(NoopFactory, config).unwrap();
        registry.register(Evictor::spawn(pool));
        assert_eq!(registry.len(), 1);

        registry.shutdown_all().await;
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn clones_share_the_same_registrations() {
        let registry = MaintenanceRegistry::new();
        let clone = registry.clone();
        let pool = GenericObjectPool::new(NoopFactory, PoolConfig::default()).unwrap();
        registry.register(Evictor::spawn(pool));
        assert_eq!(clone.len(), 1);
    }
}
