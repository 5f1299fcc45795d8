//! Pluggable eviction decisions, dispatched dynamically so an application
//! can supply a custom policy without the engine knowing its concrete type.

use crate::config::PoolConfig;
use crate::wrapper::PooledObject;

/// What the evictor should do with a visited idle wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionVerdict {
    /// Keep the object idle.
    Keep,
    /// Destroy the object.
    Evict,
}

/// Decides whether a visited idle wrapper should be evicted.
///
/// The engine never downcasts this trait object — it only ever calls
/// [`EvictionPolicy::evaluate`] — so alternate policies can be supplied
/// without the engine knowing anything about them.
pub trait EvictionPolicy<T>: Send + Sync {
    /// `idle_count` is the number of idle objects in the pool *before*
    /// this wrapper is evicted, used to respect `min_idle`.
    fn evaluate(
        &self,
        wrapper: &PooledObject<T>,
        idle_count: usize,
        config: &PoolConfig,
    ) -> EvictionVerdict;
}

/// The default policy: evict when idle longer than
/// `min_evictable_idle_duration`, or when idle longer than
/// `soft_min_evictable_idle_duration` *and* there is idle slack above
/// `min_idle`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEvictionPolicy;

impl<T> EvictionPolicy<T> for DefaultEvictionPolicy {
    fn evaluate(
        &self,
        wrapper: &PooledObject<T>,
        idle_count: usize,
        config: &PoolConfig,
    ) -> EvictionVerdict {
        let idle_for = wrapper.idle_duration();

        if let Some(hard) = config.min_evictable_idle_duration {
            if idle_for > hard {
                return EvictionVerdict::Evict;
            }
        }

        if let Some(soft) = config.soft_min_evictable_idle_duration {
            if idle_for > soft && idle_count > config.min_idle {
                return EvictionVerdict::Evict;
            }
        }

        EvictionVerdict::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config_with(
        hard: Option<Duration>,
        soft: Option<Duration>,
        min_idle: usize,
    ) -> PoolConfig {
        PoolConfig {
            min_evictable_idle_duration: hard,
            soft_min_evictable_idle_duration: soft,
            min_idle,
            ..Default::default()
        }
    }

    #[test]
    fn fresh_object_is_kept() {
        let w = PooledObject::new(1);
        let cfg = config_with(Some(Duration::from_secs(1)), None, 0);
        assert_eq!(
            DefaultEvictionPolicy.evaluate(&w, 1, &cfg),
            EvictionVerdict::Keep
        );
    }

    #[test]
    fn hard_threshold_evicts_regardless_of_min_idle() {
        let w = PooledObject::new(1);
        std::thread::sleep(Duration::from_millis(20));
        let cfg = config_with(Some(Duration::from_millis(5)), None, 10);
        assert_eq!(
            DefaultEvictionPolicy.evaluate(&w, 1, &cfg),
            EvictionVerdict::Evict
        );
    }

    #[test]
    fn soft_threshold_respects_min_idle() {
        let w = PooledObject::new(1);
        std::thread::sleep(Duration::from_millis(20));
        let cfg = config_with(None, Some(Duration::from_millis(5)), 3);

        // idle_count == min_idle: must not evict (would drop below floor).
        assert_eq!(
            DefaultEvictionPolicy.evaluate(&w, 3, &cfg),
            EvictionVerdict::Keep
        );
        // idle_count > min_idle: may evict.
        assert_eq!(
            DefaultEvictionPolicy.evaluate(&w, 4, &cfg),
            EvictionVerdict::Evict
        );
    }

    #[test]
    fn no_thresholds_configured_never_evicts() {
        let w = PooledObject::new(1);
        std::thread::sleep(Duration::from_millis(20));
        let cfg = config_with(None, None, 0);
        assert_eq!(
            DefaultEvictionPolicy.evaluate(&w, 1, &cfg),
            EvictionVerdict::Keep
        );
    }
}
