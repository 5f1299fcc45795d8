//! Pool configuration: an immutable snapshot fed into an engine.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// -1 in the source tradition means "unlimited". Represented here as
/// `None` so the type system rules out accidentally treating it as a
/// numeric bound.
pub type Bound = Option<usize>;

/// Configuration for a [`GenericObjectPool`](crate::pool::GenericObjectPool)
/// or one sub-pool of a [`KeyedObjectPool`](crate::keyed_pool::KeyedObjectPool).
///
/// All fields are immutable for the lifetime of an engine instance; a
/// management interface that wants runtime tuning builds a new pool with
/// an updated config rather than mutating one in place.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolConfig {
    /// Upper bound on created − destroyed. `None` means unlimited.
    pub max_total: Bound,
    /// Upper bound on the idle deque size; excess returns destroy.
    pub max_idle: usize,
    /// Evictor tops the idle deque up to this floor.
    pub min_idle: usize,
    /// Take from the tail (LIFO) instead of the head (FIFO).
    pub lifo: bool,
    /// FIFO ordering across waiters, rather than unspecified wake order.
    pub fairness: bool,
    /// Whether `borrow` blocks (vs. failing immediately) when exhausted.
    pub block_when_exhausted: bool,
    /// Default wait used when `borrow` is called without an explicit one.
    /// `None` means block indefinitely; `Some(Duration::ZERO)` means do
    /// not block at all.
    pub max_wait: Option<Duration>,

    /// Validate newly created objects before first use.
    pub test_on_create: bool,
    /// Validate objects on borrow (`activate` then `validate`).
    pub test_on_borrow: bool,
    /// Validate objects on return.
    pub test_on_return: bool,
    /// Validate idle objects during eviction runs.
    pub test_while_idle: bool,

    /// Evictor period. `None` or non-positive disables the evictor.
    pub time_between_eviction_runs: Option<Duration>,
    /// Visits per eviction run. Positive caps the count; non-positive is
    /// interpreted as `ceil(numIdle / |n|)`.
    pub num_tests_per_eviction_run: i32,
    /// Hard idle-age eviction threshold.
    pub min_evictable_idle_duration: Option<Duration>,
    /// Soft idle-age eviction threshold, respects `min_idle`.
    pub soft_min_evictable_idle_duration: Option<Duration>,

    /// Enable the sweeper on borrow.
    pub remove_abandoned_on_borrow: bool,
    /// Enable the sweeper during maintenance (evictor) runs.
    pub remove_abandoned_on_maintenance: bool,
    /// Idle-while-borrowed threshold past which an object is considered
    /// abandoned.
    pub remove_abandoned_timeout: Duration,
    /// Emit the abandoned-object report to the log sink.
    pub log_abandoned: bool,
    /// Expect borrowers to call `use()` periodically; otherwise only
    /// `lastBorrowInstant` is considered.
    pub use_usage_tracking: bool,
    /// Capture a full backtrace (not just caller identity) on borrow/use.
    pub require_full_stack_trace: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_total: Some(8),
            max_idle: 8,
            min_idle: 0,
            lifo: true,
            fairness: false,
            block_when_exhausted: true,
            max_wait: None,

            test_on_create: false,
            test_on_borrow: false,
            test_on_return: false,
            test_while_idle: false,

            time_between_eviction_runs: None,
            num_tests_per_eviction_run: 3,
            min_evictable_idle_duration: Some(Duration::from_secs(30 * 60)),
            soft_min_evictable_idle_duration: None,

            remove_abandoned_on_borrow: false,
            remove_abandoned_on_maintenance: false,
            remove_abandoned_timeout: Duration::from_secs(5 * 60),
            log_abandoned: false,
            use_usage_tracking: false,
            require_full_stack_trace: false,
        }
    }
}

impl PoolConfig {
    /// Validate the configuration, rejecting combinations that could never
    /// behave sensibly. Zero `max_wait` is deliberately legal: it means "do
    /// not block at all". "Block indefinitely" is represented as `None`
    /// rather than a sentinel duration, so there is no negative-duration
    /// case to reject here.
    pub fn validate(&self) -> Result<()> {
        if self.max_total == Some(0) {
            return Err(Error::IllegalState(
                "max_total must be > 0 when bounded".into(),
            ));
        }
        if self.min_idle > self.max_idle {
            return Err(Error::IllegalState(
                "min_idle must not exceed max_idle".into(),
            ));
        }
        if let (Some(max_total), true) = (self.max_total, self.min_idle > 0) {
            if self.min_idle > max_total {
                return Err(Error::IllegalState(
                    "min_idle must not exceed max_total".into(),
                ));
            }
        }
        if self.remove_abandoned_timeout.is_zero()
            && (self.remove_abandoned_on_borrow || self.remove_abandoned_on_maintenance)
        {
            return Err(Error::IllegalState(
                "remove_abandoned_timeout must be > 0 when abandoned tracking is enabled".into(),
            ));
        }
        Ok(())
    }

    /// `maxTotal` as a `usize`, with unbounded represented as `usize::MAX`
    /// for arithmetic convenience at call sites that already guard on it.
    #[must_use]
    pub fn max_total_or_unbounded(&self) -> usize {
        self.max_total.unwrap_or(usize::MAX)
    }

    /// Whether the background evictor should run at all.
    #[must_use]
    pub fn eviction_enabled(&self) -> bool {
        matches!(self.time_between_eviction_runs, Some(d) if !d.is_zero())
    }

    /// Whether the abandoned-object sweeper should run at all: enabled
    /// when either `remove_abandoned_on_borrow` or
    /// `remove_abandoned_on_maintenance` is set.
    #[must_use]
    pub fn abandoned_tracking_enabled(&self) -> bool {
        self.remove_abandoned_on_borrow || self.remove_abandoned_on_maintenance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PoolConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_max_total_rejected() {
        let cfg = PoolConfig {
            max_total: Some(0),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn min_idle_exceeding_max_idle_rejected() {
        let cfg = PoolConfig {
            min_idle: 10,
            max_idle: 5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn min_idle_exceeding_max_total_rejected() {
        let cfg = PoolConfig {
            min_idle: 5,
            max_idle: 10,
            max_total: Some(3),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_max_wait_is_legal() {
        let cfg = PoolConfig {
            max_wait: Some(Duration::ZERO),
            ..Default::default()
        };
        cfg.validate().unwrap();
    }

    #[test]
    fn unlimited_max_total_is_legal() {
        let cfg = PoolConfig {
            max_total: None,
            ..Default::default()
        };
        cfg.validate().unwrap();
        assert_eq!(cfg.max_total_or_unbounded(), usize::MAX);
    }

    #[test]
    fn abandoned_timeout_zero_rejected_when_enabled() {
        let cfg = PoolConfig {
            remove_abandoned_on_borrow: true,
            remove_abandoned_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn eviction_enabled_reflects_period() {
        let mut cfg = PoolConfig::default();
        assert!(!cfg.eviction_enabled());
        cfg.time_between_eviction_runs = Some(Duration::from_secs(30));
        assert!(cfg.eviction_enabled());
        cfg.time_between_eviction_runs = Some(Duration::ZERO);
        assert!(!cfg.eviction_enabled());
    }

    #[test]
    fn abandoned_tracking_enabled_reflects_either_flag() {
        let mut cfg = PoolConfig::default();
        assert!(!cfg.abandoned_tracking_enabled());
        cfg.remove_abandoned_on_maintenance = true;
        assert!(cfg.abandoned_tracking_enabled());
    }
}
