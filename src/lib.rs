//! Generic and keyed object pools with background eviction and abandoned-
//! object reclamation.
//!
//! The entry points are [`GenericObjectPool`] for a single unkeyed pool and
//! [`KeyedObjectPool`] for a pool partitioned by key. Both hand out
//! [`PoolGuard`]s: drop one to return the object, or call
//! [`PoolGuard::invalidate`] to discard it instead.

pub mod abandoned;
pub mod config;
pub mod context;
pub mod error;
pub mod eviction_policy;
pub mod evictor;
pub mod factory;
pub mod guard;
pub mod keyed_pool;
pub mod pool;
pub mod runtime;
pub mod testing;
pub mod wrapper;

pub use config::{Bound, PoolConfig};
pub use context::BorrowContext;
pub use error::{Error, Result};
pub use eviction_policy::{DefaultEvictionPolicy, EvictionPolicy, EvictionVerdict};
pub use evictor::{Evictor, SharedEvictor};
pub use factory::{CreateError, DestroyReason, KeyedPooledObjectFactory, PooledObjectFactory};
pub use guard::PoolGuard;
pub use keyed_pool::{KeyedObjectPool, KeyedPoolConfig};
pub use pool::{GenericObjectPool, PoolStats};
pub use runtime::MaintenanceRegistry;
pub use wrapper::{CallSite, ObjectState, PooledObject};
