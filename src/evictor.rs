//! Background eviction task: a cancellable loop spawned onto the ambient
//! Tokio runtime, ticking on a fixed period and shut down cooperatively
//! rather than by aborting the task.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::factory::PooledObjectFactory;
use crate::pool::GenericObjectPool;

/// Owns the background eviction task for one [`GenericObjectPool`].
/// Dropping this without calling [`Evictor::shutdown`] leaves the task
/// running — call `shutdown` to stop it deterministically.
pub struct Evictor {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Evictor {
    /// Start the periodic eviction loop if `time_between_eviction_runs` is
    /// configured and positive; otherwise returns an `Evictor` that owns no
    /// task (`shutdown` is then a no-op).
    pub fn spawn<T, F>(pool: GenericObjectPool<T, F>) -> Self
    where
        T: Send + 'static,
        F: PooledObjectFactory<T>,
    {
        let cancel = CancellationToken::new();
        let period = pool.config().time_between_eviction_runs;

        let handle = period.filter(|d| !d.is_zero()).map(|period| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        () = cancel.cancelled() => {
                            tracing::debug!("evictor task stopping");
                            return;
                        }
                        () = tokio::time::sleep(period) => {
                            pool.run_eviction_pass().await;
                        }
                    }
                }
            })
        });

        Self { cancel, handle }
    }

    /// Signal the task to stop and wait for it to finish. Idempotent.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Evictor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Wraps an [`Evictor`] so multiple holders can share ownership of the
/// background task without introducing a second thread pool: the task
/// still runs on the ambient Tokio runtime, just with its lifetime
/// ref-counted rather than owned by a single pool.
#[derive(Clone)]
pub struct SharedEvictor(Arc<tokio::sync::Mutex<Evictor>>);

impl SharedEvictor {
    #[must_use]
    pub fn new<T, F>(pool: GenericObjectPool<T, F>) -> Self
    where
        T: Send + 'static,
        F: PooledObjectFactory<T>,
    {
        Self(Arc::new(tokio::sync::Mutex::new(Evictor::spawn(pool))))
    }

    pub async fn shutdown(&self) {
        self.0.lock().await.shutdown().await;
    }
}
