//! Background reclamation of expired entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::cache::TtlCache;

/// Handle to a running sweep task. Dropping it stops the task.
#[derive(Debug)]
pub struct Sweeper {
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Stops the sweep task.
    pub fn stop(self) {
        self.handle.abort();
        debug!("Cache sweeper stopped");
    }

    /// Returns true once the task has exited (cache dropped or aborted).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawns a task that purges expired entries of `cache` every `interval`.
///
/// The task holds only a weak reference and exits on its own once the cache
/// is dropped. Must be called from within a tokio runtime.
pub fn spawn_sweeper<V>(cache: &Arc<TtlCache<V>>, interval: Duration) -> Sweeper
where
    V: Send + Sync + 'static,
{
    let weak = Arc::downgrade(cache);
    let period = interval.max(Duration::from_millis(1));

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(cache) = weak.upgrade() else {
                break;
            };
            let purged = cache.purge_expired();
            if purged > 0 {
                debug!(purged, remaining = cache.len(), "Purged expired cache entries");
            }
        }
    });

    Sweeper { handle }
}
