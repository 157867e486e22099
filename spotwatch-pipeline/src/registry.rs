//! The instance registry and the interruption dedup cache.
//!
//! Both are thin, purpose-named views over [`TtlCache`]. Clones share the
//! same underlying cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use spotwatch_cache::{spawn_sweeper, CacheConfig, CacheStats, Expiration, Sweeper, TtlCache};
use spotwatch_core::error::Result;

/// Ephemeral resource id → cluster name mapping.
///
/// Entries never expire until an interruption starts their grace period;
/// after that the cache's own expiry removes them. There is no delete.
#[derive(Clone)]
pub struct InstanceRegistry {
    cache: Arc<TtlCache<String>>,
}

impl InstanceRegistry {
    /// Creates an empty registry.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            cache: Arc::new(TtlCache::with_config(CacheConfig {
                default_expiration: Expiration::Never,
                ..*config
            })),
        }
    }

    /// Creates a registry seeded from an inventory snapshot.
    pub fn seeded(snapshot: HashMap<String, String>, config: &CacheConfig) -> Self {
        let count = snapshot.len();
        let cache = TtlCache::from_entries(
            CacheConfig {
                default_expiration: Expiration::Never,
                ..*config
            },
            snapshot,
            Expiration::Never,
        );
        debug!(instances = count, "Seeded instance registry");

        Self {
            cache: Arc::new(cache),
        }
    }

    /// Maps `resource_id` to `cluster_name`, replacing any previous mapping
    /// and clearing any running grace period.
    pub fn upsert(&self, resource_id: &str, cluster_name: &str) {
        self.cache
            .insert(resource_id, cluster_name.to_string(), Expiration::Never);
    }

    /// Returns the cluster of a live entry.
    pub fn cluster_for(&self, resource_id: &str) -> Option<String> {
        self.cache.get(resource_id)
    }

    /// Returns true if `resource_id` has a live entry.
    pub fn contains(&self, resource_id: &str) -> bool {
        self.cache.exists(resource_id)
    }

    /// Gives a live entry a finite lifetime of `grace` from now.
    ///
    /// Fails with `KeyNotFound` if the entry is absent or already expired.
    pub fn begin_grace_period(&self, resource_id: &str, grace: Duration) -> Result<()> {
        self.cache.set_expiration(resource_id, grace)
    }

    /// Copies out every live mapping.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.cache.snapshot()
    }

    /// Returns the number of stored entries, expired-but-unpurged included.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Returns statistics of the underlying cache.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Starts the background purge at the configured sweep interval.
    pub fn spawn_sweeper(&self) -> Sweeper {
        spawn_sweeper(&self.cache, self.cache.config().sweep_interval)
    }
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

/// Message ids recently processed by the interruption handler.
///
/// Presence is all that matters; every id lives for exactly `window` from
/// when it was first marked and is never re-armed.
#[derive(Clone)]
pub struct DedupCache {
    seen: Arc<TtlCache<()>>,
    window: Duration,
}

impl DedupCache {
    /// Creates an empty dedup cache with a fixed `window`.
    pub fn new(window: Duration, sweep_interval: Duration) -> Self {
        Self {
            seen: Arc::new(TtlCache::with_config(CacheConfig {
                default_expiration: Expiration::After(window),
                sweep_interval,
            })),
            window,
        }
    }

    /// Returns true if `message_id` was marked within the window.
    pub fn is_duplicate(&self, message_id: &str) -> bool {
        self.seen.exists(message_id)
    }

    /// Marks `message_id` as processed.
    pub fn mark_seen(&self, message_id: &str) {
        self.seen.insert_default(message_id, ());
    }

    /// Returns the dedup window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns the number of remembered ids, expired-but-unpurged included.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns true if no ids are remembered.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Starts the background purge at the configured sweep interval.
    pub fn spawn_sweeper(&self) -> Sweeper {
        spawn_sweeper(&self.seen, self.seen.config().sweep_interval)
    }
}
