//! In-memory TTL cache.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;

use spotwatch_core::constants::DEFAULT_SWEEP_INTERVAL;
use spotwatch_core::error::{Result, SpotwatchError};

/// Lifetime of a cache entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expiration {
    /// Entry lives until overwritten with a finite TTL.
    Never,
    /// Entry becomes invisible once this much time has passed.
    After(Duration),
}

impl Expiration {
    /// Absolute deadline for an entry written at `now`.
    ///
    /// A TTL too large to represent is treated as never expiring.
    fn deadline(self, now: Instant) -> Option<Instant> {
        match self {
            Expiration::Never => None,
            Expiration::After(ttl) => now.checked_add(ttl),
        }
    }
}

impl From<Duration> for Expiration {
    fn from(ttl: Duration) -> Self {
        Expiration::After(ttl)
    }
}

/// Cache entry with an absolute deadline.
#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if now >= deadline)
    }
}

/// Cache configuration.
#[derive(Clone, Copy, Debug)]
pub struct CacheConfig {
    /// Expiration applied by [`TtlCache::insert_default`]
    pub default_expiration: Expiration,
    /// Interval of the background sweep, see [`crate::spawn_sweeper`]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_expiration: Expiration::Never,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Concurrent key/value cache with per-entry expiry.
///
/// Expiry is checked lazily on every read, so an entry past its deadline is
/// never returned even before the sweeper has removed it. All operations
/// take a single lock and are linearizable per key.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    config: CacheConfig,
}

impl<V> TtlCache<V> {
    /// Creates an empty cache whose default expiration is `default_expiration`.
    pub fn new(default_expiration: Expiration) -> Self {
        Self::with_config(CacheConfig {
            default_expiration,
            ..CacheConfig::default()
        })
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Creates a cache pre-populated with `items`, each given `expiration`.
    pub fn from_entries<I, K>(config: CacheConfig, items: I, expiration: Expiration) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
    {
        let now = Instant::now();
        let deadline = expiration.deadline(now);
        let entries = items
            .into_iter()
            .map(|(k, value)| {
                (
                    k.into(),
                    CacheEntry {
                        value,
                        expires_at: deadline,
                    },
                )
            })
            .collect();

        Self {
            entries: RwLock::new(entries),
            config,
        }
    }

    /// Returns the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Inserts or overwrites `key`; the expiry is reset to `ttl`.
    pub fn insert(&self, key: impl Into<String>, value: V, ttl: impl Into<Expiration>) {
        let expires_at = ttl.into().deadline(Instant::now());
        self.entries
            .write()
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Inserts or overwrites `key` with the configured default expiration.
    pub fn insert_default(&self, key: impl Into<String>, value: V) {
        self.insert(key, value, self.config.default_expiration);
    }

    /// Returns true if `key` is present and not expired.
    pub fn exists(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .is_some_and(|e| !e.is_expired(now))
    }

    /// Re-arms the expiry of a live entry without touching its value.
    ///
    /// Fails with [`SpotwatchError::KeyNotFound`] if the key is absent or
    /// already expired; the key is never created.
    pub fn set_expiration(&self, key: &str, ttl: impl Into<Expiration>) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.write();

        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.expires_at = ttl.into().deadline(now);
                Ok(())
            }
            Some(_) => {
                entries.remove(key);
                Err(SpotwatchError::KeyNotFound(key.to_string()))
            }
            None => Err(SpotwatchError::KeyNotFound(key.to_string())),
        }
    }

    /// Removes all expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        before - entries.len()
    }

    /// Returns the number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.read();
        let expired = entries.values().filter(|e| e.is_expired(now)).count();
        let persistent = entries.values().filter(|e| e.expires_at.is_none()).count();
        CacheStats {
            total_entries: entries.len(),
            expired_entries: expired,
            live_entries: entries.len().saturating_sub(expired),
            persistent_entries: persistent,
        }
    }
}

impl<V: Clone> TtlCache<V> {
    /// Returns the value for `key` if present and not expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.entries.read().get(key).and_then(|e| {
            if e.is_expired(now) {
                None
            } else {
                Some(e.value.clone())
            }
        })
    }

    /// Copies out every live entry.
    pub fn snapshot(&self) -> HashMap<String, V> {
        let now = Instant::now();
        self.entries
            .read()
            .iter()
            .filter(|(_, e)| !e.is_expired(now))
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect()
    }
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self::with_config(CacheConfig::default())
    }
}

/// Cache statistics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub live_entries: usize,
    pub persistent_entries: usize,
}
