//! TTL cache for spotwatch.
//!
//! Generic in-memory key/value store with per-entry expiry. Expired entries
//! are invisible to every read as soon as their deadline passes; a
//! [`Sweeper`] task reclaims their memory periodically.

mod cache;
mod sweeper;

pub use cache::{CacheConfig, CacheStats, Expiration, TtlCache};
pub use sweeper::{spawn_sweeper, Sweeper};
