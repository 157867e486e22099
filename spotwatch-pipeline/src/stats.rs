//! Per-handler counters, returned as the handler's completion payload.

/// What a handler did over its lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HandlerStats {
    /// Messages taken off the channel
    pub received: u64,
    /// Registry upserts (creation) or counted interruptions
    pub applied: u64,
    /// Messages that failed to parse
    pub malformed: u64,
    /// Redeliveries skipped by the dedup cache
    pub duplicates: u64,
    /// Interruptions whose resource had no registry entry
    pub unknown_cluster: u64,
}

impl HandlerStats {
    /// Messages that were received but had no effect.
    pub fn skipped(&self) -> u64 {
        self.malformed + self.duplicates + self.unknown_cluster
    }
}
