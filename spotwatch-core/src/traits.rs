//! Collaborator traits for spotwatch.
//!
//! The pipeline only sees these boundaries; Google Cloud clients and the
//! Prometheus exporter implement them, and tests substitute in-memory fakes.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::error::Result;
use crate::types::RawMessage;

// ═══════════════════════════════════════════════════════════════════════════════
// METRICS SINK
// ═══════════════════════════════════════════════════════════════════════════════

/// Receives one call per logically distinct interruption.
///
/// Constructed once at startup and shared by reference; implementations must
/// be cheap and non-blocking since they are called from the handler loop.
pub trait MetricsSink: Send + Sync {
    /// Increments the interruption counter for `cluster`.
    ///
    /// `resource_id` is passed along for deployments that also label by
    /// resource; sinks that do not are free to ignore it.
    fn increment_interruptions(&self, cluster: &str, resource_id: &str);
}

// ═══════════════════════════════════════════════════════════════════════════════
// INSTANCE INVENTORY
// ═══════════════════════════════════════════════════════════════════════════════

/// One-shot source of the startup registry snapshot.
#[async_trait]
pub trait InstanceInventory: Send + Sync {
    /// Returns every current instance that belongs to a Kubernetes cluster,
    /// as normalized resource id → cluster name.
    async fn list_cluster_instances(&self) -> Result<HashMap<String, String>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// MESSAGE SOURCE
// ═══════════════════════════════════════════════════════════════════════════════

/// A subscription that pushes raw messages into a bounded channel.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Receives until `shutdown` turns true or the transport fails.
    ///
    /// The sender is consumed; returning drops it, which closes the channel
    /// and is the only stop signal the consuming handler sees. Sending waits
    /// for channel capacity.
    async fn receive(
        &self,
        tx: mpsc::Sender<RawMessage>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()>;

    /// Human-readable name used in logs.
    fn name(&self) -> &str;
}
