//! Interruption stream handler.

use std::sync::Arc;
use std::time::Duration;

use spotwatch_core::traits::MetricsSink;
use spotwatch_core::types::RawMessage;
use spotwatch_events::EventParser;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::registry::{DedupCache, InstanceRegistry};
use crate::stats::HandlerStats;

/// Result of handling one interruption message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InterruptionOutcome {
    /// The counter for `cluster` was incremented.
    Counted {
        /// Cluster the interrupted instance belonged to
        cluster: String,
    },
    /// The message id was already processed within the dedup window.
    Duplicate,
    /// No registry entry for the resource; nothing was counted.
    UnknownCluster,
    /// The message could not be parsed and was dropped.
    Malformed,
}

/// Counts interruptions per cluster, exactly once per message id.
pub struct InterruptionHandler {
    registry: InstanceRegistry,
    dedup: DedupCache,
    metrics: Arc<dyn MetricsSink>,
    parser: EventParser,
    grace_period: Duration,
}

impl InterruptionHandler {
    /// Creates a handler that owns `dedup` and shares `registry`.
    pub fn new(
        registry: InstanceRegistry,
        dedup: DedupCache,
        metrics: Arc<dyn MetricsSink>,
        parser: EventParser,
        grace_period: Duration,
    ) -> Self {
        Self {
            registry,
            dedup,
            metrics,
            parser,
            grace_period,
        }
    }

    /// Processes a single message.
    ///
    /// The id is marked seen before the registry lookup, so a redelivery of
    /// a message that hit an unknown resource is not retried either.
    pub fn handle(&self, msg: &RawMessage) -> InterruptionOutcome {
        let event = match self.parser.parse_interruption(msg) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    message_id = %msg.id,
                    error = %e,
                    "Failed to convert message to interruption event"
                );
                return InterruptionOutcome::Malformed;
            }
        };

        if self.dedup.is_duplicate(&event.message_id) {
            debug!(
                message_id = %event.message_id,
                resource_id = %event.resource_id,
                "Handled duplicate message"
            );
            return InterruptionOutcome::Duplicate;
        }
        self.dedup.mark_seen(&event.message_id);

        let Some(cluster) = self.registry.cluster_for(&event.resource_id) else {
            warn!(
                message_id = %event.message_id,
                resource_id = %event.resource_id,
                "Cluster unknown for resource"
            );
            return InterruptionOutcome::UnknownCluster;
        };

        self.metrics
            .increment_interruptions(&cluster, &event.resource_id);
        info!(
            message_id = %event.message_id,
            resource_id = %event.resource_id,
            kubernetes_cluster = %cluster,
            "Interrupted"
        );

        match self
            .registry
            .begin_grace_period(&event.resource_id, self.grace_period)
        {
            Ok(()) => debug!(
                resource_id = %event.resource_id,
                grace_period = ?self.grace_period,
                "Resource will no longer be tracked after grace period"
            ),
            Err(e) => warn!(
                resource_id = %event.resource_id,
                error = %e,
                "Failed to start grace period for resource"
            ),
        }

        InterruptionOutcome::Counted { cluster }
    }

    /// Consumes `rx` until it is closed, then returns what was done.
    pub async fn run(self, mut rx: mpsc::Receiver<RawMessage>) -> HandlerStats {
        let mut stats = HandlerStats::default();
        info!(
            dedup_window = ?self.dedup.window(),
            grace_period = ?self.grace_period,
            "Interruption handler started"
        );

        while let Some(msg) = rx.recv().await {
            stats.received += 1;
            match self.handle(&msg) {
                InterruptionOutcome::Counted { .. } => stats.applied += 1,
                InterruptionOutcome::Duplicate => stats.duplicates += 1,
                InterruptionOutcome::UnknownCluster => stats.unknown_cluster += 1,
                InterruptionOutcome::Malformed => stats.malformed += 1,
            }
        }

        info!(
            received = stats.received,
            interrupted = stats.applied,
            duplicates = stats.duplicates,
            unknown_cluster = stats.unknown_cluster,
            malformed = stats.malformed,
            "Interruption handler stopped"
        );
        stats
    }
}
