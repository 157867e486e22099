//! Creation stream handler.

use spotwatch_core::types::{CreationEvent, RawMessage};
use spotwatch_events::EventParser;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::registry::InstanceRegistry;
use crate::stats::HandlerStats;

/// Result of handling one creation message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreationOutcome {
    /// The registry now maps the event's resource to its cluster.
    Registered(CreationEvent),
    /// The message could not be parsed and was dropped.
    Malformed,
}

/// Keeps the registry current with newly created instances.
///
/// No deduplication: a repeated creation message rewrites the same mapping.
pub struct CreationHandler {
    registry: InstanceRegistry,
    parser: EventParser,
}

impl CreationHandler {
    /// Creates a handler writing into `registry`.
    pub fn new(registry: InstanceRegistry, parser: EventParser) -> Self {
        Self { registry, parser }
    }

    /// Processes a single message.
    pub fn handle(&self, msg: &RawMessage) -> CreationOutcome {
        let event = match self.parser.parse_creation(msg) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    message_id = %msg.id,
                    error = %e,
                    "Failed to convert message to creation event"
                );
                return CreationOutcome::Malformed;
            }
        };

        self.registry.upsert(&event.resource_id, &event.cluster_name);
        info!(
            message_id = %event.message_id,
            resource_id = %event.resource_id,
            kubernetes_cluster = %event.cluster_name,
            "Added"
        );

        CreationOutcome::Registered(event)
    }

    /// Consumes `rx` until it is closed, then returns what was done.
    pub async fn run(self, mut rx: mpsc::Receiver<RawMessage>) -> HandlerStats {
        let mut stats = HandlerStats::default();
        info!(
            cluster_label = self.parser.cluster_label_key(),
            "Creation handler started"
        );

        while let Some(msg) = rx.recv().await {
            stats.received += 1;
            match self.handle(&msg) {
                CreationOutcome::Registered(_) => stats.applied += 1,
                CreationOutcome::Malformed => stats.malformed += 1,
            }
        }

        info!(
            received = stats.received,
            added = stats.applied,
            malformed = stats.malformed,
            "Creation handler stopped"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn creation_message(id: &str, resource: &str, cluster: &str) -> RawMessage {
        let body = json!({
            "protoPayload": {
                "request": { "labels": [{ "key": "goog-k8s-cluster-name", "value": cluster }] },
                "response": {
                    "targetLink": format!("https://www.googleapis.com/compute/v1/{resource}")
                }
            }
        });
        RawMessage::new(id, body.to_string())
    }

    fn handler(registry: &InstanceRegistry) -> CreationHandler {
        CreationHandler::new(registry.clone(), EventParser::default())
    }

    #[test]
    fn test_handle_registers_instance() {
        let registry = InstanceRegistry::default();
        let outcome = handler(&registry).handle(&creation_message("m1", "instances/i-1", "cluster-a"));

        assert!(matches!(outcome, CreationOutcome::Registered(ref e) if e.resource_id == "instances/i-1"));
        assert_eq!(registry.cluster_for("instances/i-1").as_deref(), Some("cluster-a"));
    }

    #[test]
    fn test_handle_malformed_leaves_registry_untouched() {
        let registry = InstanceRegistry::default();
        let outcome = handler(&registry).handle(&RawMessage::new("m1", "{}"));
        assert_eq!(outcome, CreationOutcome::Malformed);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_run_until_closed() {
        let seed = HashMap::from([("fake-instance".to_string(), "fake-cluster".to_string())]);
        let registry = InstanceRegistry::seeded(seed, &Default::default());
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(handler(&registry).run(rx));

        tx.send(creation_message("m1", "instances/i-2", "cluster-b")).await.unwrap();
        tx.send(RawMessage::new("m2", "garbage")).await.unwrap();
        tx.send(creation_message("m3", "instances/i-2", "cluster-c")).await.unwrap();
        drop(tx);

        let stats = task.await.unwrap();
        assert_eq!(stats.received, 3);
        assert_eq!(stats.applied, 2);
        assert_eq!(stats.malformed, 1);

        assert_eq!(registry.cluster_for("instances/i-2").as_deref(), Some("cluster-c"));
        assert_eq!(registry.cluster_for("fake-instance").as_deref(), Some("fake-cluster"));
    }
}
