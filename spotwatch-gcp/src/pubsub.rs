//! Pub/Sub pull subscription.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

use spotwatch_core::error::{Result, SpotwatchError};
use spotwatch_core::shutdown::{is_shutdown, shutdown_requested};
use spotwatch_core::traits::MessageSource;
use spotwatch_core::types::RawMessage;

use crate::client::GcpClient;

/// Tuning of the pull loop.
#[derive(Clone, Copy, Debug)]
pub struct PullSettings {
    /// Upper bound of messages per pull
    pub max_messages: u32,
    /// Pause after a pull that returned nothing
    pub empty_backoff: Duration,
    /// First pause after a failed request
    pub initial_backoff: Duration,
    /// Cap of the doubling failure backoff
    pub max_backoff: Duration,
    /// Failures in a row after which the subscription gives up
    pub max_consecutive_failures: u32,
}

impl Default for PullSettings {
    fn default() -> Self {
        Self {
            max_messages: 100,
            empty_backoff: Duration::from_secs(1),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            max_consecutive_failures: 5,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WIRE TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PullRequest {
    max_messages: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullResponse {
    #[serde(default)]
    received_messages: Vec<ReceivedMessage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceivedMessage {
    ack_id: String,
    message: PubsubMessage,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PubsubMessage {
    message_id: String,
    #[serde(default)]
    data: String,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AcknowledgeRequest<'a> {
    ack_ids: Vec<&'a str>,
}

#[derive(Deserialize)]
struct Empty {}

// ═══════════════════════════════════════════════════════════════════════════════
// SUBSCRIPTION
// ═══════════════════════════════════════════════════════════════════════════════

/// A pull subscription that acks each message before handing it off.
///
/// Acknowledging first means a message is redelivered only when its ack is
/// lost, and the handlers' deduplication absorbs those redeliveries.
pub struct PubSubSubscription {
    client: GcpClient,
    name: String,
    settings: PullSettings,
}

impl PubSubSubscription {
    /// Creates a subscription handle for `name` in the client's project.
    pub fn new(client: GcpClient, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
            settings: PullSettings::default(),
        }
    }

    /// Replaces the pull loop settings.
    pub fn with_settings(mut self, settings: PullSettings) -> Self {
        self.settings = settings;
        self
    }

    fn url(&self, verb: &str) -> String {
        let config = self.client.config();
        format!(
            "{}/v1/projects/{}/subscriptions/{}:{}",
            config.pubsub_endpoint.trim_end_matches('/'),
            config.project,
            self.name,
            verb
        )
    }

    async fn pull(&self) -> Result<Vec<ReceivedMessage>> {
        let request = PullRequest {
            max_messages: self.settings.max_messages,
        };
        let response: PullResponse = self.client.post_json(&self.url("pull"), &request).await?;
        Ok(response.received_messages)
    }

    async fn acknowledge(&self, messages: &[ReceivedMessage]) -> Result<()> {
        let request = AcknowledgeRequest {
            ack_ids: messages.iter().map(|m| m.ack_id.as_str()).collect(),
        };
        let _: Empty = self
            .client
            .post_json(&self.url("acknowledge"), &request)
            .await?;
        Ok(())
    }

    /// Acks and forwards one batch. Returns `false` once the receiver is gone.
    async fn forward(
        &self,
        batch: Vec<ReceivedMessage>,
        tx: &mpsc::Sender<RawMessage>,
    ) -> Result<bool> {
        self.acknowledge(&batch).await?;
        debug!(subscription = %self.name, count = batch.len(), "Acknowledged messages");

        for received in batch {
            let msg = received.message;
            let raw = match RawMessage::from_base64(msg.message_id.clone(), &msg.data) {
                Ok(raw) => raw.with_attributes(msg.attributes),
                Err(e) => {
                    warn!(
                        subscription = %self.name,
                        message_id = %msg.message_id,
                        error = %e,
                        "Dropping message with undecodable payload"
                    );
                    continue;
                }
            };
            if tx.send(raw).await.is_err() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Sleeps for `duration`. Returns `true` if shutdown was requested instead.
    async fn pause(&self, duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = shutdown_requested(shutdown) => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }
}

#[async_trait]
impl MessageSource for PubSubSubscription {
    #[instrument(skip_all, fields(subscription = %self.name))]
    async fn receive(
        &self,
        tx: mpsc::Sender<RawMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        info!("Receiving messages");
        let mut failures = 0u32;
        let mut backoff = self.settings.initial_backoff;

        while !is_shutdown(&shutdown) {
            let pulled = tokio::select! {
                _ = shutdown_requested(&mut shutdown) => break,
                pulled = self.pull() => pulled,
            };

            let outcome = match pulled {
                Ok(batch) if batch.is_empty() => {
                    failures = 0;
                    backoff = self.settings.initial_backoff;
                    if self.pause(self.settings.empty_backoff, &mut shutdown).await {
                        break;
                    }
                    continue;
                }
                Ok(batch) => self.forward(batch, &tx).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(true) => {
                    failures = 0;
                    backoff = self.settings.initial_backoff;
                }
                Ok(false) => {
                    warn!("Handler channel closed, stopping");
                    return Ok(());
                }
                Err(e) => {
                    failures += 1;
                    if failures >= self.settings.max_consecutive_failures {
                        return Err(SpotwatchError::Transport {
                            subscription: self.name.clone(),
                            reason: format!("{failures} consecutive failures, last: {e}"),
                        });
                    }
                    warn!(error = %e, failures, retry_in = ?backoff, "Pull failed, retrying");
                    if self.pause(backoff, &mut shutdown).await {
                        break;
                    }
                    backoff = (backoff * 2).min(self.settings.max_backoff);
                }
            }
        }

        info!("Stopped receiving messages");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
