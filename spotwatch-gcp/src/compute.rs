//! Compute Engine instance inventory.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use spotwatch_core::constants::CLUSTER_NAME_LABEL_KEY;
use spotwatch_core::error::Result;
use spotwatch_core::traits::InstanceInventory;
use spotwatch_core::types::normalize_resource_id;

use crate::client::GcpClient;

/// Lists every instance of a project that carries the cluster label.
pub struct ComputeInventory {
    client: GcpClient,
    cluster_label_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregatedList {
    #[serde(default)]
    items: HashMap<String, ScopedList>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ScopedList {
    #[serde(default)]
    instances: Vec<Instance>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Instance {
    self_link: String,
    #[serde(default)]
    labels: HashMap<String, String>,
}

impl ComputeInventory {
    /// Creates an inventory reading the default GKE cluster label.
    pub fn new(client: GcpClient) -> Self {
        Self::with_label(client, CLUSTER_NAME_LABEL_KEY)
    }

    /// Creates an inventory reading `cluster_label_key`.
    pub fn with_label(client: GcpClient, cluster_label_key: impl Into<String>) -> Self {
        Self {
            client,
            cluster_label_key: cluster_label_key.into(),
        }
    }

    fn url(&self) -> String {
        let config = self.client.config();
        format!(
            "{}/compute/v1/projects/{}/aggregated/instances",
            config.compute_endpoint.trim_end_matches('/'),
            config.project
        )
    }
}

#[async_trait]
impl InstanceInventory for ComputeInventory {
    #[instrument(skip(self), fields(project = %self.client.config().project))]
    async fn list_cluster_instances(&self) -> Result<HashMap<String, String>> {
        let url = self.url();
        let filter = format!("labels.{}:*", self.cluster_label_key);
        let mut instances = HashMap::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut query = vec![("filter", filter.as_str())];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: AggregatedList = self.client.get_json(&url, &query).await?;
            pages += 1;

            for instance in page.items.into_values().flat_map(|scope| scope.instances) {
                let Some(cluster) = cluster_label(&instance.labels, &self.cluster_label_key) else {
                    debug!(self_link = %instance.self_link, "Skipping instance without cluster label");
                    continue;
                };
                instances.insert(normalize_resource_id(&instance.self_link), cluster.to_owned());
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(instances = instances.len(), pages, "Listed cluster instances");
        Ok(instances)
    }
}

/// Non-empty value of `key`, matched case-insensitively like creation labels.
fn cluster_label<'a>(labels: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    labels
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}
