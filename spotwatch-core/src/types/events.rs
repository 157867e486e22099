//! Lifecycle events derived from transport messages.
//!
//! Both are transient: they live for the duration of one handler step and
//! only their effect on the registry, the dedup cache and the counter
//! persists.

use serde::Serialize;

use crate::constants::COMPUTE_API_PREFIX;

/// An instance carrying a cluster label was created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CreationEvent {
    /// Transport message id
    pub message_id: String,
    /// Normalized resource id, e.g. `projects/p/zones/z/instances/name`
    pub resource_id: String,
    /// Kubernetes cluster the instance belongs to
    pub cluster_name: String,
}

/// An instance was preempted by the provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InterruptionEvent {
    /// Transport message id
    pub message_id: String,
    /// Normalized resource id
    pub resource_id: String,
}

/// Strips the Compute API prefix from a self-link, leaving the resource path.
///
/// Ids that are already paths pass through unchanged, so the function is
/// idempotent.
pub fn normalize_resource_id(link: &str) -> String {
    let trimmed = link.trim();
    trimmed
        .strip_prefix(COMPUTE_API_PREFIX)
        .unwrap_or(trimmed)
        .to_string()
}
