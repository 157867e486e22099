//! Constants and defaults for spotwatch.
//!
//! Durations here are defaults only; the binary exposes each of them as
//! configuration.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// GOOGLE CLOUD
// ═══════════════════════════════════════════════════════════════════════════════

/// Label GKE puts on every node VM, holding the owning cluster's name.
pub const CLUSTER_NAME_LABEL_KEY: &str = "goog-k8s-cluster-name";

/// Prefix of Compute Engine self-links. Resource ids are stored without it so
/// that inventory self-links and audit-log resource names compare equal.
pub const COMPUTE_API_PREFIX: &str = "https://www.googleapis.com/compute/v1/";

// ═══════════════════════════════════════════════════════════════════════════════
// PIPELINE DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// How long a processed interruption message id is remembered.
/// Must exceed the transport's maximum redelivery delay.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(10 * 60);

/// How long a registry entry survives after its instance was interrupted.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Interval of the background purge of expired cache entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Bound of each handler input channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 30;

// ═══════════════════════════════════════════════════════════════════════════════
// METRICS
// ═══════════════════════════════════════════════════════════════════════════════

/// Name of the exported interruption counter.
pub const INTERRUPTION_METRIC_NAME: &str = "interruption_events_total";

/// Help text of the exported interruption counter.
pub const INTERRUPTION_METRIC_HELP: &str =
    "The total number of spot interruptions for a given cluster";

/// Counter label carrying the cluster name.
pub const CLUSTER_LABEL: &str = "kubernetes_cluster";

/// Optional counter label carrying the interrupted resource id.
pub const RESOURCE_LABEL: &str = "resource_id";

/// Default scrape path.
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Default scrape port.
pub const DEFAULT_METRICS_PORT: u16 = 8080;
