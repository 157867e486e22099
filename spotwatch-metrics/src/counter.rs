//! Labelled interruption counter.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use spotwatch_core::traits::MetricsSink;

/// One labelled series of the counter.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Sample {
    /// `kubernetes_cluster` label
    pub cluster: String,
    /// `resource_id` label, when the counter carries it
    pub resource_id: Option<String>,
    /// Current value
    pub value: u64,
}

type SeriesKey = (String, Option<String>);

/// Monotonic counter of interruptions, one series per label set.
///
/// Series are created on first increment and never removed.
#[derive(Debug, Default)]
pub struct InterruptionCounter {
    series: DashMap<SeriesKey, AtomicU64>,
    include_resource_label: bool,
}

impl InterruptionCounter {
    /// Creates an empty counter. With `include_resource_label` each
    /// interrupted resource gets its own series.
    pub fn new(include_resource_label: bool) -> Self {
        Self {
            series: DashMap::new(),
            include_resource_label,
        }
    }

    /// Whether series carry the `resource_id` label.
    pub fn includes_resource_label(&self) -> bool {
        self.include_resource_label
    }

    /// Adds one to the series for `cluster` (and `resource_id` if enabled).
    pub fn increment(&self, cluster: &str, resource_id: &str) {
        let key = (
            cluster.to_string(),
            self.include_resource_label.then(|| resource_id.to_string()),
        );
        // Fast path avoids the write lock of `entry` once the series exists
        if let Some(value) = self.series.get(&key) {
            value.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.series
            .entry(key)
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Sum over every series of `cluster`.
    pub fn count(&self, cluster: &str) -> u64 {
        self.series
            .iter()
            .filter(|e| e.key().0 == cluster)
            .map(|e| e.value().load(Ordering::Relaxed))
            .sum()
    }

    /// Sum over every series.
    pub fn total(&self) -> u64 {
        self.series
            .iter()
            .map(|e| e.value().load(Ordering::Relaxed))
            .sum()
    }

    /// All series, sorted by labels.
    pub fn samples(&self) -> Vec<Sample> {
        let mut samples: Vec<Sample> = self
            .series
            .iter()
            .map(|e| Sample {
                cluster: e.key().0.clone(),
                resource_id: e.key().1.clone(),
                value: e.value().load(Ordering::Relaxed),
            })
            .collect();
        samples.sort();
        samples
    }
}

impl MetricsSink for InterruptionCounter {
    fn increment_interruptions(&self, cluster: &str, resource_id: &str) {
        self.increment(cluster, resource_id);
    }
}
