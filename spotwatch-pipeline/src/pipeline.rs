//! Orchestration of the two handlers.

use std::sync::Arc;
use std::time::Duration;

use spotwatch_cache::{CacheConfig, Expiration, Sweeper};
use spotwatch_core::constants::{
    CLUSTER_NAME_LABEL_KEY, DEFAULT_CHANNEL_CAPACITY, DEFAULT_DEDUP_WINDOW, DEFAULT_GRACE_PERIOD,
    DEFAULT_SWEEP_INTERVAL,
};
use spotwatch_core::error::{Result, SpotwatchError};
use spotwatch_core::traits::MetricsSink;
use spotwatch_core::types::RawMessage;
use spotwatch_events::EventParser;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::creation::CreationHandler;
use crate::interruption::InterruptionHandler;
use crate::registry::{DedupCache, InstanceRegistry};
use crate::stats::HandlerStats;

/// Pipeline configuration.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Lifetime of a processed interruption message id
    pub dedup_window: Duration,
    /// Lifetime of a registry entry after its instance was interrupted
    pub grace_period: Duration,
    /// Interval of the background purge, for both caches
    pub sweep_interval: Duration,
    /// Bound of each input channel
    pub channel_capacity: usize,
    /// Label key holding the cluster name on creation requests
    pub cluster_label_key: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dedup_window: DEFAULT_DEDUP_WINDOW,
            grace_period: DEFAULT_GRACE_PERIOD,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            cluster_label_key: CLUSTER_NAME_LABEL_KEY.into(),
        }
    }
}

impl PipelineConfig {
    /// Cache configuration for the registry.
    pub fn cache(&self) -> CacheConfig {
        CacheConfig {
            default_expiration: Expiration::Never,
            sweep_interval: self.sweep_interval,
        }
    }
}

/// Producer ends of the two input channels.
///
/// Dropping a sender is the shutdown signal for its handler.
pub struct PipelineInputs {
    /// Instance creation messages
    pub creations: mpsc::Sender<RawMessage>,
    /// Instance interruption messages
    pub interruptions: mpsc::Sender<RawMessage>,
}

/// Final statistics of both handlers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Creation handler statistics
    pub creations: HandlerStats,
    /// Interruption handler statistics
    pub interruptions: HandlerStats,
}

/// Completion barrier for a started pipeline.
pub struct PipelineHandle {
    creation: JoinHandle<HandlerStats>,
    interruption: JoinHandle<HandlerStats>,
    sweepers: Vec<Sweeper>,
}

impl PipelineHandle {
    /// Waits for both handlers to drain their channels and exit.
    ///
    /// Returns once both input senders have been dropped and every message
    /// already queued has been processed.
    pub async fn wait(self) -> Result<PipelineReport> {
        let (creations, interruptions) = tokio::join!(self.creation, self.interruption);
        for sweeper in self.sweepers {
            sweeper.stop();
        }

        let report = PipelineReport {
            creations: creations
                .map_err(|e| SpotwatchError::InternalError(format!("creation handler: {e}")))?,
            interruptions: interruptions
                .map_err(|e| SpotwatchError::InternalError(format!("interruption handler: {e}")))?,
        };
        info!(?report, "Pipeline stopped");
        Ok(report)
    }
}

/// The two handlers plus the state they share.
pub struct Pipeline {
    config: PipelineConfig,
    registry: InstanceRegistry,
    metrics: Arc<dyn MetricsSink>,
}

impl Pipeline {
    /// Creates a pipeline over an already seeded registry.
    pub fn new(
        config: PipelineConfig,
        registry: InstanceRegistry,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            config,
            registry,
            metrics,
        }
    }

    /// Spawns both handlers and the cache sweepers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> (PipelineInputs, PipelineHandle) {
        let capacity = self.config.channel_capacity.max(1);
        let (creation_tx, creation_rx) = mpsc::channel(capacity);
        let (interruption_tx, interruption_rx) = mpsc::channel(capacity);

        let parser = EventParser::new(self.config.cluster_label_key.clone());
        let dedup = DedupCache::new(self.config.dedup_window, self.config.sweep_interval);
        let sweepers = vec![self.registry.spawn_sweeper(), dedup.spawn_sweeper()];

        let creation_handler = CreationHandler::new(self.registry.clone(), parser.clone());
        let interruption_handler = InterruptionHandler::new(
            self.registry.clone(),
            dedup,
            self.metrics,
            parser,
            self.config.grace_period,
        );

        let creation = tokio::spawn(creation_handler.run(creation_rx));
        let interruption = tokio::spawn(interruption_handler.run(interruption_rx));
        info!(
            registered = self.registry.len(),
            channel_capacity = capacity,
            "Handlers started for instance creation & interruption events"
        );

        (
            PipelineInputs {
                creations: creation_tx,
                interruptions: interruption_tx,
            },
            PipelineHandle {
                creation,
                interruption,
                sweepers,
            },
        )
    }
}
