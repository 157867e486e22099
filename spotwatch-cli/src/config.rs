//! Command-line and environment configuration.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use spotwatch_core::constants::{
    CLUSTER_NAME_LABEL_KEY, DEFAULT_CHANNEL_CAPACITY, DEFAULT_METRICS_PATH, DEFAULT_METRICS_PORT,
};
use spotwatch_core::error::{Result, SpotwatchError};
use spotwatch_gcp::{GcpConfig, TokenSource};
use spotwatch_pipeline::PipelineConfig;

/// spotwatch - count GKE spot VM interruptions per cluster
#[derive(Debug, Parser)]
#[command(name = "spotwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub logging: LogArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the exporter
    Run(RunConfig),

    /// Print the cluster instances currently known to Compute Engine
    Snapshot {
        #[command(flatten)]
        gcp: GcpArgs,
    },
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, env = "SPOTWATCH_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, global = true, env = "SPOTWATCH_LOG_FORMAT", value_enum, default_value_t)]
    pub log_format: LogFormat,
}

#[derive(Debug, Args)]
pub struct GcpArgs {
    /// Google Cloud project id
    #[arg(long, env = "SPOTWATCH_PROJECT")]
    pub project: String,

    /// Instance label holding the cluster name
    #[arg(long, env = "SPOTWATCH_CLUSTER_LABEL", default_value = CLUSTER_NAME_LABEL_KEY)]
    pub cluster_label: String,

    /// Static OAuth access token; the metadata server is used otherwise
    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Override for the Pub/Sub and Compute endpoints (emulators, testing)
    #[arg(long, env = "SPOTWATCH_API_ENDPOINT", hide = true)]
    pub api_endpoint: Option<String>,
}

impl GcpArgs {
    pub fn gcp_config(&self) -> GcpConfig {
        let config = GcpConfig::new(&self.project);
        match &self.api_endpoint {
            Some(endpoint) => config.with_endpoint(endpoint),
            None => config,
        }
    }

    pub fn token_source(&self) -> TokenSource {
        match &self.access_token {
            Some(token) => TokenSource::Static(token.clone()),
            None => TokenSource::metadata_server(),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        non_empty("project", &self.project)?;
        non_empty("cluster label", &self.cluster_label)
    }
}

#[derive(Debug, Args)]
pub struct RunConfig {
    #[command(flatten)]
    pub gcp: GcpArgs,

    /// Subscription receiving instance creation audit logs
    #[arg(long, env = "SPOTWATCH_CREATION_SUBSCRIPTION")]
    pub creation_subscription: String,

    /// Subscription receiving preemption audit logs
    #[arg(long, env = "SPOTWATCH_INTERRUPTION_SUBSCRIPTION")]
    pub interruption_subscription: String,

    /// Scrape path
    #[arg(long, env = "SPOTWATCH_METRICS_PATH", default_value = DEFAULT_METRICS_PATH)]
    pub metrics_path: String,

    /// Scrape port
    #[arg(long, env = "SPOTWATCH_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Seconds a processed interruption message id is remembered
    #[arg(long, env = "SPOTWATCH_DEDUP_WINDOW_SECS", default_value_t = 600)]
    pub dedup_window_secs: u64,

    /// Seconds an interrupted instance stays resolvable
    #[arg(long, env = "SPOTWATCH_GRACE_PERIOD_SECS", default_value_t = 30)]
    pub grace_period_secs: u64,

    /// Seconds between purges of expired cache entries
    #[arg(long, env = "SPOTWATCH_SWEEP_INTERVAL_SECS", default_value_t = 3600)]
    pub sweep_interval_secs: u64,

    /// Bound of each handler's input channel
    #[arg(long, env = "SPOTWATCH_CHANNEL_CAPACITY", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Also label the counter by resource id
    #[arg(long, env = "SPOTWATCH_RESOURCE_LABEL")]
    pub resource_label: bool,
}

impl RunConfig {
    /// Rejects values the exporter cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.gcp.validate()?;
        non_empty("creation subscription", &self.creation_subscription)?;
        non_empty("interruption subscription", &self.interruption_subscription)?;

        if !self.metrics_path.starts_with('/') {
            return Err(SpotwatchError::ConfigError(format!(
                "metrics path must start with '/', got '{}'",
                self.metrics_path
            )));
        }
        for (name, value) in [
            ("dedup window", self.dedup_window_secs),
            ("grace period", self.grace_period_secs),
            ("sweep interval", self.sweep_interval_secs),
        ] {
            if value == 0 {
                return Err(SpotwatchError::ConfigError(format!("{name} must be positive")));
            }
        }
        if self.channel_capacity == 0 {
            return Err(SpotwatchError::ConfigError(
                "channel capacity must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            dedup_window: Duration::from_secs(self.dedup_window_secs),
            grace_period: Duration::from_secs(self.grace_period_secs),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            channel_capacity: self.channel_capacity,
            cluster_label_key: self.gcp.cluster_label.clone(),
        }
    }
}

fn non_empty(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SpotwatchError::ConfigError(format!("{name} must not be empty")));
    }
    Ok(())
}
