//! The exporter process: startup, steady state, shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info};

use spotwatch_core::error::SpotwatchError;
use spotwatch_core::traits::{InstanceInventory, MessageSource};
use spotwatch_core::types::RawMessage;
use spotwatch_gcp::{ComputeInventory, GcpClient, PubSubSubscription};
use spotwatch_metrics::{InterruptionCounter, MetricsServer};
use spotwatch_pipeline::{InstanceRegistry, Pipeline};

use crate::config::RunConfig;

pub async fn run(config: RunConfig) -> Result<()> {
    config.validate()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Metrics first, so the scrape endpoint is up while the snapshot loads
    let counter = Arc::new(InterruptionCounter::new(config.resource_label));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server = MetricsServer::new(counter.clone(), config.metrics_path.clone())
        .bind(addr)
        .await
        .with_context(|| format!("failed to bind metrics server on {addr}"))?;
    let mut server_task = tokio::spawn(server.serve(shutdown_rx.clone()));

    let client = GcpClient::new(config.gcp.gcp_config(), config.gcp.token_source())?;
    let inventory = ComputeInventory::with_label(client.clone(), &config.gcp.cluster_label);
    let snapshot = inventory
        .list_cluster_instances()
        .await
        .context("failed to list cluster instances")?;

    let pipeline_config = config.pipeline_config();
    let registry = InstanceRegistry::seeded(snapshot, &pipeline_config.cache());
    info!(instances = registry.len(), "Registry seeded from instance inventory");

    let (inputs, handle) = Pipeline::new(pipeline_config, registry, counter).start();

    let mut receivers = JoinSet::new();
    receivers.spawn(receive(
        PubSubSubscription::new(client.clone(), &config.creation_subscription),
        inputs.creations,
        shutdown_rx.clone(),
    ));
    receivers.spawn(receive(
        PubSubSubscription::new(client, &config.interruption_subscription),
        inputs.interruptions,
        shutdown_rx,
    ));

    let mut failure = None;
    let mut server_done = false;
    tokio::select! {
        _ = shutdown_signal() => info!("Shutdown signal received"),
        Some(joined) = receivers.join_next() => record(joined, &mut failure),
        joined = &mut server_task => {
            server_done = true;
            record_server(joined, &mut failure);
        }
    }

    shutdown_tx.send_replace(true);
    while let Some(joined) = receivers.join_next().await {
        record(joined, &mut failure);
    }

    let report = handle.wait().await?;
    info!(
        creations_received = report.creations.received,
        creations_added = report.creations.applied,
        interruptions_received = report.interruptions.received,
        interruptions_counted = report.interruptions.applied,
        duplicates = report.interruptions.duplicates,
        unknown_cluster = report.interruptions.unknown_cluster,
        "Handlers drained"
    );

    if !server_done {
        record_server(server_task.await, &mut failure);
    }

    match failure {
        Some(e) => Err(e).context("exporter stopped after a failure"),
        None => Ok(()),
    }
}

async fn receive<S>(
    source: S,
    tx: mpsc::Sender<RawMessage>,
    shutdown: watch::Receiver<bool>,
) -> spotwatch_core::Result<()>
where
    S: MessageSource + 'static,
{
    source.receive(tx, shutdown).await
}

fn record(
    joined: std::result::Result<spotwatch_core::Result<()>, JoinError>,
    failure: &mut Option<SpotwatchError>,
) {
    let err = match joined {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e,
        Err(e) => SpotwatchError::InternalError(format!("receiver task: {e}")),
    };
    error!(error = %err, "Subscription failed, shutting down");
    failure.get_or_insert(err);
}

fn record_server(
    joined: std::result::Result<std::io::Result<()>, JoinError>,
    failure: &mut Option<SpotwatchError>,
) {
    let err = match joined {
        Ok(Ok(())) => return,
        Ok(Err(e)) => SpotwatchError::IoError(e),
        Err(e) => SpotwatchError::InternalError(format!("metrics server task: {e}")),
    };
    error!(error = %err, "Metrics server failed, shutting down");
    failure.get_or_insert(err);
}

/// Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use clap::Parser;

    use crate::config::{Cli, Commands};

    fn run_config(metrics_port: u16) -> RunConfig {
        let port = metrics_port.to_string();
        let cli = Cli::try_parse_from([
            "spotwatch",
            "run",
            "--project",
            "mock-project",
            "--creation-subscription",
            "creations",
            "--interruption-subscription",
            "interruptions",
            "--access-token",
            "t",
            // Nothing listens here; the run must fail before any API call
            "--api-endpoint",
            "http://127.0.0.1:9",
            "--metrics-port",
            &port,
        ])
        .unwrap();
        match cli.command {
            Commands::Run(config) => config,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_fails_fast_when_metrics_port_taken() {
        let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let result = tokio::time::timeout(Duration::from_secs(5), run(run_config(port)))
            .await
            .expect("run should return instead of hanging");

        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to bind metrics server"), "{err:#}");
    }

    #[test]
    fn test_record_server_failure() {
        let mut failure = None;
        record_server(Ok(Ok(())), &mut failure);
        assert!(failure.is_none());

        record_server(
            Ok(Err(std::io::Error::from(std::io::ErrorKind::AddrInUse))),
            &mut failure,
        );
        assert!(matches!(failure, Some(SpotwatchError::IoError(_))));
    }

    #[test]
    fn test_record_keeps_first_failure() {
        let mut failure = None;
        record(Ok(Ok(())), &mut failure);
        assert!(failure.is_none());

        record(
            Ok(Err(SpotwatchError::Transport {
                subscription: "a".into(),
                reason: "down".into(),
            })),
            &mut failure,
        );
        record(
            Ok(Err(SpotwatchError::Transport {
                subscription: "b".into(),
                reason: "down".into(),
            })),
            &mut failure,
        );

        match failure {
            Some(SpotwatchError::Transport { subscription, .. }) => assert_eq!(subscription, "a"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
