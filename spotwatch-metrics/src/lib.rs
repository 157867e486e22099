//! # Spotwatch Metrics
//!
//! The interruption counter and the HTTP endpoint Prometheus scrapes it from.
//!
//! ## Endpoints
//!
//! - `GET /metrics` - Prometheus text exposition (path is configurable)
//! - `GET /health` - Liveness check
//!
//! ## Example
//!
//! ```rust,ignore
//! use spotwatch_metrics::{InterruptionCounter, MetricsServer};
//!
//! let counter = Arc::new(InterruptionCounter::new(false));
//! let server = MetricsServer::new(counter.clone(), "/metrics");
//! server.run(([0, 0, 0, 0], 8080), shutdown_rx).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod counter;
mod handlers;
mod prometheus;
mod routes;
mod state;

pub use counter::{InterruptionCounter, Sample};
pub use handlers::HealthResponse;
pub use prometheus::{escape_label_value, render_prometheus, CONTENT_TYPE};
pub use routes::create_router;
pub use state::MetricsState;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use spotwatch_core::shutdown_requested;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Scrape endpoint for an [`InterruptionCounter`].
pub struct MetricsServer {
    state: Arc<MetricsState>,
    path: String,
}

impl MetricsServer {
    /// Creates a server exposing `counter` under `path`.
    pub fn new(counter: Arc<InterruptionCounter>, path: impl Into<String>) -> Self {
        Self {
            state: Arc::new(MetricsState::new(counter)),
            path: path.into(),
        }
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        create_router(self.state.clone(), &self.path).layer(TraceLayer::new_for_http())
    }

    /// Binds the listening socket.
    ///
    /// Bind failures (port in use, missing privileges) surface here, before
    /// anything is spawned.
    pub async fn bind(self, addr: impl Into<SocketAddr>) -> std::io::Result<BoundMetricsServer> {
        let listener = tokio::net::TcpListener::bind(addr.into()).await?;
        let addr = listener.local_addr()?;
        info!(
            %addr,
            path = %self.path,
            resource_label = self.state.counter.includes_resource_label(),
            "Metrics server listening"
        );

        Ok(BoundMetricsServer {
            listener,
            router: self.router(),
        })
    }

    /// Binds, then serves until `shutdown` flips to `true`.
    pub async fn run(
        self,
        addr: impl Into<SocketAddr>,
        shutdown: watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        self.bind(addr).await?.serve(shutdown).await
    }
}

/// A metrics server whose socket is bound but not yet accepting.
pub struct BoundMetricsServer {
    listener: tokio::net::TcpListener,
    router: Router,
}

impl BoundMetricsServer {
    /// Address actually bound, with the port resolved when `0` was asked for.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until `shutdown` flips to `true`, then drains open connections.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move { shutdown_requested(&mut shutdown).await })
            .await?;

        info!("Metrics server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let server = MetricsServer::new(Arc::new(InterruptionCounter::new(false)), "/metrics");
        let task = tokio::spawn(server.run(([127, 0, 0, 1], 0), rx));

        tx.send(true).unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_run_stops_when_sender_dropped() {
        let (tx, rx) = watch::channel(false);
        let server = MetricsServer::new(Arc::new(InterruptionCounter::new(false)), "/metrics");
        let task = tokio::spawn(server.run(([127, 0, 0, 1], 0), rx));

        drop(tx);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bind_fails_on_taken_port() {
        let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let server = MetricsServer::new(Arc::new(InterruptionCounter::new(false)), "/metrics");
        let err = server.bind(([0, 0, 0, 0], port)).await.err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::AddrInUse);
    }

    #[tokio::test]
    async fn test_bound_server_serves_scrapes() {
        let counter = Arc::new(InterruptionCounter::new(true));
        counter.increment("cluster-a", "instances/i-1");
        let bound = MetricsServer::new(counter, "/metrics")
            .bind(([127, 0, 0, 1], 0))
            .await
            .unwrap();
        let addr = bound.local_addr().unwrap();
        assert_ne!(addr.port(), 0);

        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(bound.serve(rx));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        tokio::io::AsyncWriteExt::write_all(
            &mut stream,
            b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await
        .unwrap();
        let mut response = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut stream, &mut response)
            .await
            .unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("resource_id=\"instances/i-1\""));

        tx.send(true).unwrap();
        task.await.unwrap().unwrap();
    }
}
