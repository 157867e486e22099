//! spotwatch
//!
//! Prometheus exporter counting spot VM interruptions per GKE cluster.

use anyhow::Result;
use clap::Parser;

mod config;
mod logging;
mod run;
mod snapshot;

use config::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    logging::init(&cli.logging)?;

    match cli.command {
        Commands::Run(config) => run::run(config).await,
        Commands::Snapshot { gcp } => snapshot::snapshot(gcp).await,
    }
}
