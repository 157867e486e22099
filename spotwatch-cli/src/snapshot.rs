//! `spotwatch snapshot`: print the startup inventory.

use std::collections::BTreeMap;

use anyhow::Result;
use colored::*;

use spotwatch_core::traits::InstanceInventory;
use spotwatch_gcp::{ComputeInventory, GcpClient};

use crate::config::GcpArgs;

pub async fn snapshot(args: GcpArgs) -> Result<()> {
    args.validate()?;
    let client = GcpClient::new(args.gcp_config(), args.token_source())?;
    let inventory = ComputeInventory::with_label(client, &args.cluster_label);

    println!(
        "{} {}",
        "Listing cluster instances in".cyan().bold(),
        args.project
    );
    let instances = inventory.list_cluster_instances().await?;

    if instances.is_empty() {
        println!("\n{}", "No instances carry the cluster label.".yellow());
        return Ok(());
    }

    let mut by_cluster: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (resource, cluster) in &instances {
        by_cluster
            .entry(cluster.as_str())
            .or_default()
            .push(resource.as_str());
    }

    for (cluster, mut resources) in by_cluster {
        resources.sort_unstable();
        println!("\n{} ({})", cluster.green().bold(), resources.len());
        for resource in resources {
            println!("   {}", resource.dimmed());
        }
    }
    println!("\n{} {}", "Total:".yellow(), instances.len());
    Ok(())
}
