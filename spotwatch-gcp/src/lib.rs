//! Google Cloud clients for spotwatch.
//!
//! - [`PubSubSubscription`]: pull subscription feeding a handler channel
//! - [`ComputeInventory`]: startup snapshot of cluster-labelled instances
//! - [`TokenSource`]: OAuth access tokens, static or from the metadata server
//!
//! All endpoints are configurable so the clients can run against emulators.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod auth;
mod client;
mod compute;
mod pubsub;

pub use auth::{MetadataServer, TokenSource, DEFAULT_METADATA_ENDPOINT};
pub use client::{GcpClient, GcpConfig, DEFAULT_COMPUTE_ENDPOINT, DEFAULT_PUBSUB_ENDPOINT};
pub use compute::ComputeInventory;
pub use pubsub::{PubSubSubscription, PullSettings};
