//! # spotwatch Core
//!
//! Core types, errors, and traits for the spotwatch interruption exporter.
//!
//! This crate provides the foundational building blocks used by all other spotwatch crates:
//!
//! - **Types**: Transport messages and the two lifecycle events derived from them
//! - **Errors**: A single error enum shared by every library crate
//! - **Constants**: Label keys, metric names, and pipeline defaults
//! - **Traits**: Boundaries to the metrics sink, the instance inventory, and message sources
//! - **Shutdown**: The watch-based stop signal shared by every long-running loop
//!
//! ## Example
//!
//! ```rust
//! use spotwatch_core::{normalize_resource_id, CreationEvent};
//!
//! let event = CreationEvent {
//!     message_id: "m1".into(),
//!     resource_id: normalize_resource_id(
//!         "https://www.googleapis.com/compute/v1/projects/p/zones/z/instances/i-1",
//!     ),
//!     cluster_name: "cluster-a".into(),
//! };
//! assert_eq!(event.resource_id, "projects/p/zones/z/instances/i-1");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod shutdown;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{Result, SpotwatchError};
pub use shutdown::{is_shutdown, shutdown_requested};
pub use traits::*;
pub use types::*;
