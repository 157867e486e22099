//! # spotwatch Pipeline
//!
//! The stateful core of the exporter: two independent consumption loops
//! reconciling instance-creation and instance-interruption streams against
//! a shared, expiring registry.
//!
//! - **[`InstanceRegistry`]**: resource id → cluster name, seeded at startup
//! - **[`DedupCache`]**: message ids seen by the interruption handler
//! - **[`CreationHandler`]** / **[`InterruptionHandler`]**: per-stream loops
//! - **[`Pipeline`]**: spawns both handlers and awaits their completion
//!
//! ## Example
//!
//! ```rust,ignore
//! use spotwatch_pipeline::{InstanceRegistry, Pipeline, PipelineConfig};
//!
//! let registry = InstanceRegistry::seeded(snapshot, &config.cache());
//! let (inputs, handle) = Pipeline::new(config, registry, metrics).start();
//!
//! // Hand `inputs.creations` / `inputs.interruptions` to the subscriptions,
//! // then wait for both handlers once the senders are dropped.
//! let report = handle.wait().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod creation;
mod interruption;
mod pipeline;
mod registry;
mod stats;

pub use creation::{CreationHandler, CreationOutcome};
pub use interruption::{InterruptionHandler, InterruptionOutcome};
pub use pipeline::{Pipeline, PipelineConfig, PipelineHandle, PipelineInputs, PipelineReport};
pub use registry::{DedupCache, InstanceRegistry};
pub use stats::HandlerStats;
