//! Domain types for spotwatch.
//!
//! - [`RawMessage`]: A transport message as delivered by a subscription
//! - [`CreationEvent`]: An instance was created with a cluster label
//! - [`InterruptionEvent`]: An instance was preempted

mod events;
mod message;

pub use events::*;
pub use message::*;
