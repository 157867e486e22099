//! # spotwatch Events
//!
//! Translates provider-shaped transport messages into typed lifecycle
//! events. Messages carry a Cloud Audit Log `LogEntry` serialized as JSON;
//! unknown fields are ignored.
//!
//! ## Example
//!
//! ```rust
//! use spotwatch_core::RawMessage;
//! use spotwatch_events::EventParser;
//!
//! let body = r#"{"protoPayload":{"resourceName":"projects/p/zones/z/instances/i-1"}}"#;
//! let event = EventParser::default()
//!     .parse_interruption(&RawMessage::new("m1", body))
//!     .unwrap();
//! assert_eq!(event.resource_id, "projects/p/zones/z/instances/i-1");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod envelope;
mod parser;

pub use envelope::{decode_entry, AuditLog, LogEntry, Operation};
pub use parser::EventParser;
