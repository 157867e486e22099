//! Transport-level message envelope.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::Result;

/// A message as handed over by a subscription, before parsing.
///
/// `id` is the transport's message id and is stable across redeliveries,
/// which is what deduplication keys on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawMessage {
    /// Transport message id
    pub id: String,
    /// Decoded payload (an audit log entry as JSON)
    pub data: Vec<u8>,
    /// Transport attributes, carried for logging only
    pub attributes: HashMap<String, String>,
}

impl RawMessage {
    /// Creates a message with no attributes.
    pub fn new(id: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
            attributes: HashMap::new(),
        }
    }

    /// Creates a message from a base64-encoded payload, as Pub/Sub delivers it.
    pub fn from_base64(id: impl Into<String>, encoded: &str) -> Result<Self> {
        let data = STANDARD.decode(encoded)?;
        Ok(Self::new(id, data))
    }

    /// Attaches transport attributes.
    pub fn with_attributes(mut self, attributes: HashMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }
}
