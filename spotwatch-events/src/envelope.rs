//! Subset of the Cloud Audit Log `LogEntry` schema that spotwatch reads.

use serde::Deserialize;
use serde_json::Value;

use spotwatch_core::error::Result;

/// A log entry as exported to Pub/Sub by a logging sink.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// The audit log payload
    #[serde(default)]
    pub proto_payload: Option<AuditLog>,
    /// Long-running operation the entry belongs to
    #[serde(default)]
    pub operation: Option<Operation>,
    /// Unique id assigned by Cloud Logging
    #[serde(default)]
    pub insert_id: Option<String>,
    /// RFC 3339 time the event occurred
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl LogEntry {
    /// Returns `operation.id`, or an empty string when absent.
    pub fn operation_id(&self) -> &str {
        self.operation
            .as_ref()
            .and_then(|op| op.id.as_deref())
            .unwrap_or_default()
    }
}

/// `google.cloud.audit.AuditLog`.
///
/// `request` and `response` are free-form structs whose shape depends on the
/// API method, so they stay as JSON values.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    /// Resource the call operated on, as a path
    #[serde(default)]
    pub resource_name: Option<String>,
    /// API method, e.g. `compute.instances.preempted`
    #[serde(default)]
    pub method_name: Option<String>,
    /// Request body of the audited call
    #[serde(default)]
    pub request: Option<Value>,
    /// Response body of the audited call
    #[serde(default)]
    pub response: Option<Value>,
}

/// `google.logging.v2.LogEntryOperation`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Operation {
    /// Operation identifier
    #[serde(default)]
    pub id: Option<String>,
    /// Producer of the operation
    #[serde(default)]
    pub producer: Option<String>,
    /// First entry of the operation
    #[serde(default)]
    pub first: Option<bool>,
    /// Last entry of the operation
    #[serde(default)]
    pub last: Option<bool>,
}

/// Decodes a message body into a [`LogEntry`].
pub fn decode_entry(data: &[u8]) -> Result<LogEntry> {
    Ok(serde_json::from_slice(data)?)
}
