//! Error types for spotwatch.
//!
//! This module provides the error hierarchy shared by the library crates,
//! using `thiserror`. Only transport errors are ever fatal to the process;
//! everything raised while handling a single message is recovered locally.

use thiserror::Error;

/// Result type alias using `SpotwatchError`.
pub type Result<T> = std::result::Result<T, SpotwatchError>;

/// Main error type for all spotwatch operations.
#[derive(Debug, Error)]
pub enum SpotwatchError {
    // ═══════════════════════════════════════════════════════════════════════════
    // PAYLOAD ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Message body is not valid JSON, or not shaped like an audit log entry.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A field the event requires is absent or empty.
    #[error("expected {field} not found in audit log entry, operation ID: {operation_id}")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
        /// `operation.id` of the entry, empty when unknown.
        operation_id: String,
    },

    /// Creation request did not carry the cluster-name label.
    #[error("expected cluster label {label} not found on instance creation request, operation ID: {operation_id}")]
    MissingClusterLabel {
        /// Label key that was searched for.
        label: String,
        /// `operation.id` of the entry, empty when unknown.
        operation_id: String,
    },

    /// Payload could not be base64-decoded.
    #[error("Invalid base64 payload: {0}")]
    Base64Error(#[from] base64::DecodeError),

    // ═══════════════════════════════════════════════════════════════════════════
    // CACHE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Key is absent or already expired.
    #[error("key {0} not found in cache")]
    KeyNotFound(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // NETWORK ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Connection timeout.
    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    /// Could not obtain an access token.
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Message transport gave up; the process should stop.
    #[error("Transport failed for subscription '{subscription}': {reason}")]
    Transport {
        /// Subscription the receive loop was bound to.
        subscription: String,
        /// Last error observed.
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION & IO ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl SpotwatchError {
    /// Returns true if this error came from a malformed or incomplete payload.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            SpotwatchError::JsonError(_)
                | SpotwatchError::MissingField { .. }
                | SpotwatchError::MissingClusterLabel { .. }
                | SpotwatchError::Base64Error(_)
        )
    }

    /// Returns true if this error is recoverable (can retry).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SpotwatchError::HttpError(_)
                | SpotwatchError::ConnectionTimeout(_)
                | SpotwatchError::AuthError(_)
        )
    }

    /// Returns true if this error should terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SpotwatchError::Transport { .. })
    }
}
