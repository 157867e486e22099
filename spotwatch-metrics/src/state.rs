//! Shared state of the metrics routes.

use std::sync::Arc;
use std::time::Instant;

use crate::counter::InterruptionCounter;

/// State handed to every handler.
pub struct MetricsState {
    /// Counter being exposed
    pub counter: Arc<InterruptionCounter>,
    /// When the server state was created
    pub started: Instant,
}

impl MetricsState {
    /// Wraps `counter`.
    pub fn new(counter: Arc<InterruptionCounter>) -> Self {
        Self {
            counter,
            started: Instant::now(),
        }
    }
}
