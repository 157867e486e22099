//! Message builders and log capture shared by the pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use spotwatch_core::types::RawMessage;
use spotwatch_events::EventParser;
use spotwatch_metrics::InterruptionCounter;
use spotwatch_pipeline::{DedupCache, InstanceRegistry, InterruptionHandler};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

pub const GRACE: Duration = Duration::from_secs(30);
pub const DEDUP: Duration = Duration::from_secs(600);

pub fn creation(id: &str, resource: &str, cluster: &str) -> RawMessage {
    let body = json!({
        "protoPayload": {
            "methodName": "v1.compute.instances.insert",
            "request": { "labels": [{ "key": "goog-k8s-cluster-name", "value": cluster }] },
            "response": {
                "targetLink": format!("https://www.googleapis.com/compute/v1/{resource}")
            }
        },
        "operation": { "id": format!("op-{id}") }
    });
    RawMessage::new(id, body.to_string())
}

pub fn interruption(id: &str, resource: &str) -> RawMessage {
    let body = json!({
        "protoPayload": {
            "methodName": "compute.instances.preempted",
            "resourceName": resource
        },
        "operation": { "id": format!("systemevent-{id}") }
    });
    RawMessage::new(id, body.to_string())
}

pub fn seeded(pairs: &[(&str, &str)]) -> InstanceRegistry {
    let snapshot: HashMap<String, String> = pairs
        .iter()
        .map(|(r, c)| (r.to_string(), c.to_string()))
        .collect();
    InstanceRegistry::seeded(snapshot, &Default::default())
}

pub fn interruption_handler(
    registry: &InstanceRegistry,
    counter: &Arc<InterruptionCounter>,
) -> InterruptionHandler {
    InterruptionHandler::new(
        registry.clone(),
        DedupCache::new(DEDUP, Duration::from_secs(3600)),
        counter.clone(),
        EventParser::default(),
        GRACE,
    )
}

/// Formatted log output collected from the current thread.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock())
            .lines()
            .map(str::to_owned)
            .collect()
    }

    /// Lines logged at `level` whose text contains `needle`.
    pub fn matching(&self, level: &str, needle: &str) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| l.split_whitespace().next() == Some(level) && l.contains(needle))
            .collect()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Routes every event on this thread into the returned buffer until the
/// guard is dropped. Tasks spawned on a current-thread runtime log here too.
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
