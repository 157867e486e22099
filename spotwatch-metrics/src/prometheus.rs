//! Prometheus text exposition format.

use std::fmt::Write;

use spotwatch_core::constants::{
    CLUSTER_LABEL, INTERRUPTION_METRIC_HELP, INTERRUPTION_METRIC_NAME, RESOURCE_LABEL,
};

use crate::counter::Sample;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Renders the interruption counter.
///
/// The HELP and TYPE lines are emitted even when there are no samples yet.
pub fn render_prometheus(samples: &[Sample]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# HELP {INTERRUPTION_METRIC_NAME} {INTERRUPTION_METRIC_HELP}");
    let _ = writeln!(out, "# TYPE {INTERRUPTION_METRIC_NAME} counter");

    for s in samples {
        let _ = write!(
            out,
            "{INTERRUPTION_METRIC_NAME}{{{CLUSTER_LABEL}=\"{}\"",
            escape_label_value(&s.cluster)
        );
        if let Some(resource_id) = &s.resource_id {
            let _ = write!(out, ",{RESOURCE_LABEL}=\"{}\"", escape_label_value(resource_id));
        }
        let _ = writeln!(out, "}} {}", s.value);
    }

    out
}

/// Escapes `\`, `"` and newlines in a label value.
pub fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}
