//! Audit log entry → lifecycle event.

use serde_json::Value;

use spotwatch_core::constants::CLUSTER_NAME_LABEL_KEY;
use spotwatch_core::error::{Result, SpotwatchError};
use spotwatch_core::types::{normalize_resource_id, CreationEvent, InterruptionEvent, RawMessage};

use crate::envelope::{decode_entry, LogEntry};

/// Parses creation and interruption messages.
///
/// Pure: holds only the label key that identifies an instance's cluster.
#[derive(Clone, Debug)]
pub struct EventParser {
    cluster_label_key: String,
}

impl EventParser {
    /// Creates a parser that reads the cluster name from `cluster_label_key`.
    pub fn new(cluster_label_key: impl Into<String>) -> Self {
        Self {
            cluster_label_key: cluster_label_key.into(),
        }
    }

    /// Returns the label key matched (case-insensitively) on creation requests.
    pub fn cluster_label_key(&self) -> &str {
        &self.cluster_label_key
    }

    /// Parses a preemption audit log into an [`InterruptionEvent`].
    ///
    /// The resource comes from `protoPayload.resourceName`.
    pub fn parse_interruption(&self, msg: &RawMessage) -> Result<InterruptionEvent> {
        let entry = decode_entry(&msg.data)?;
        let resource_name = entry
            .proto_payload
            .as_ref()
            .and_then(|p| p.resource_name.as_deref())
            .map(normalize_resource_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| missing("resourceName", &entry))?;

        Ok(InterruptionEvent {
            message_id: msg.id.clone(),
            resource_id: resource_name,
        })
    }

    /// Parses an instance insert audit log into a [`CreationEvent`].
    ///
    /// The cluster comes from `protoPayload.request.labels`, the resource
    /// from `protoPayload.response.targetLink`.
    pub fn parse_creation(&self, msg: &RawMessage) -> Result<CreationEvent> {
        let entry = decode_entry(&msg.data)?;
        let payload = entry.proto_payload.as_ref();

        let labels = payload
            .and_then(|p| p.request.as_ref())
            .and_then(|r| r.get("labels"))
            .ok_or_else(|| missing("labels", &entry))?;

        let cluster_name = self.cluster_from_labels(labels).ok_or_else(|| {
            SpotwatchError::MissingClusterLabel {
                label: self.cluster_label_key.clone(),
                operation_id: entry.operation_id().to_string(),
            }
        })?;

        let resource_id = payload
            .and_then(|p| p.response.as_ref())
            .and_then(|r| r.get("targetLink"))
            .and_then(Value::as_str)
            .map(normalize_resource_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| missing("targetLink", &entry))?;

        Ok(CreationEvent {
            message_id: msg.id.clone(),
            resource_id,
            cluster_name,
        })
    }

    /// Finds the cluster label in either wire shape:
    /// a list of `{"key", "value"}` objects, or a plain object map.
    fn cluster_from_labels(&self, labels: &Value) -> Option<String> {
        let wanted = self.cluster_label_key.as_str();
        let value = match labels {
            Value::Array(items) => items.iter().find_map(|item| {
                let key = item.get("key")?.as_str()?;
                if key.eq_ignore_ascii_case(wanted) {
                    item.get("value")
                } else {
                    None
                }
            }),
            Value::Object(map) => map
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(wanted))
                .map(|(_, v)| v),
            _ => None,
        }?;

        value
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new(CLUSTER_NAME_LABEL_KEY)
    }
}

fn missing(field: &'static str, entry: &LogEntry) -> SpotwatchError {
    SpotwatchError::MissingField {
        field,
        operation_id: entry.operation_id().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    const INTERRUPTION: &str = include_str!("../testdata/interruption_event.json");
    const CREATION: &str = include_str!("../testdata/creation_event.json");

    fn msg(body: impl ToString) -> RawMessage {
        RawMessage::new("12345", body.to_string())
    }

    fn creation_body(labels: Value, target_link: Option<&str>) -> Value {
        let mut response = json!({ "status": "RUNNING" });
        if let Some(link) = target_link {
            response["targetLink"] = json!(link);
        }
        json!({
            "protoPayload": {
                "request": { "labels": labels },
                "response": response,
            },
            "operation": { "id": "op-1" }
        })
    }

    #[test]
    fn test_parse_interruption_fixture() {
        let event = EventParser::default().parse_interruption(&msg(INTERRUPTION)).unwrap();
        assert_eq!(
            event.resource_id,
            "projects/mock-project/zones/europe-west1-c/instances/mock-instance-spot-3706-5b909138-nr65"
        );
        assert_eq!(event.message_id, "12345");
    }

    #[test]
    fn test_parse_creation_fixture() {
        let event = EventParser::default().parse_creation(&msg(CREATION)).unwrap();
        assert_eq!(
            event.resource_id,
            "projects/mock-project/zones/europe-west1-c/instances/fake-resource"
        );
        assert_eq!(event.cluster_name, "fake-cluster");
        assert_eq!(event.message_id, "12345");
    }

    #[test]
    fn test_parse_interruption_normalizes_self_link() {
        let body = json!({
            "protoPayload": {
                "resourceName": "https://www.googleapis.com/compute/v1/projects/p/zones/z/instances/i-1"
            }
        });
        let event = EventParser::default().parse_interruption(&msg(body)).unwrap();
        assert_eq!(event.resource_id, "projects/p/zones/z/instances/i-1");
    }

    #[test_case(json!({}) ; "no payload")]
    #[test_case(json!({ "protoPayload": {} }) ; "no resource name")]
    #[test_case(json!({ "protoPayload": { "resourceName": "" } }) ; "empty resource name")]
    fn test_parse_interruption_missing_resource(body: Value) {
        let err = EventParser::default().parse_interruption(&msg(body)).unwrap_err();
        assert!(matches!(err, SpotwatchError::MissingField { field: "resourceName", .. }));
    }

    #[test]
    fn test_parse_interruption_not_json() {
        let err = EventParser::default().parse_interruption(&msg("<xml/>")).unwrap_err();
        assert!(matches!(err, SpotwatchError::JsonError(_)));
    }

    #[test_case("goog-k8s-cluster-name" ; "exact")]
    #[test_case("GOOG-K8S-CLUSTER-NAME" ; "upper")]
    #[test_case("Goog-K8s-Cluster-Name" ; "mixed")]
    fn test_cluster_label_case_insensitive(key: &str) {
        let body = creation_body(
            json!([{ "key": key, "value": "cluster-b" }]),
            Some("https://www.googleapis.com/compute/v1/projects/p/zones/z/instances/i-2"),
        );
        let event = EventParser::default().parse_creation(&msg(body)).unwrap();
        assert_eq!(event.cluster_name, "cluster-b");
        assert_eq!(event.resource_id, "projects/p/zones/z/instances/i-2");
    }

    #[test]
    fn test_labels_as_object_map() {
        let body = creation_body(
            json!({ "goog-k8s-cluster-name": "cluster-c", "team": "infra" }),
            Some("projects/p/zones/z/instances/i-3"),
        );
        let event = EventParser::default().parse_creation(&msg(body)).unwrap();
        assert_eq!(event.cluster_name, "cluster-c");
    }

    #[test]
    fn test_custom_label_key() {
        let body = creation_body(
            json!([{ "key": "cluster", "value": "edge" }]),
            Some("projects/p/zones/z/instances/i-4"),
        );
        let parser = EventParser::new("cluster");
        assert_eq!(parser.parse_creation(&msg(body)).unwrap().cluster_name, "edge");
    }

    #[test]
    fn test_creation_without_labels() {
        let body = json!({
            "protoPayload": {
                "request": { "name": "i-5" },
                "response": { "targetLink": "projects/p/zones/z/instances/i-5" }
            },
            "operation": { "id": "op-5" }
        });
        let err = EventParser::default().parse_creation(&msg(body)).unwrap_err();
        match err {
            SpotwatchError::MissingField { field, operation_id } => {
                assert_eq!(field, "labels");
                assert_eq!(operation_id, "op-5");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test_case(json!([{ "key": "team", "value": "infra" }]) ; "label absent")]
    #[test_case(json!([{ "key": "goog-k8s-cluster-name", "value": "" }]) ; "label empty")]
    #[test_case(json!([{ "key": "goog-k8s-cluster-name", "value": 7 }]) ; "label not a string")]
    #[test_case(json!("goog-k8s-cluster-name") ; "labels malformed")]
    fn test_creation_without_cluster_label(labels: Value) {
        let body = creation_body(labels, Some("projects/p/zones/z/instances/i-6"));
        let err = EventParser::default().parse_creation(&msg(body)).unwrap_err();
        assert!(matches!(err, SpotwatchError::MissingClusterLabel { .. }));
        assert!(err.is_parse_error());
    }

    #[test_case(None ; "absent")]
    #[test_case(Some("") ; "empty")]
    fn test_creation_without_target_link(link: Option<&str>) {
        let body = creation_body(
            json!([{ "key": "goog-k8s-cluster-name", "value": "cluster-a" }]),
            link,
        );
        let err = EventParser::default().parse_creation(&msg(body)).unwrap_err();
        assert!(matches!(err, SpotwatchError::MissingField { field: "targetLink", .. }));
    }
}
