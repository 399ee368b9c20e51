// crates/types/src/event.rs
//! Progress events pushed by the update source.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A job progress update as it arrives on the wire.
///
/// Every field is optional: the source is not trusted to send complete
/// events, and validation happens in the aggregator so that a rejected event
/// can be reported without touching any state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form status string ("Scheduled", "Running", "Completed", "Failed", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Percentage; clamped to 0..=100 when accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressEvent {
    /// Convenience constructor for the common complete event.
    pub fn new(
        job_id: impl Into<String>,
        name: impl Into<String>,
        status: impl Into<String>,
        progress: i64,
    ) -> Self {
        Self {
            job_id: Some(job_id.into()),
            name: Some(name.into()),
            status: Some(status.into()),
            progress: Some(progress),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_camel_case_wire_shape() {
        let json = r#"{"jobId":"a","name":"Red Job","progress":40,"status":"Running"}"#;
        let event: ProgressEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, ProgressEvent::new("a", "Red Job", "Running", 40));
    }

    #[test]
    fn test_missing_fields_decode_as_none() {
        let event: ProgressEvent = serde_json::from_str(r#"{"status":"Completed"}"#).unwrap();
        assert!(event.job_id.is_none());
        assert!(event.name.is_none());
        assert_eq!(event.status.as_deref(), Some("Completed"));
        assert!(event.progress.is_none());
    }
}
