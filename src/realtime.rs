//! Push events from the backend's socket channel.
//!
//! Only decoding lives here; the board applies events through
//! [`crate::app::AppState::apply_event`]. Pushes are off unless
//! `realtime_enabled` is set.

use serde::Deserialize;
use serde_json::Value;

use crate::task::{Project, Task};

#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    TaskUpdated(Task),
    ProjectCreated(Project),
    ProcessingStatus {
        kind: String,
        message: String,
        progress: Option<u8>,
    },
}

#[derive(Deserialize)]
struct RawProcessing {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
    progress: Option<f64>,
}

impl RealtimeEvent {
    /// Decodes a named event. Unknown names and malformed payloads are `None`.
    pub fn decode(name: &str, payload: Value) -> Option<Self> {
        let event = match name {
            "task:updated" | "task-updated" | "task_updated" => {
                serde_json::from_value(payload).map(Self::TaskUpdated)
            }
            "project:created" | "project-created" | "project_created" => {
                serde_json::from_value(payload).map(Self::ProjectCreated)
            }
            "processing:status" | "processing-status" | "processing_status" => {
                serde_json::from_value::<RawProcessing>(payload).map(|raw| Self::ProcessingStatus {
                    kind: raw.kind,
                    message: raw.message,
                    progress: raw.progress.map(|p| p.clamp(0.0, 100.0).round() as u8),
                })
            }
            _ => {
                tracing::trace!(event = name, "ignoring unknown event");
                return None;
            }
        };
        event
            .inspect_err(|err| tracing::warn!(event = name, error = %err, "malformed event payload"))
            .ok()
    }

    /// Decodes an event frame of the form `42["name", {...}]`.
    pub fn decode_frame(text: &str) -> Option<Self> {
        let body = text.strip_prefix("42")?;
        let Value::Array(mut parts) = serde_json::from_str(body).ok()? else {
            return None;
        };
        if parts.is_empty() {
            return None;
        }
        let payload = if parts.len() > 1 { parts.swap_remove(1) } else { Value::Null };
        let name = parts.first()?.as_str()?.to_string();
        Self::decode(&name, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use serde_json::json;

    #[test]
    fn task_update_frames_decode_to_tasks() {
        let frame = r#"42["task:updated",{"id":"t9","title":"Ship it","status":"DONE","assignee":"Kim"}]"#;
        let Some(RealtimeEvent::TaskUpdated(task)) = RealtimeEvent::decode_frame(frame) else {
            panic!("expected a task update");
        };
        assert_eq!(task.id, "t9");
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.assignee.unwrap().display_name(), "Kim");
    }

    #[test]
    fn processing_status_clamps_progress() {
        let event = RealtimeEvent::decode(
            "processing:status",
            json!({"type": "transcription", "message": "halfway", "progress": 140}),
        );
        assert_eq!(
            event,
            Some(RealtimeEvent::ProcessingStatus {
                kind: "transcription".to_string(),
                message: "halfway".to_string(),
                progress: Some(100),
            })
        );
    }

    #[test]
    fn unknown_or_broken_frames_are_ignored() {
        assert_eq!(RealtimeEvent::decode("user-joined", json!({})), None);
        assert_eq!(RealtimeEvent::decode_frame("2"), None);
        assert_eq!(RealtimeEvent::decode_frame(r#"42["task:updated",{"id":1}]"#), None);
        assert_eq!(RealtimeEvent::decode_frame("42[]"), None);
    }

    #[test]
    fn project_events_decode_and_dashed_names_still_work() {
        let created = RealtimeEvent::decode_frame(r#"42["project:created",{"id":"p1","title":"Q1 launch"}]"#);
        let Some(RealtimeEvent::ProjectCreated(project)) = created else {
            panic!("expected a project");
        };
        assert_eq!(project.id, "p1");

        let dashed = RealtimeEvent::decode("task-updated", json!({"id": "t1", "title": "x", "status": "TODO"}));
        assert!(matches!(dashed, Some(RealtimeEvent::TaskUpdated(_))));
    }
}
