//! Wire types shared between the server and its clients.
//!
//! Start requests and session summaries travel over the REST surface;
//! `StreamFrame` is the tagged JSON frame pushed over a viewer's WebSocket.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a gadget session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Starting,
    Running,
    Stopped,
    Failed,
}

/// Request body for starting a gadget session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Gadget type to launch; must be present in the catalog.
    pub gadget_type: String,
    /// Namespace of the traced workload.
    pub namespace: String,
    /// Name of the traced workload.
    pub target: String,
}

/// Point-in-time view of one session, as returned by the REST surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub gadget_type: String,
    pub namespace: String,
    pub target: String,
    pub status: SessionStatus,
}

/// A server→viewer frame, tagged by `type` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    /// One event produced by the gadget; payload shape is gadget-specific.
    Output { payload: serde_json::Value },
    /// One error record produced by the gadget.
    Error { message: String },
    /// Terminal frame: the session ended with the given final status.
    SessionEnded { status: SessionStatus },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn frames_are_tagged_by_type() {
        let out = serde_json::to_value(StreamFrame::Output {
            payload: json!({"pid": 42}),
        })
        .unwrap();
        assert_eq!(out["type"], "output");
        assert_eq!(out["payload"]["pid"], 42);

        let err = serde_json::to_value(StreamFrame::Error {
            message: "boom".into(),
        })
        .unwrap();
        assert_eq!(err["type"], "error");
        assert_eq!(err["message"], "boom");

        let end = serde_json::to_value(StreamFrame::SessionEnded {
            status: SessionStatus::Stopped,
        })
        .unwrap();
        assert_eq!(end["type"], "session_ended");
        assert_eq!(end["status"], "Stopped");
    }

    #[test]
    fn start_request_uses_camel_case() {
        let req: StartRequest = serde_json::from_value(json!({
            "gadgetType": "trace_tcp",
            "namespace": "default",
            "target": "pod-a",
        }))
        .unwrap();
        assert_eq!(req.gadget_type, "trace_tcp");
        assert_eq!(req.target, "pod-a");
    }

    #[test]
    fn summary_serializes_status_name() {
        let summary = SessionSummary {
            id: "abc123".into(),
            gadget_type: "trace_tcp".into(),
            namespace: "default".into(),
            target: "pod-a".into(),
            status: SessionStatus::Running,
        };
        let v = serde_json::to_value(&summary).unwrap();
        assert_eq!(v["gadgetType"], "trace_tcp");
        assert_eq!(v["status"], "Running");
    }
}
