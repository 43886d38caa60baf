//! A2A wire types.
//!
//! JSON-RPC 2.0 envelopes, the agent card served for discovery, and the task
//! object returned by `message/send`. Field names follow the A2A JSON
//! conventions (camelCase).

use gmi_core::{CoreError, ErrorKind, MessagePart, Task, TaskState};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

pub const JSONRPC_VERSION: &str = "2.0";

/// Path the agent card is served on, relative to the agent's base URL.
pub const AGENT_CARD_PATH: &str = "/.well-known/agent.json";

pub const METHOD_SEND_MESSAGE: &str = "message/send";
pub const METHOD_CANCEL_TASK: &str = "tasks/cancel";

/// JSON-RPC and A2A error codes.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const UNSUPPORTED_OPERATION: i64 = -32004;
    pub const CONTENT_TYPE_NOT_SUPPORTED: i64 = -32005;
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// A message exchanged between agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    /// Raw parts; receivers run them through the content normalizer
    pub parts: Vec<Value>,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl Message {
    /// A user message with the given parts and identifiers.
    pub fn user(parts: &[MessagePart], message_id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: parts_to_wire(parts),
            message_id: message_id.into(),
            context_id: Some(context_id.into()),
            task_id: None,
        }
    }

    /// An agent status message carrying a single text part.
    pub fn agent_text(text: impl Into<String>, context_id: Option<String>) -> Self {
        Self {
            role: Role::Agent,
            parts: parts_to_wire(&[MessagePart::text(text)]),
            message_id: Uuid::new_v4().to_string(),
            context_id,
            task_id: None,
        }
    }
}

/// `params` of a `message/send` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSendParams {
    pub message: Message,
}

/// `params` of a `tasks/cancel` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskIdParams {
    pub id: String,
}

/// JSON-RPC request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: impl Serialize) -> Result<Self, CoreError> {
        Ok(Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params: serde_json::to_value(params)?,
        })
    }
}

/// JSON-RPC response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<&CoreError> for JsonRpcError {
    fn from(err: &CoreError) -> Self {
        let code = match err.kind() {
            ErrorKind::InvalidParams => codes::INVALID_PARAMS,
            ErrorKind::UnsupportedFormat => codes::CONTENT_TYPE_NOT_SUPPORTED,
            ErrorKind::UnsupportedOperation => codes::UNSUPPORTED_OPERATION,
            _ => codes::INTERNAL_ERROR,
        };
        Self::new(code, err.to_string())
    }
}

/// Agent capability flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCapabilities {
    #[serde(default)]
    pub streaming: bool,
}

/// One skill advertised by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// Capability descriptor served at [`AGENT_CARD_PATH`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub default_input_modes: Vec<String>,
    #[serde(default)]
    pub default_output_modes: Vec<String>,
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
}

/// Task status block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// A group of output parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub parts: Vec<Value>,
}

/// Task object returned as the `result` of `message/send`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTask {
    pub id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    pub kind: String,
}

impl WireTask {
    /// Render a tracked task. All artifact parts are grouped in one artifact.
    pub fn from_task(task: &Task, artifact_name: Option<&str>) -> Self {
        let artifacts = if task.artifacts.is_empty() {
            Vec::new()
        } else {
            vec![Artifact {
                artifact_id: Uuid::new_v4().to_string(),
                name: artifact_name.map(str::to_string),
                parts: parts_to_wire(&task.artifacts),
            }]
        };

        Self {
            id: task.task_id.clone(),
            context_id: task.context_id.clone(),
            status: TaskStatus {
                state: task.state,
                message: task
                    .status_message
                    .as_ref()
                    .map(|m| Message::agent_text(m.clone(), Some(task.context_id.clone()))),
                timestamp: Some(task.updated_at.to_rfc3339()),
            },
            artifacts,
            kind: "task".to_string(),
        }
    }
}

/// Serialize canonical parts into their wire JSON.
///
/// A part that cannot be serialized is replaced by a text part naming the
/// failure, so the output keeps one entry per input part.
pub fn parts_to_wire(parts: &[MessagePart]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| {
            serde_json::to_value(part).unwrap_or_else(|e| {
                warn!(kind = part.kind(), "Cannot serialize message part: {}", e);
                json!({"type": "text", "text": format!("[unserializable {} part: {}]", part.kind(), e)})
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmi_core::{TaskRequest, TaskTracker};
    use serde_json::json;

    #[test]
    fn test_card_parses_with_missing_fields() {
        let card: AgentCard = serde_json::from_value(json!({
            "name": "Stakeholder Agent",
            "defaultInputModes": ["text/plain"],
            "skills": [{"id": "s", "name": "Stakeholder"}]
        }))
        .unwrap();

        assert_eq!(card.name, "Stakeholder Agent");
        assert_eq!(card.default_input_modes, vec!["text/plain"]);
        assert!(!card.capabilities.streaming);
        assert!(card.skills[0].tags.is_empty());
    }

    #[test]
    fn test_send_request_shape() {
        let message = Message::user(&[MessagePart::text("hi")], "m-1", "c-1");
        let request = JsonRpcRequest::new("m-1", METHOD_SEND_MESSAGE, MessageSendParams { message }).unwrap();
        let wire = serde_json::to_value(&request).unwrap();

        assert_eq!(wire["jsonrpc"], "2.0");
        assert_eq!(wire["method"], "message/send");
        assert_eq!(wire["params"]["message"]["role"], "user");
        assert_eq!(wire["params"]["message"]["messageId"], "m-1");
        assert_eq!(wire["params"]["message"]["contextId"], "c-1");
        assert_eq!(wire["params"]["message"]["parts"][0], json!({"type": "text", "text": "hi"}));
    }

    #[test]
    fn test_error_code_mapping() {
        let code = |e: CoreError| JsonRpcError::from(&e).code;
        assert_eq!(code(CoreError::InvalidParams("x".into())), codes::INVALID_PARAMS);
        assert_eq!(
            code(CoreError::UnsupportedFormat("audio/ogg".into())),
            codes::CONTENT_TYPE_NOT_SUPPORTED
        );
        assert_eq!(
            code(CoreError::UnsupportedOperation("cancel".into())),
            codes::UNSUPPORTED_OPERATION
        );
        assert_eq!(code(CoreError::InvalidState("x".into())), codes::INTERNAL_ERROR);
    }

    #[test]
    fn test_wire_task_from_completed_task() {
        let tracker = TaskTracker::new();
        tracker.observe(TaskRequest::new("t-1", "c-1", vec![MessagePart::text("in")]));
        tracker.start_work("t-1").unwrap();
        tracker.add_artifact("t-1", vec![MessagePart::text("# Out")]).unwrap();
        let task = tracker.complete("t-1").unwrap();

        let wire = serde_json::to_value(WireTask::from_task(&task, Some("brief"))).unwrap();
        assert_eq!(wire["id"], "t-1");
        assert_eq!(wire["contextId"], "c-1");
        assert_eq!(wire["status"]["state"], "completed");
        assert_eq!(wire["kind"], "task");
        assert_eq!(wire["artifacts"][0]["name"], "brief");
        assert_eq!(wire["artifacts"][0]["parts"][0]["text"], "# Out");
    }

    #[test]
    fn test_parts_to_wire_keeps_every_part() {
        let parts = vec![
            MessagePart::text("brief"),
            MessagePart::file_bytes("a.txt", "text/plain", b"abc".to_vec()),
            MessagePart::data(json!({"k": 1})),
        ];

        let wire = parts_to_wire(&parts);

        assert_eq!(wire.len(), parts.len());
        assert_eq!(wire[0], json!({"type": "text", "text": "brief"}));
        assert_eq!(wire[1]["type"], "file");
        assert_eq!(wire[2]["data"]["k"], 1);
    }
}
