use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::codes;
use crate::normalize::ChatMessage;

pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 response envelope. Exactly one of `result`/`error` is
/// set; the gateway emits nothing else on the wire.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn parse_error(details: impl Into<String>) -> Self {
        Self {
            code: codes::PARSE_ERROR,
            message: "Parse error: Invalid JSON".to_string(),
            data: Some(serde_json::json!({ "details": details.into() })),
        }
    }

    pub fn invalid_request() -> Self {
        Self {
            code: codes::INVALID_REQUEST,
            message: "Invalid Request: JSON-RPC version must be 2.0".to_string(),
            data: None,
        }
    }

    pub fn agent_not_found(agent_id: &str, available: Vec<String>) -> Self {
        Self {
            code: codes::AGENT_NOT_FOUND,
            message: format!("Agent '{agent_id}' not found"),
            data: Some(serde_json::json!({ "availableAgents": available })),
        }
    }

    pub fn generation_error(details: impl Into<String>) -> Self {
        Self {
            code: codes::GENERATION_ERROR,
            message: "Agent generation error".to_string(),
            data: Some(serde_json::json!({ "details": details.into() })),
        }
    }

    pub fn internal(details: Option<String>) -> Self {
        Self {
            code: codes::INTERNAL_ERROR,
            message: "Internal error".to_string(),
            data: details.map(|d| serde_json::json!({ "details": d })),
        }
    }
}

/// One text part of an A2A message or artifact.
#[derive(Debug, Clone, Serialize)]
pub struct TextPart {
    pub kind: &'static str,
    pub text: String,
}

impl TextPart {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            kind: "text",
            text: text.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMessage {
    pub kind: &'static str,
    pub role: String,
    pub parts: Vec<TextPart>,
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskStatus {
    pub state: &'static str,
    pub timestamp: String,
    pub message: TaskMessage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub artifact_id: String,
    pub name: String,
    pub parts: Vec<TextPart>,
}

/// Completed A2A task result: final status plus the full message
/// history (inputs in order, then exactly one trailing agent message).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub id: String,
    pub context_id: String,
    pub status: TaskStatus,
    pub artifacts: Vec<Artifact>,
    pub history: Vec<TaskMessage>,
    pub kind: &'static str,
}

impl TaskResult {
    pub fn completed(
        agent_id: &str,
        agent_text: &str,
        task_id: String,
        context_id: String,
        inputs: &[ChatMessage],
    ) -> Self {
        let message_id = Uuid::new_v4().to_string();

        let status_message = TaskMessage {
            kind: "message",
            role: "agent".to_string(),
            parts: vec![TextPart::new(agent_text)],
            message_id: message_id.clone(),
            task_id: None,
        };

        let mut history: Vec<TaskMessage> = inputs
            .iter()
            .map(|m| TaskMessage {
                kind: "message",
                role: m.role.clone(),
                parts: vec![TextPart::new(&m.content)],
                message_id: Uuid::new_v4().to_string(),
                task_id: Some(task_id.clone()),
            })
            .collect();
        history.push(TaskMessage {
            kind: "message",
            role: "agent".to_string(),
            parts: vec![TextPart::new(agent_text)],
            message_id,
            task_id: Some(task_id.clone()),
        });

        Self {
            id: task_id,
            context_id,
            status: TaskStatus {
                state: "completed",
                timestamp: Utc::now().to_rfc3339(),
                message: status_message,
            },
            artifacts: vec![Artifact {
                artifact_id: Uuid::new_v4().to_string(),
                name: format!("{agent_id}Response"),
                parts: vec![TextPart::new(agent_text)],
            }],
            history,
            kind: "task",
        }
    }
}
