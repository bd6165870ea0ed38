//! Assembled conversational messages

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool invocation assembled from streamed content blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// Output of a tool invocation, paired with the call that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub tool_call_id: String,
    pub name: String,
    pub output: Value,
    #[serde(default)]
    pub is_error: bool,
}

/// Message event payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum MessageKind {
    UserMessage { id: String, content: String },
    AssistantMessage { id: String, content: String },
    ToolCallMessage { id: String, tool_call: ToolCall },
    ToolResultMessage { id: String, tool_result: ToolResult },
}

impl MessageKind {
    pub fn event_type(&self) -> &'static str {
        match self {
            MessageKind::UserMessage { .. } => "user_message",
            MessageKind::AssistantMessage { .. } => "assistant_message",
            MessageKind::ToolCallMessage { .. } => "tool_call_message",
            MessageKind::ToolResultMessage { .. } => "tool_result_message",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            MessageKind::UserMessage { id, .. }
            | MessageKind::AssistantMessage { id, .. }
            | MessageKind::ToolCallMessage { id, .. }
            | MessageKind::ToolResultMessage { id, .. } => id,
        }
    }

    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        MessageKind::UserMessage {
            id: id.into(),
            content: content.into(),
        }
    }
}
