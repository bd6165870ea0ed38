//! Conversation lifecycle notifications

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// State event payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum StateKind {
    ConversationStart {
        message_id: String,
    },
    ConversationThinking {},
    ConversationResponding {},
    ConversationEnd {
        reason: String,
        /// Milliseconds since the conversation started
        duration: i64,
    },
    ToolExecuting {
        tool_call_id: String,
        tool_name: String,
        input: Value,
    },
    ToolCompleted {
        tool_call_id: String,
        tool_name: String,
        is_error: bool,
    },
    ErrorOccurred {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<String>,
    },
}

impl StateKind {
    pub fn event_type(&self) -> &'static str {
        match self {
            StateKind::ConversationStart { .. } => "conversation_start",
            StateKind::ConversationThinking {} => "conversation_thinking",
            StateKind::ConversationResponding {} => "conversation_responding",
            StateKind::ConversationEnd { .. } => "conversation_end",
            StateKind::ToolExecuting { .. } => "tool_executing",
            StateKind::ToolCompleted { .. } => "tool_completed",
            StateKind::ErrorOccurred { .. } => "error_occurred",
        }
    }
}
