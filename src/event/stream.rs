//! Low-level events produced by the language-model driver

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why the model stopped producing the current message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
}

impl StopReason {
    /// Whether the model has finished its side of the turn.
    ///
    /// `ToolUse` leaves the turn open: the model is waiting for a tool
    /// round-trip and will continue with another message.
    pub fn completes_turn(self) -> bool {
        !matches!(self, StopReason::ToolUse)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::EndTurn => "end_turn",
            StopReason::ToolUse => "tool_use",
            StopReason::MaxTokens => "max_tokens",
            StopReason::StopSequence => "stop_sequence",
        }
    }
}

/// Driver stream event payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum StreamKind {
    MessageStart {
        message_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },
    TextDelta {
        text: String,
    },
    ToolUseContentBlockStart {
        id: String,
        name: String,
    },
    /// Fragment of a tool call's JSON arguments
    InputJsonDelta {
        partial_json: String,
    },
    ToolUseContentBlockStop {
        id: String,
    },
    MessageStop {
        stop_reason: StopReason,
    },
    ToolResult {
        tool_id: String,
        #[serde(default)]
        content: Value,
        #[serde(default)]
        is_error: bool,
    },
    Interrupted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    ErrorReceived {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<String>,
    },
    /// Fallback for event types this crate does not know about, or known
    /// types whose payload failed to parse. Never produced by serde directly.
    #[serde(skip)]
    Unknown { event_type: String, data: Value },
}

impl StreamKind {
    pub fn event_type(&self) -> &str {
        match self {
            StreamKind::MessageStart { .. } => "message_start",
            StreamKind::TextDelta { .. } => "text_delta",
            StreamKind::ToolUseContentBlockStart { .. } => "tool_use_content_block_start",
            StreamKind::InputJsonDelta { .. } => "input_json_delta",
            StreamKind::ToolUseContentBlockStop { .. } => "tool_use_content_block_stop",
            StreamKind::MessageStop { .. } => "message_stop",
            StreamKind::ToolResult { .. } => "tool_result",
            StreamKind::Interrupted { .. } => "interrupted",
            StreamKind::ErrorReceived { .. } => "error_received",
            StreamKind::Unknown { event_type, .. } => event_type,
        }
    }

    pub fn text_delta(text: impl Into<String>) -> Self {
        StreamKind::TextDelta { text: text.into() }
    }

    pub fn message_stop(stop_reason: StopReason) -> Self {
        StreamKind::MessageStop { stop_reason }
    }
}
