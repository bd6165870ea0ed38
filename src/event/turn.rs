//! Request/response pairing events

use serde::{Deserialize, Serialize};

/// Token counts attributed to a turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_field_names)] // tokens suffix is meaningful
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Turn event payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum TurnKind {
    TurnRequest {
        turn_id: String,
        message_id: String,
        content: String,
        timestamp: i64,
    },
    TurnResponse {
        turn_id: String,
        message_id: String,
        /// Milliseconds between the request and the completing `message_stop`
        duration: i64,
        usage: TokenUsage,
        cost: f64,
        timestamp: i64,
    },
}

impl TurnKind {
    pub fn event_type(&self) -> &'static str {
        match self {
            TurnKind::TurnRequest { .. } => "turn_request",
            TurnKind::TurnResponse { .. } => "turn_response",
        }
    }

    pub fn turn_id(&self) -> &str {
        match self {
            TurnKind::TurnRequest { turn_id, .. } | TurnKind::TurnResponse { turn_id, .. } => {
                turn_id
            }
        }
    }
}
