//! Assembles streamed fragments into complete messages

use crate::event::{
    AgentInput, AgentOutput, Event, MessageKind, StreamEvent, StreamKind, ToolCall, ToolResult,
};
use crate::processor::{Processor, Transition};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A `tool_use` content block that has started but not yet stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingToolBlock {
    pub id: String,
    pub name: String,
    /// Argument JSON accumulated from `input_json_delta` fragments
    pub input_json: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAssemblerState {
    /// Id announced by the current `message_start`
    pub message_id: Option<String>,
    pub text: String,
    pub open_tools: Vec<PendingToolBlock>,
    /// Tool call id → tool name, for calls whose result has not arrived yet
    pub awaiting_results: BTreeMap<String, String>,
    /// Number of assistant messages assembled so far
    pub sequence: u64,
}

impl MessageAssemblerState {
    fn discard_buffers(&mut self) {
        self.message_id = None;
        self.text.clear();
        self.open_tools.clear();
    }
}

/// Buffers text and tool fragments until a boundary event closes them
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageAssembler;

impl Processor for MessageAssembler {
    type State = MessageAssemblerState;
    type Input = AgentInput;
    type Output = AgentOutput;

    fn initial_state(&self) -> MessageAssemblerState {
        MessageAssemblerState::default()
    }

    fn process(
        &self,
        state: MessageAssemblerState,
        input: &AgentInput,
    ) -> Transition<MessageAssemblerState, AgentOutput> {
        match input {
            AgentInput::Stream(event) => assemble(state, event),
            AgentInput::Message(_) => Transition::unchanged(state),
        }
    }
}

fn assemble(
    mut state: MessageAssemblerState,
    event: &StreamEvent,
) -> Transition<MessageAssemblerState, AgentOutput> {
    let timestamp = event.timestamp;

    match &event.kind {
        StreamKind::MessageStart { message_id, .. } => {
            state.discard_buffers();
            state.message_id = Some(message_id.clone());
            Transition::new(state)
        }

        StreamKind::TextDelta { text } => {
            state.text.push_str(text);
            Transition::new(state)
        }

        StreamKind::ToolUseContentBlockStart { id, name } => {
            state.open_tools.push(PendingToolBlock {
                id: id.clone(),
                name: name.clone(),
                input_json: String::new(),
            });
            Transition::new(state)
        }

        StreamKind::InputJsonDelta { partial_json } => {
            if let Some(block) = state.open_tools.last_mut() {
                block.input_json.push_str(partial_json);
            }
            Transition::new(state)
        }

        StreamKind::ToolUseContentBlockStop { id } => {
            let Some(position) = state.open_tools.iter().position(|b| &b.id == id) else {
                return Transition::unchanged(state);
            };
            let block = state.open_tools.remove(position);
            state
                .awaiting_results
                .insert(block.id.clone(), block.name.clone());

            let message = MessageKind::ToolCallMessage {
                id: format!("msg_{}", block.id),
                tool_call: ToolCall {
                    input: parse_tool_input(&block.input_json),
                    id: block.id,
                    name: block.name,
                },
            };
            Transition::new(state).with_output(AgentOutput::Message(Event::new(timestamp, message)))
        }

        StreamKind::MessageStop { .. } => {
            let text = std::mem::take(&mut state.text);
            let message_id = state.message_id.take();
            state.open_tools.clear();
            if text.is_empty() {
                return Transition::new(state);
            }

            state.sequence += 1;
            let id = message_id.unwrap_or_else(|| format!("msg_{timestamp}_{}", state.sequence));
            let message = MessageKind::AssistantMessage { id, content: text };
            Transition::new(state).with_output(AgentOutput::Message(Event::new(timestamp, message)))
        }

        StreamKind::ToolResult {
            tool_id,
            content,
            is_error,
        } => {
            let name = state
                .awaiting_results
                .remove(tool_id)
                .unwrap_or_else(|| "unknown".to_string());
            let message = MessageKind::ToolResultMessage {
                id: format!("msg_result_{tool_id}"),
                tool_result: ToolResult {
                    tool_call_id: tool_id.clone(),
                    name,
                    output: content.clone(),
                    is_error: *is_error,
                },
            };
            Transition::new(state).with_output(AgentOutput::Message(Event::new(timestamp, message)))
        }

        // The conversation is over; results for its calls will not arrive
        StreamKind::Interrupted { .. } | StreamKind::ErrorReceived { .. } => {
            state.discard_buffers();
            state.awaiting_results.clear();
            Transition::new(state)
        }

        StreamKind::Unknown { .. } => Transition::unchanged(state),
    }
}

/// Empty arguments mean `{}`; arguments that are not valid JSON are kept as
/// the raw string rather than dropped.
fn parse_tool_input(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Map::new());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
