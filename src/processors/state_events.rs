//! Conversation lifecycle tracking
//!
//! Phases:
//!
//! ```text
//! idle --message_start--> thinking --text_delta--> responding
//!   ^                        |                          |
//!   |                        +--message_stop(tool_use)--+--> awaiting_tool
//!   |                                                           |
//!   +---- message_stop(end_turn | max_tokens | stop_sequence) ---+
//!   +---- interrupted / error_received
//! ```

use crate::event::{
    AgentInput, AgentOutput, Event, MessageEvent, MessageKind, StateKind, StreamEvent, StreamKind,
};
use crate::processor::{Processor, Transition};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    #[default]
    Idle,
    /// Model has started a message but produced no text yet
    Thinking,
    Responding,
    /// Model stopped for a tool round-trip
    AwaitingTool,
}

impl ConversationPhase {
    pub fn is_active(self) -> bool {
        !matches!(self, ConversationPhase::Idle)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEventContext {
    pub phase: ConversationPhase,
    /// Timestamp of the `message_start` that opened the conversation
    pub started_at: Option<i64>,
    pub tools_in_flight: u32,
}

impl StateEventContext {
    fn end(mut self) -> Self {
        self.phase = ConversationPhase::Idle;
        self.started_at = None;
        self.tools_in_flight = 0;
        self
    }

    fn elapsed(&self, now: i64) -> i64 {
        self.started_at.map_or(0, |start| now.saturating_sub(start).max(0))
    }
}

/// Emits lifecycle notifications as the driver stream moves between phases
#[derive(Debug, Clone, Copy, Default)]
pub struct StateEventProcessor;

impl Processor for StateEventProcessor {
    type State = StateEventContext;
    type Input = AgentInput;
    type Output = AgentOutput;

    fn initial_state(&self) -> StateEventContext {
        StateEventContext::default()
    }

    fn process(
        &self,
        state: StateEventContext,
        input: &AgentInput,
    ) -> Transition<StateEventContext, AgentOutput> {
        match input {
            AgentInput::Stream(event) => on_stream(state, event),
            AgentInput::Message(event) => on_message(state, event),
        }
    }
}

fn notify(timestamp: i64, kind: StateKind) -> AgentOutput {
    AgentOutput::State(Event::new(timestamp, kind))
}

fn on_stream(
    mut state: StateEventContext,
    event: &StreamEvent,
) -> Transition<StateEventContext, AgentOutput> {
    let timestamp = event.timestamp;

    match (state.phase, &event.kind) {
        (ConversationPhase::Idle, StreamKind::MessageStart { message_id, .. }) => {
            state.phase = ConversationPhase::Thinking;
            state.started_at = Some(timestamp);
            Transition::new(state)
                .with_output(notify(
                    timestamp,
                    StateKind::ConversationStart {
                        message_id: message_id.clone(),
                    },
                ))
                .with_output(notify(timestamp, StateKind::ConversationThinking {}))
        }

        // Follow-up message within the same conversation (e.g. after a tool result)
        (_, StreamKind::MessageStart { .. }) => {
            state.phase = ConversationPhase::Thinking;
            Transition::new(state).with_output(notify(timestamp, StateKind::ConversationThinking {}))
        }

        (
            ConversationPhase::Thinking | ConversationPhase::AwaitingTool,
            StreamKind::TextDelta { .. },
        ) => {
            state.phase = ConversationPhase::Responding;
            Transition::new(state)
                .with_output(notify(timestamp, StateKind::ConversationResponding {}))
        }

        (phase, StreamKind::MessageStop { stop_reason }) if phase.is_active() => {
            if !stop_reason.completes_turn() {
                state.phase = ConversationPhase::AwaitingTool;
                return Transition::new(state);
            }
            let duration = state.elapsed(timestamp);
            Transition::new(state.end()).with_output(notify(
                timestamp,
                StateKind::ConversationEnd {
                    reason: stop_reason.as_str().to_string(),
                    duration,
                },
            ))
        }

        (phase, StreamKind::Interrupted { .. }) if phase.is_active() => {
            let duration = state.elapsed(timestamp);
            Transition::new(state.end()).with_output(notify(
                timestamp,
                StateKind::ConversationEnd {
                    reason: "interrupted".to_string(),
                    duration,
                },
            ))
        }

        (_, StreamKind::ErrorReceived {
            message,
            error_code,
        }) => Transition::new(state.end()).with_output(notify(
            timestamp,
            StateKind::ErrorOccurred {
                message: message.clone(),
                error_code: error_code.clone(),
            },
        )),

        _ => Transition::unchanged(state),
    }
}

fn on_message(
    mut state: StateEventContext,
    event: &MessageEvent,
) -> Transition<StateEventContext, AgentOutput> {
    let timestamp = event.timestamp;

    match &event.kind {
        MessageKind::ToolCallMessage { tool_call, .. } => {
            state.tools_in_flight += 1;
            Transition::new(state).with_output(notify(
                timestamp,
                StateKind::ToolExecuting {
                    tool_call_id: tool_call.id.clone(),
                    tool_name: tool_call.name.clone(),
                    input: tool_call.input.clone(),
                },
            ))
        }

        MessageKind::ToolResultMessage { tool_result, .. } => {
            state.tools_in_flight = state.tools_in_flight.saturating_sub(1);
            Transition::new(state).with_output(notify(
                timestamp,
                StateKind::ToolCompleted {
                    tool_call_id: tool_result.tool_call_id.clone(),
                    tool_name: tool_result.name.clone(),
                    is_error: tool_result.is_error,
                },
            ))
        }

        MessageKind::UserMessage { .. } | MessageKind::AssistantMessage { .. } => {
            Transition::new(state)
        }
    }
}
