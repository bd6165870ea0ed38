//! Event algebra
//!
//! Events are partitioned into four disjoint families: driver stream events,
//! assembled messages, conversation state notifications and turn pairing.
//! `AgentInput` and `AgentOutput` are the sum types the composite processor
//! consumes and produces; `AgentEvent` covers everything the engine returns.

mod message;
mod state;
mod stream;
mod turn;
mod wire;

pub use message::{MessageKind, ToolCall, ToolResult};
pub use state::StateKind;
pub use stream::{StopReason, StreamKind};
pub use turn::{TokenUsage, TurnKind};
pub use wire::{CodecError, RawEvent};

/// A timestamped event of one family
#[derive(Debug, Clone, PartialEq)]
pub struct Event<K> {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub kind: K,
}

impl<K> Event<K> {
    pub fn new(timestamp: i64, kind: K) -> Self {
        Self { timestamp, kind }
    }
}

pub type StreamEvent = Event<StreamKind>;
pub type MessageEvent = Event<MessageKind>;
pub type StateEvent = Event<StateKind>;
pub type TurnEvent = Event<TurnKind>;

/// Everything the composite processor accepts
#[derive(Debug, Clone, PartialEq)]
pub enum AgentInput {
    Stream(StreamEvent),
    Message(MessageEvent),
}

/// Everything the composite processor emits. Raw stream events are never
/// outputs; passing the original input through is the engine's job.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    Message(MessageEvent),
    State(StateEvent),
    Turn(TurnEvent),
}

/// Any event the engine can receive or return
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Stream(StreamEvent),
    Message(MessageEvent),
    State(StateEvent),
    Turn(TurnEvent),
}

impl AgentInput {
    pub fn timestamp(&self) -> i64 {
        match self {
            AgentInput::Stream(e) => e.timestamp,
            AgentInput::Message(e) => e.timestamp,
        }
    }

    pub fn event_type(&self) -> &str {
        match self {
            AgentInput::Stream(e) => e.kind.event_type(),
            AgentInput::Message(e) => e.kind.event_type(),
        }
    }
}

impl AgentOutput {
    pub fn timestamp(&self) -> i64 {
        match self {
            AgentOutput::Message(e) => e.timestamp,
            AgentOutput::State(e) => e.timestamp,
            AgentOutput::Turn(e) => e.timestamp,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            AgentOutput::Message(e) => e.kind.event_type(),
            AgentOutput::State(e) => e.kind.event_type(),
            AgentOutput::Turn(e) => e.kind.event_type(),
        }
    }
}

impl AgentEvent {
    pub fn timestamp(&self) -> i64 {
        match self {
            AgentEvent::Stream(e) => e.timestamp,
            AgentEvent::Message(e) => e.timestamp,
            AgentEvent::State(e) => e.timestamp,
            AgentEvent::Turn(e) => e.timestamp,
        }
    }

    pub fn event_type(&self) -> &str {
        match self {
            AgentEvent::Stream(e) => e.kind.event_type(),
            AgentEvent::Message(e) => e.kind.event_type(),
            AgentEvent::State(e) => e.kind.event_type(),
            AgentEvent::Turn(e) => e.kind.event_type(),
        }
    }

    /// The processor input this event corresponds to, if it is one.
    /// State and turn events are outputs only.
    pub fn as_input(&self) -> Option<AgentInput> {
        match self {
            AgentEvent::Stream(e) => Some(AgentInput::Stream(e.clone())),
            AgentEvent::Message(e) => Some(AgentInput::Message(e.clone())),
            AgentEvent::State(_) | AgentEvent::Turn(_) => None,
        }
    }

    pub fn stream(timestamp: i64, kind: StreamKind) -> Self {
        AgentEvent::Stream(Event::new(timestamp, kind))
    }

    pub fn message(timestamp: i64, kind: MessageKind) -> Self {
        AgentEvent::Message(Event::new(timestamp, kind))
    }
}

impl From<AgentInput> for AgentEvent {
    fn from(input: AgentInput) -> Self {
        match input {
            AgentInput::Stream(e) => AgentEvent::Stream(e),
            AgentInput::Message(e) => AgentEvent::Message(e),
        }
    }
}

impl From<AgentOutput> for AgentEvent {
    fn from(output: AgentOutput) -> Self {
        match output {
            AgentOutput::Message(e) => AgentEvent::Message(e),
            AgentOutput::State(e) => AgentEvent::State(e),
            AgentOutput::Turn(e) => AgentEvent::Turn(e),
        }
    }
}

impl From<StreamEvent> for AgentInput {
    fn from(event: StreamEvent) -> Self {
        AgentInput::Stream(event)
    }
}

impl From<MessageEvent> for AgentInput {
    fn from(event: MessageEvent) -> Self {
        AgentInput::Message(event)
    }
}

impl From<StreamEvent> for AgentEvent {
    fn from(event: StreamEvent) -> Self {
        AgentEvent::Stream(event)
    }
}

impl From<MessageEvent> for AgentEvent {
    fn from(event: MessageEvent) -> Self {
        AgentEvent::Message(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_and_turn_events_are_not_inputs() {
        let state = AgentEvent::State(Event::new(1, StateKind::ConversationThinking {}));
        assert!(state.as_input().is_none());

        let delta = AgentEvent::stream(1, StreamKind::text_delta("hi"));
        assert_eq!(
            delta.as_input(),
            Some(AgentInput::Stream(Event::new(1, StreamKind::text_delta("hi"))))
        );
    }

    #[test]
    fn test_event_type_names() {
        let unknown = AgentEvent::stream(
            5,
            StreamKind::Unknown {
                event_type: "thinking_delta".to_string(),
                data: serde_json::Value::Null,
            },
        );
        assert_eq!(unknown.event_type(), "thinking_delta");
        assert_eq!(unknown.timestamp(), 5);

        let user = AgentEvent::message(7, MessageKind::user("m1", "hi"));
        assert_eq!(user.event_type(), "user_message");
    }
}
