//! The composite agent processor

use super::{
    MessageAssembler, MessageAssemblerState, StateEventContext, StateEventProcessor, TurnTracker,
    TurnTrackerState,
};
use crate::event::{AgentInput, AgentOutput};
use crate::processor::{Feedback, Processor, Transition};
use serde::{Deserialize, Serialize};

/// Per-conversation state, one named slot per sub-processor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub message_assembler: MessageAssemblerState,
    pub state_events: StateEventContext,
    pub turn_tracker: TurnTrackerState,
}

type Slots = (MessageAssemblerState, StateEventContext, TurnTrackerState);

impl From<Slots> for AgentState {
    fn from((message_assembler, state_events, turn_tracker): Slots) -> Self {
        Self {
            message_assembler,
            state_events,
            turn_tracker,
        }
    }
}

impl From<AgentState> for Slots {
    fn from(state: AgentState) -> Self {
        (state.message_assembler, state.state_events, state.turn_tracker)
    }
}

/// Message assembly, lifecycle notifications and turn pairing, run in that
/// order on every input.
///
/// Deterministic only when its turn id source is; the default uses
/// `RandomTurnIds`. See [`TurnIdSource`](super::TurnIdSource).
#[derive(Debug, Clone, Default)]
pub struct AgentProcessor {
    inner: (MessageAssembler, StateEventProcessor, TurnTracker),
}

impl AgentProcessor {
    pub fn new(turn_tracker: TurnTracker) -> Self {
        Self {
            inner: (MessageAssembler, StateEventProcessor, turn_tracker),
        }
    }

    pub fn turn_tracker(&self) -> &TurnTracker {
        &self.inner.2
    }
}

impl Processor for AgentProcessor {
    type State = AgentState;
    type Input = AgentInput;
    type Output = AgentOutput;

    fn initial_state(&self) -> AgentState {
        self.inner.initial_state().into()
    }

    fn process(&self, state: AgentState, input: &AgentInput) -> Transition<AgentState, AgentOutput> {
        let (slots, outputs) = self.inner.process(state.into(), input).into_parts();
        Transition::new(slots.into()).with_outputs(outputs)
    }
}

/// Assembled messages are fed back in; state and turn notifications are
/// terminal.
impl Feedback<AgentInput> for AgentOutput {
    fn feedback(&self) -> Option<AgentInput> {
        match self {
            AgentOutput::Message(event) => Some(AgentInput::Message(event.clone())),
            AgentOutput::State(_) | AgentOutput::Turn(_) => None,
        }
    }
}
