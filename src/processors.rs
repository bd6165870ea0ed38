//! Sub-processors deriving messages, lifecycle notifications and turns from
//! the driver stream, and the composite that wires them together.

mod agent;
mod message_assembler;
mod state_events;
mod turn_tracker;

#[cfg(test)]
mod proptests;

pub use agent::{AgentProcessor, AgentState};
pub use message_assembler::{MessageAssembler, MessageAssemblerState, PendingToolBlock};
pub use state_events::{ConversationPhase, StateEventContext, StateEventProcessor};
pub use turn_tracker::{
    PendingTurn, RandomTurnIds, SequentialTurnIds, TurnIdSource, TurnTracker, TurnTrackerState,
};
