//! Pairs user requests with the model responses that complete them

use crate::event::{
    AgentInput, AgentOutput, Event, MessageEvent, MessageKind, StreamEvent, StreamKind,
    TokenUsage, TurnKind,
};
use crate::processor::{Processor, Transition};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Produces turn identifiers.
///
/// Ids must be unique across every conversation that shares the source, since
/// downstream consumers pair `turn_request` with `turn_response` by id.
///
/// The id source is the one input to the turn tracker that is not part of
/// its state, so the tracker is deterministic only when the source is:
/// `RandomTurnIds` is not, and a freshly built `SequentialTurnIds` replays
/// the same ids for the same inputs.
pub trait TurnIdSource: Send + Sync + Debug {
    fn turn_id(&self, requested_at: i64) -> String;
}

/// `turn_<timestamp>_<8 random alphanumerics>`
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTurnIds;

impl TurnIdSource for RandomTurnIds {
    fn turn_id(&self, requested_at: i64) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        format!("turn_{requested_at}_{}", suffix.to_ascii_lowercase())
    }
}

/// `turn_<timestamp>_<n>`, for replays that must be reproducible.
///
/// `n` counts every id issued by this source and its clones, so ids stay
/// unique across conversations and across `clear_state`.
#[derive(Debug, Clone, Default)]
pub struct SequentialTurnIds {
    next: Arc<AtomicU64>,
}

impl SequentialTurnIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TurnIdSource for SequentialTurnIds {
    fn turn_id(&self, requested_at: i64) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("turn_{requested_at}_{n}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTurn {
    pub turn_id: String,
    pub message_id: String,
    pub content: String,
    pub requested_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnTrackerState {
    pub pending_turn: Option<PendingTurn>,
    pub cost_per_input_token: f64,
    pub cost_per_output_token: f64,
}

impl TurnTrackerState {
    fn cost(&self, usage: TokenUsage) -> f64 {
        // u64 -> f64 loses precision only past 2^53 tokens
        #[allow(clippy::cast_precision_loss)]
        let (input, output) = (usage.input_tokens as f64, usage.output_tokens as f64);
        input * self.cost_per_input_token + output * self.cost_per_output_token
    }
}

#[derive(Debug, Clone)]
pub struct TurnTracker {
    ids: Arc<dyn TurnIdSource>,
    cost_per_input_token: f64,
    cost_per_output_token: f64,
}

impl Default for TurnTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnTracker {
    pub fn new() -> Self {
        Self {
            ids: Arc::new(RandomTurnIds),
            cost_per_input_token: 0.0,
            cost_per_output_token: 0.0,
        }
    }

    #[must_use]
    pub fn with_turn_ids(mut self, ids: impl TurnIdSource + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    /// Rates seeded into every new tracker state
    #[must_use]
    pub fn with_costs(mut self, per_input_token: f64, per_output_token: f64) -> Self {
        self.cost_per_input_token = per_input_token;
        self.cost_per_output_token = per_output_token;
        self
    }

    fn on_message(
        &self,
        mut state: TurnTrackerState,
        event: &MessageEvent,
    ) -> Transition<TurnTrackerState, AgentOutput> {
        let MessageKind::UserMessage { id, content } = &event.kind else {
            // assistant_message is reserved for usage accounting
            return Transition::unchanged(state);
        };

        let requested_at = event.timestamp;
        let turn_id = self.ids.turn_id(requested_at);

        if let Some(previous) = &state.pending_turn {
            tracing::debug!(
                turn_id = %previous.turn_id,
                "user message superseded an unanswered turn"
            );
        }
        state.pending_turn = Some(PendingTurn {
            turn_id: turn_id.clone(),
            message_id: id.clone(),
            content: content.clone(),
            requested_at,
        });

        Transition::new(state).with_output(AgentOutput::Turn(Event::new(
            requested_at,
            TurnKind::TurnRequest {
                turn_id,
                message_id: id.clone(),
                content: content.clone(),
                timestamp: requested_at,
            },
        )))
    }

    fn on_stream(
        mut state: TurnTrackerState,
        event: &StreamEvent,
    ) -> Transition<TurnTrackerState, AgentOutput> {
        let StreamKind::MessageStop { stop_reason } = &event.kind else {
            return Transition::unchanged(state);
        };
        if !stop_reason.completes_turn() {
            return Transition::unchanged(state);
        }
        let Some(pending) = state.pending_turn.take() else {
            return Transition::unchanged(state);
        };

        let completed_at = event.timestamp;
        // Usage is not reported by the driver stream yet
        let usage = TokenUsage::default();
        let cost = state.cost(usage);

        Transition::new(state).with_output(AgentOutput::Turn(Event::new(
            completed_at,
            TurnKind::TurnResponse {
                turn_id: pending.turn_id,
                message_id: pending.message_id,
                duration: completed_at.saturating_sub(pending.requested_at).max(0),
                usage,
                cost,
                timestamp: completed_at,
            },
        )))
    }
}

impl Processor for TurnTracker {
    type State = TurnTrackerState;
    type Input = AgentInput;
    type Output = AgentOutput;

    fn initial_state(&self) -> TurnTrackerState {
        TurnTrackerState {
            pending_turn: None,
            cost_per_input_token: self.cost_per_input_token,
            cost_per_output_token: self.cost_per_output_token,
        }
    }

    fn process(
        &self,
        state: TurnTrackerState,
        input: &AgentInput,
    ) -> Transition<TurnTrackerState, AgentOutput> {
        match input {
            AgentInput::Message(event) => self.on_message(state, event),
            AgentInput::Stream(event) => Self::on_stream(state, event),
        }
    }
}
