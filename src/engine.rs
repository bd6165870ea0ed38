//! Per-agent orchestration engine
//!
//! Wraps the composite [`AgentProcessor`] with per-conversation state and
//! chained re-injection. Each call returns the input event itself followed by
//! everything derived from it.
//!
//! Re-injection runs on an explicit work stack rather than call recursion.
//! Two bounds keep a misbehaving processor from running away: the depth of a
//! single chain and the total number of processor steps per call. Hitting
//! either logs a warning and keeps the partial result.

use crate::config::{EngineConfig, DEFAULT_MAX_CHAIN_DEPTH, DEFAULT_MAX_CHAIN_STEPS};
use crate::event::{AgentEvent, AgentInput, AgentOutput};
use crate::mealy::{MemoryStore, Store};
use crate::processor::{Feedback, Processor};
use crate::processors::{AgentProcessor, AgentState};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Processor panicked on {event_type} for agent {agent_id}: {message}")]
    ProcessorPanicked {
        agent_id: String,
        event_type: String,
        message: String,
    },
}

pub struct AgentEngine<St = MemoryStore<AgentState>> {
    processor: AgentProcessor,
    store: St,
    max_chain_depth: usize,
    max_chain_steps: usize,
}

impl AgentEngine {
    pub fn new() -> Self {
        Self::with_store(AgentProcessor::default(), MemoryStore::new())
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_store(AgentProcessor::new(config.turn_tracker()), MemoryStore::new())
            .with_max_chain_depth(config.max_chain_depth)
            .with_max_chain_steps(config.max_chain_steps)
    }
}

impl Default for AgentEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Chain progress for one `process` call
struct Chain {
    state: AgentState,
    events: Vec<AgentEvent>,
    steps: usize,
}

impl<St: Store<AgentState>> AgentEngine<St> {
    pub fn with_store(processor: AgentProcessor, store: St) -> Self {
        Self {
            processor,
            store,
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            max_chain_steps: DEFAULT_MAX_CHAIN_STEPS,
        }
    }

    #[must_use]
    pub fn with_max_chain_depth(mut self, max_chain_depth: usize) -> Self {
        self.max_chain_depth = max_chain_depth;
        self
    }

    #[must_use]
    pub fn with_max_chain_steps(mut self, max_chain_steps: usize) -> Self {
        self.max_chain_steps = max_chain_steps;
        self
    }

    pub fn processor(&self) -> &AgentProcessor {
        &self.processor
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    /// Process one event for `agent_id`.
    ///
    /// Never fails: if a processor panics the panic is logged, the stored
    /// state is left as it was and only the input itself is returned.
    pub fn process(&self, agent_id: &str, event: AgentEvent) -> Vec<AgentEvent> {
        let fallback = event.clone();
        self.try_process(agent_id, event).unwrap_or_else(|e| {
            tracing::error!(agent_id = %agent_id, error = %e, "Event processing aborted");
            vec![fallback]
        })
    }

    /// Process one event for `agent_id`, reporting processor panics.
    ///
    /// The first element of the result is always `event`. State is persisted
    /// only if the whole chain completes.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::ProcessorPanicked` if a processor panics. The
    /// stored state is left as it was before the call.
    pub fn try_process(
        &self,
        agent_id: &str,
        event: AgentEvent,
    ) -> Result<Vec<AgentEvent>, EngineError> {
        let state = self
            .store
            .get(agent_id)
            .unwrap_or_else(|| self.processor.initial_state());
        let event_type = event.event_type().to_string();

        let chain =
            panic::catch_unwind(AssertUnwindSafe(|| self.run_chain(agent_id, state, event)))
                .map_err(|payload| EngineError::ProcessorPanicked {
                    agent_id: agent_id.to_string(),
                    event_type: event_type.clone(),
                    message: panic_message(payload.as_ref()),
                })?;

        self.store.set(agent_id, chain.state);
        tracing::trace!(
            agent_id = %agent_id,
            event_type = %event_type,
            steps = chain.steps,
            outputs = chain.events.len() - 1,
            "Processed event"
        );
        Ok(chain.events)
    }

    fn run_chain(&self, agent_id: &str, state: AgentState, event: AgentEvent) -> Chain {
        let input = event.as_input();
        let mut chain = Chain {
            state,
            events: vec![event],
            steps: 0,
        };

        let Some(input) = input else {
            // State and turn events are outputs only; pass them through
            return chain;
        };

        let mut pending: Vec<(AgentInput, usize)> = vec![(input, 0)];
        while let Some((input, depth)) = pending.pop() {
            if depth >= self.max_chain_depth {
                tracing::warn!(
                    agent_id = %agent_id,
                    depth,
                    event_type = %input.event_type(),
                    "Maximum chain depth reached, dropping branch"
                );
                continue;
            }
            if chain.steps >= self.max_chain_steps {
                tracing::warn!(
                    agent_id = %agent_id,
                    steps = chain.steps,
                    dropped = pending.len() + 1,
                    "Maximum chain steps reached, stopping"
                );
                break;
            }

            let (next_state, outputs) = self
                .processor
                .process(std::mem::take(&mut chain.state), &input)
                .into_parts();
            chain.state = next_state;
            chain.steps += 1;

            // Reverse so the first output's chain runs first
            let fed_back: Vec<AgentInput> = outputs
                .iter()
                .filter_map(<AgentOutput as Feedback<AgentInput>>::feedback)
                .collect();
            pending.extend(fed_back.into_iter().rev().map(|next| (next, depth + 1)));
            chain.events.extend(outputs.into_iter().map(AgentEvent::from));
        }

        chain
    }

    pub fn clear_state(&self, agent_id: &str) {
        self.store.delete(agent_id);
    }

    /// Pure existence check; never creates state
    pub fn has_state(&self, agent_id: &str) -> bool {
        self.store.has(agent_id)
    }

    /// Snapshot of the stored state for `agent_id`
    pub fn state(&self, agent_id: &str) -> Option<AgentState> {
        self.store.get(agent_id)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
