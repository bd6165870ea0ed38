//! Agent event processing engine
//!
//! Turns the low-level event stream of an LLM driver into assembled
//! messages, conversation lifecycle notifications and request/response turn
//! pairs, using composable Mealy-machine processors with per-conversation
//! state.

pub mod config;
pub mod engine;
pub mod event;
pub mod jsonl;
pub mod mealy;
pub mod processor;
pub mod processors;
pub mod telemetry;

pub use config::{ConfigError, EngineConfig, TurnIdMode};
pub use engine::{AgentEngine, EngineError};
pub use event::{AgentEvent, AgentInput, AgentOutput, CodecError, RawEvent};
pub use processor::{Feedback, Processor, Transition};
pub use processors::{AgentProcessor, AgentState};
