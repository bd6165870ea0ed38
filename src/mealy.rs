//! Mealy runtime
//!
//! Drives a processor against per-key persisted state, optionally feeding its
//! outputs back in as new inputs, and broadcasts results to sinks.

mod runtime;
mod sink;
mod store;

pub use runtime::{MealyResult, MealyRuntime, DEFAULT_MAX_DEPTH};
pub use sink::{AsyncSink, FnSink, Sink, SinkError, SinkSet};
pub use store::{MemoryStore, Store};
