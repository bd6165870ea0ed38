//! Pure Mealy transition functions
//!
//! A processor maps `(state, input)` to `(new_state, outputs)`. Given the same
//! inputs it always produces the same result and performs no I/O. State is
//! taken by value and a new value is returned, so a processor can never
//! observe or mutate state it does not own.

mod combine;
mod func;

pub use func::{from_fn, FnProcessor};

/// Result of one processor step
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S, O> {
    pub new_state: S,
    pub outputs: Vec<O>,
}

impl<S, O> Transition<S, O> {
    /// A step with no outputs yet
    pub fn new(state: S) -> Self {
        Self {
            new_state: state,
            outputs: vec![],
        }
    }

    /// The no-op branch for inputs a processor does not recognize
    pub fn unchanged(state: S) -> Self {
        Self::new(state)
    }

    #[must_use]
    pub fn with_output(mut self, output: O) -> Self {
        self.outputs.push(output);
        self
    }

    #[must_use]
    pub fn with_outputs(mut self, outputs: impl IntoIterator<Item = O>) -> Self {
        self.outputs.extend(outputs);
        self
    }

    pub fn into_parts(self) -> (S, Vec<O>) {
        (self.new_state, self.outputs)
    }
}

/// A pure Mealy transition function with its own zero state.
///
/// Implementations must be total: any input they do not handle returns the
/// state unchanged with no outputs.
pub trait Processor {
    type State: Clone;
    type Input;
    type Output;

    fn initial_state(&self) -> Self::State;

    fn process(&self, state: Self::State, input: &Self::Input)
        -> Transition<Self::State, Self::Output>;
}

/// Converts a processor output back into an input for re-injection.
///
/// Returning `None` marks the output as terminal: it is reported but never
/// fed back through the processor.
pub trait Feedback<I> {
    fn feedback(&self) -> Option<I>;
}

impl<T: Clone> Feedback<T> for T {
    fn feedback(&self) -> Option<T> {
        Some(self.clone())
    }
}
