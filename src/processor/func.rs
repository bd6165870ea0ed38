//! Processors built from closures

use super::{Processor, Transition};
use std::fmt;
use std::marker::PhantomData;

/// A processor defined by an initial-state closure and a step closure
pub struct FnProcessor<S, I, O, G, F> {
    init: G,
    step: F,
    _marker: PhantomData<fn(S, &I) -> O>,
}

/// Build a processor from two closures.
///
/// The step closure must be pure; it receives the previous state by value and
/// returns the next one.
pub fn from_fn<S, I, O, G, F>(init: G, step: F) -> FnProcessor<S, I, O, G, F>
where
    S: Clone,
    G: Fn() -> S,
    F: Fn(S, &I) -> Transition<S, O>,
{
    FnProcessor {
        init,
        step,
        _marker: PhantomData,
    }
}

impl<S, I, O, G, F> Processor for FnProcessor<S, I, O, G, F>
where
    S: Clone,
    G: Fn() -> S,
    F: Fn(S, &I) -> Transition<S, O>,
{
    type State = S;
    type Input = I;
    type Output = O;

    fn initial_state(&self) -> S {
        (self.init)()
    }

    fn process(&self, state: S, input: &I) -> Transition<S, O> {
        (self.step)(state, input)
    }
}

impl<S, I, O, G, F> fmt::Debug for FnProcessor<S, I, O, G, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProcessor").finish_non_exhaustive()
    }
}
