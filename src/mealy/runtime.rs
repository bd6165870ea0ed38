//! Generic Mealy runtime with recursive re-injection

use super::sink::SinkSet;
use super::store::Store;
use crate::processor::{Feedback, Processor, Transition};

/// Default bound on how deep outputs may be fed back in
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Result of one `MealyRuntime::process` call
#[derive(Debug, Clone, PartialEq)]
pub struct MealyResult<S, O> {
    pub state: S,
    /// Direct outputs first, then the outputs of each re-injected output in order
    pub outputs: Vec<O>,
    /// Number of processor steps performed
    pub process_count: usize,
}

/// Drives one processor against per-key state held in a store
pub struct MealyRuntime<P, St>
where
    P: Processor,
    P::Output: Send + 'static,
{
    processor: P,
    store: St,
    sinks: SinkSet<P::Output>,
    recursive: bool,
    max_depth: usize,
}

impl<P, St> MealyRuntime<P, St>
where
    P: Processor,
    P::Output: Clone + Send + Feedback<P::Input> + 'static,
    St: Store<P::State>,
{
    pub fn new(processor: P, store: St) -> Self {
        Self {
            processor,
            store,
            sinks: SinkSet::new(),
            recursive: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Whether outputs are fed back through the processor (default true)
    #[must_use]
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_sinks(mut self, sinks: SinkSet<P::Output>) -> Self {
        self.sinks = sinks;
        self
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    pub fn sinks(&self) -> &SinkSet<P::Output> {
        &self.sinks
    }

    /// Process `input` for `id`, re-injecting outputs when enabled, then
    /// broadcast the full output list to the sinks.
    pub fn process(&self, id: &str, input: &P::Input) -> MealyResult<P::State, P::Output> {
        let result = self.process_at(id, input, 0);
        self.sinks.dispatch(id, &result.outputs);
        result
    }

    fn process_at(
        &self,
        id: &str,
        input: &P::Input,
        depth: usize,
    ) -> MealyResult<P::State, P::Output> {
        let state = self
            .store
            .get(id)
            .unwrap_or_else(|| self.processor.initial_state());

        if depth >= self.max_depth {
            tracing::warn!(
                agent_id = %id,
                depth,
                max_depth = self.max_depth,
                "Maximum re-injection depth reached, halting branch"
            );
            return MealyResult {
                state,
                outputs: vec![],
                process_count: 0,
            };
        }

        let Transition { new_state, outputs } = self.processor.process(state, input);
        self.store.set(id, new_state.clone());

        let mut result = MealyResult {
            state: new_state,
            outputs,
            process_count: 1,
        };
        if !self.recursive {
            return result;
        }

        let direct = result.outputs.len();
        for index in 0..direct {
            let Some(next) = <P::Output as Feedback<P::Input>>::feedback(&result.outputs[index])
            else {
                continue;
            };
            let child = self.process_at(id, &next, depth + 1);
            result.state = child.state;
            result.outputs.extend(child.outputs);
            result.process_count += child.process_count;
        }

        result
    }
}
