//! Tuple combinator
//!
//! A tuple of processors sharing one input and output type is itself a
//! processor. Its state is the tuple of sub-states; every sub-processor sees
//! the same input in declaration order, updates only its own slot, and the
//! outputs are concatenated in that order.

use super::{Processor, Transition};

macro_rules! combine_processors {
    ($($proc:ident => $idx:tt),+) => {
        impl<I, O, $($proc),+> Processor for ($($proc,)+)
        where
            $($proc: Processor<Input = I, Output = O>,)+
        {
            type State = ($($proc::State,)+);
            type Input = I;
            type Output = O;

            fn initial_state(&self) -> Self::State {
                ($(self.$idx.initial_state(),)+)
            }

            fn process(&self, state: Self::State, input: &I) -> Transition<Self::State, O> {
                let mut outputs = Vec::new();
                let new_state = ($(
                    {
                        let step = self.$idx.process(state.$idx, input);
                        outputs.extend(step.outputs);
                        step.new_state
                    },
                )+);
                Transition { new_state, outputs }
            }
        }
    };
}

combine_processors!(A => 0, B => 1);
combine_processors!(A => 0, B => 1, C => 2);
combine_processors!(A => 0, B => 1, C => 2, D => 3);
