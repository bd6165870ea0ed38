//! Property-based tests for the agent processors
//!
//! These tests drive the composite processor with arbitrary driver streams
//! and check the invariants every conversation must keep.

use super::*;
use crate::event::{
    AgentInput, AgentOutput, Event, MessageKind, StopReason, StreamKind, TurnKind,
};
use crate::processor::Processor;
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Test Helpers
// ============================================================================

fn processor() -> AgentProcessor {
    AgentProcessor::new(TurnTracker::new().with_turn_ids(SequentialTurnIds::new()))
}

fn run(
    processor: &AgentProcessor,
    state: AgentState,
    inputs: &[AgentInput],
) -> (AgentState, Vec<AgentOutput>) {
    let mut state = state;
    let mut outputs = vec![];
    for input in inputs {
        let step = processor.process(state, input);
        state = step.new_state;
        outputs.extend(step.outputs);
    }
    (state, outputs)
}

fn stream(timestamp: i64, kind: StreamKind) -> AgentInput {
    AgentInput::Stream(Event::new(timestamp, kind))
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_stop_reason() -> impl Strategy<Value = StopReason> {
    prop_oneof![
        Just(StopReason::EndTurn),
        Just(StopReason::ToolUse),
        Just(StopReason::MaxTokens),
        Just(StopReason::StopSequence),
    ]
}

fn arb_stream_kind() -> impl Strategy<Value = StreamKind> {
    prop_oneof![
        "[a-z0-9]{4}".prop_map(|message_id| StreamKind::MessageStart {
            message_id,
            model: None
        }),
        "[a-zA-Z ]{0,12}".prop_map(StreamKind::text_delta),
        ("[a-z]{2}", "[a-z_]{3,8}")
            .prop_map(|(id, name)| StreamKind::ToolUseContentBlockStart { id, name }),
        "[{}\":a-z0-9]{0,10}".prop_map(|partial_json| StreamKind::InputJsonDelta { partial_json }),
        "[a-z]{2}".prop_map(|id| StreamKind::ToolUseContentBlockStop { id }),
        arb_stop_reason().prop_map(StreamKind::message_stop),
        ("[a-z]{2}", "[a-z ]{0,10}", any::<bool>()).prop_map(|(tool_id, text, is_error)| {
            StreamKind::ToolResult {
                tool_id,
                content: json!(text),
                is_error,
            }
        }),
        Just(StreamKind::Interrupted { reason: None }),
        "[a-z ]{1,10}".prop_map(|message| StreamKind::ErrorReceived {
            message,
            error_code: None
        }),
    ]
}

fn arb_unknown_kind() -> impl Strategy<Value = StreamKind> {
    ("x_[a-z_]{1,10}", any::<u32>()).prop_map(|(event_type, n)| StreamKind::Unknown {
        event_type,
        data: json!({ "n": n }),
    })
}

fn arb_user_message() -> impl Strategy<Value = MessageKind> {
    ("u[0-9]{1,3}", "[a-zA-Z ]{1,20}").prop_map(|(id, content)| MessageKind::user(id, content))
}

fn arb_input() -> impl Strategy<Value = AgentInput> {
    let timestamp = 0i64..10_000;
    prop_oneof![
        6 => (arb_stream_kind(), timestamp.clone()).prop_map(|(kind, ts)| stream(ts, kind)),
        1 => (arb_unknown_kind(), timestamp.clone()).prop_map(|(kind, ts)| stream(ts, kind)),
        2 => (arb_user_message(), timestamp)
            .prop_map(|(kind, ts)| AgentInput::Message(Event::new(ts, kind))),
    ]
}

fn arb_inputs() -> impl Strategy<Value = Vec<AgentInput>> {
    proptest::collection::vec(arb_input(), 0..30)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Same inputs from the same state always give the same result, given an
    // id source in the same position
    #[test]
    fn prop_processing_is_deterministic(inputs in arb_inputs()) {
        let (p, q) = (processor(), processor());
        let first = run(&p, p.initial_state(), &inputs);
        let second = run(&q, q.initial_state(), &inputs);
        prop_assert_eq!(first, second);
    }

    // Unknown events are accepted from any reachable state and change nothing
    #[test]
    fn prop_unknown_events_are_no_ops(
        prefix in arb_inputs(),
        unknown in arb_unknown_kind(),
        timestamp in 0i64..10_000,
    ) {
        let p = processor();
        let (state, _) = run(&p, p.initial_state(), &prefix);
        let step = p.process(state.clone(), &stream(timestamp, unknown));
        prop_assert!(step.outputs.is_empty());
        prop_assert_eq!(step.new_state, state);
    }

    // assistant_message is reserved: no state change, no outputs
    #[test]
    fn prop_assistant_message_is_a_no_op(prefix in arb_inputs(), content in "[a-z ]{0,20}") {
        let p = processor();
        let (state, _) = run(&p, p.initial_state(), &prefix);
        let input = AgentInput::Message(Event::new(
            1,
            MessageKind::AssistantMessage { id: "a1".to_string(), content },
        ));
        let step = p.process(state.clone(), &input);
        prop_assert!(step.outputs.is_empty());
        prop_assert_eq!(step.new_state, state);
    }

    // Every turn_response answers the most recent turn_request, at most once
    #[test]
    fn prop_turn_responses_pair_with_latest_request(inputs in arb_inputs()) {
        let p = processor();
        let (_, outputs) = run(&p, p.initial_state(), &inputs);

        let mut open: Option<String> = None;
        for output in &outputs {
            let AgentOutput::Turn(event) = output else { continue };
            match &event.kind {
                TurnKind::TurnRequest { turn_id, .. } => open = Some(turn_id.clone()),
                TurnKind::TurnResponse { turn_id, duration, .. } => {
                    let answered = open.take();
                    prop_assert_eq!(answered.as_deref(), Some(turn_id.as_str()));
                    prop_assert!(*duration >= 0);
                }
            }
        }
    }

    // A tool_use stop never completes a turn
    #[test]
    fn prop_tool_use_stop_never_completes_turn(
        prefix in arb_inputs(),
        user in arb_user_message(),
    ) {
        let p = processor();
        let (state, _) = run(&p, p.initial_state(), &prefix);
        let (state, _) = run(&p, state, &[AgentInput::Message(Event::new(1, user))]);

        let step = p.process(state, &stream(2, StreamKind::message_stop(StopReason::ToolUse)));
        prop_assert!(step.outputs.iter().all(|o| o.event_type() != "turn_response"));
        prop_assert!(step.new_state.turn_tracker.pending_turn.is_some());
    }

    // A second user message replaces the pending turn
    #[test]
    fn prop_second_user_message_overwrites_pending(
        first in arb_user_message(),
        second in arb_user_message(),
    ) {
        let p = processor();
        let (state, _) = run(
            &p,
            p.initial_state(),
            &[
                AgentInput::Message(Event::new(1, first)),
                AgentInput::Message(Event::new(2, second.clone())),
            ],
        );
        let pending = state.turn_tracker.pending_turn.clone().unwrap();
        prop_assert_eq!(pending.message_id.as_str(), second.id());
        prop_assert_eq!(pending.requested_at, 2);
    }

    // An error closes the conversation and forgets its tool calls
    #[test]
    fn prop_error_returns_to_idle(prefix in arb_inputs(), message in "[a-z]{1,8}") {
        let p = processor();
        let (state, _) = run(&p, p.initial_state(), &prefix);
        let step = p.process(
            state,
            &stream(1, StreamKind::ErrorReceived { message, error_code: None }),
        );
        prop_assert_eq!(step.new_state.state_events.phase, ConversationPhase::Idle);
        prop_assert!(step.new_state.message_assembler.open_tools.is_empty());
        prop_assert!(step.new_state.message_assembler.awaiting_results.is_empty());
    }
}
