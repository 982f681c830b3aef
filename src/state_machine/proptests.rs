//! Property-based tests for the order node and the turn state machine
//!
//! These tests verify key invariants hold across generated inputs.

use super::order_node::{apply_tool_calls, ORDER_CLEARED, UNRECOGNIZED_ACTION};
use super::state::*;
use super::transition::*;
use super::*;
use crate::llm::{LlmErrorKind, Usage};
use crate::tools::line_item;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> TurnContext {
    TurnContext {
        session_id: "prop-session".to_string(),
        max_retry_attempts: 3,
        retry_base_delay: Duration::from_millis(10),
        recursion_limit: 5,
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_drink() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Espresso".to_string()),
        Just("Americano".to_string()),
        Just("Cold Brew".to_string()),
        Just("Latte".to_string()),
        Just("Cappuccino".to_string()),
        Just("Mocha".to_string()),
        "[A-Z][a-z]{2,10}",
    ]
}

fn arb_modifiers() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[A-Z][a-z]{2,8}", 0..4)
}

fn arb_add_input() -> impl Strategy<Value = AddToOrderInput> {
    (arb_drink(), arb_modifiers()).prop_map(|(drink, modifiers)| AddToOrderInput { drink, modifiers })
}

fn arb_unknown_input() -> impl Strategy<Value = ToolInput> {
    "[a-z_]{3,15}"
        .prop_filter("must not be a catalog name", |name| {
            !matches!(
                name.as_str(),
                "get_menu" | "add_to_order" | "confirm_order" | "clear_order" | "place_order"
            )
        })
        .prop_map(|name| ToolInput::Unknown {
            name,
            input: serde_json::json!({}),
        })
}

fn arb_tool_input() -> impl Strategy<Value = ToolInput> {
    prop_oneof![
        Just(ToolInput::GetMenu),
        arb_add_input().prop_map(ToolInput::AddToOrder),
        Just(ToolInput::ConfirmOrder(OrderListInput::default())),
        Just(ToolInput::ClearOrder),
        Just(ToolInput::PlaceOrder(OrderListInput::default())),
        arb_unknown_input(),
    ]
}

fn arb_tool_calls(max: usize) -> impl Strategy<Value = Vec<ToolCall>> {
    proptest::collection::vec(arb_tool_input(), 0..max).prop_map(|inputs| {
        inputs
            .into_iter()
            .enumerate()
            .map(|(i, input)| ToolCall::new(format!("call_{i}"), input))
            .collect()
    })
}

fn arb_order() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[A-Za-z ()]{1,20}", 0..5)
}

fn arb_turn_state() -> impl Strategy<Value = TurnState> {
    prop_oneof![
        Just(TurnState::Stop),
        (1u32..4, 1u32..6).prop_map(|(attempt, round)| TurnState::Policy { attempt, round }),
        (arb_tool_calls(3), 1u32..6)
            .prop_map(|(tool_calls, round)| TurnState::Dispatch { tool_calls, round }),
    ]
}

fn arb_error_kind() -> impl Strategy<Value = LlmErrorKind> {
    prop_oneof![
        Just(LlmErrorKind::Network),
        Just(LlmErrorKind::RateLimit),
        Just(LlmErrorKind::ServerError),
        Just(LlmErrorKind::Auth),
        Just(LlmErrorKind::InvalidRequest),
        Just(LlmErrorKind::Unknown),
    ]
}

// ============================================================================
// Order Node Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_adds_append_in_request_order(inputs in proptest::collection::vec(arb_add_input(), 0..10)) {
        let mut state = OrderState::new();
        let calls: Vec<_> = inputs
            .iter()
            .enumerate()
            .map(|(i, input)| ToolCall::new(format!("a{i}"), ToolInput::AddToOrder(input.clone())))
            .collect();

        apply_tool_calls(&mut state, &calls, &mut StdRng::seed_from_u64(0));

        let expected: Vec<_> = inputs.iter().map(|i| line_item(&i.drink, &i.modifiers)).collect();
        prop_assert_eq!(state.order, expected);
    }

    #[test]
    fn prop_add_reply_lists_current_order(order in arb_order(), input in arb_add_input()) {
        let mut state = OrderState { order, ..OrderState::default() };
        let call = ToolCall::new("a", ToolInput::AddToOrder(input));

        let replies = apply_tool_calls(&mut state, &[call], &mut StdRng::seed_from_u64(0));

        prop_assert_eq!(&replies[0].content, &format!("Order updated: {}.", state.order.join(", ")));
    }

    #[test]
    fn prop_clear_is_idempotent(order in arb_order(), times in 1usize..4) {
        let mut state = OrderState { order, ..OrderState::default() };
        let calls: Vec<_> = (0..times)
            .map(|i| ToolCall::new(format!("c{i}"), ToolInput::ClearOrder))
            .collect();

        let replies = apply_tool_calls(&mut state, &calls, &mut StdRng::seed_from_u64(0));

        prop_assert!(state.order.is_empty());
        prop_assert!(replies.iter().all(|r| r.content == ORDER_CLEARED));
    }

    #[test]
    fn prop_place_sets_finished_with_eta_in_range(order in arb_order(), seed in any::<u64>()) {
        let mut state = OrderState { order, ..OrderState::default() };
        let call = ToolCall::new("p", ToolInput::PlaceOrder(OrderListInput::default()));

        let replies = apply_tool_calls(&mut state, &[call], &mut StdRng::seed_from_u64(seed));

        prop_assert!(state.finished);
        let eta: u32 = replies[0]
            .content
            .trim_start_matches("Order placed! ETA: ")
            .trim_end_matches(" minutes.")
            .parse()
            .unwrap();
        prop_assert!((1..=5).contains(&eta));
    }

    #[test]
    fn prop_unknown_never_mutates(order in arb_order(), finished in any::<bool>(), input in arb_unknown_input()) {
        let mut state = OrderState { order, finished, ..OrderState::default() };
        let before = state.clone();

        let replies = apply_tool_calls(&mut state, &[ToolCall::new("u", input)], &mut StdRng::seed_from_u64(0));

        prop_assert_eq!(state, before);
        prop_assert_eq!(&replies[0].content, UNRECOGNIZED_ACTION);
    }

    #[test]
    fn prop_one_reply_per_call(calls in arb_tool_calls(8)) {
        let mut state = OrderState::new();
        let replies = apply_tool_calls(&mut state, &calls, &mut StdRng::seed_from_u64(0));

        prop_assert_eq!(replies.len(), calls.len());
        for (call, reply) in calls.iter().zip(&replies) {
            prop_assert_eq!(reply.role, Role::Tool);
            prop_assert_eq!(reply.tool_call_id.as_deref(), Some(call.id.as_str()));
        }
    }

    #[test]
    fn prop_finished_is_never_reset(before in arb_tool_calls(5), after in arb_tool_calls(5)) {
        let mut state = OrderState::new();
        let mut rng = StdRng::seed_from_u64(0);
        apply_tool_calls(&mut state, &before, &mut rng);
        apply_tool_calls(&mut state, &[ToolCall::new("p", ToolInput::PlaceOrder(OrderListInput::default()))], &mut rng);
        apply_tool_calls(&mut state, &after, &mut rng);

        prop_assert!(state.finished);
    }
}

// ============================================================================
// Transition Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_user_message_only_accepted_at_stop(state in arb_turn_state(), text in "[a-z ]{1,20}") {
        let result = transition(&state, &test_context(), Event::UserMessage { text });
        if state == TurnState::Stop {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result.unwrap_err(), TransitionError::TurnInProgress);
        }
    }

    #[test]
    fn prop_response_routes_on_tool_calls(calls in arb_tool_calls(4), round in 1u32..6) {
        let message = Message::assistant("reply", calls.clone());
        let result = transition(
            &TurnState::Policy { attempt: 1, round },
            &test_context(),
            Event::LlmResponse { message, usage: Usage::default() },
        )
        .unwrap();

        if calls.is_empty() {
            prop_assert_eq!(result.new_state, TurnState::Stop);
        } else {
            prop_assert_eq!(result.new_state, TurnState::Dispatch { tool_calls: calls, round });
        }
    }

    #[test]
    fn prop_errors_never_exceed_max_attempts(kind in arb_error_kind(), attempt in 1u32..6) {
        let ctx = test_context();
        let result = transition(
            &TurnState::Policy { attempt, round: 1 },
            &ctx,
            Event::LlmError { message: "x".to_string(), error_kind: kind, attempt },
        )
        .unwrap();

        match result.new_state {
            TurnState::Policy { attempt: next, .. } => {
                prop_assert!(kind.is_retryable());
                prop_assert!(next <= ctx.max_retry_attempts);
                prop_assert_eq!(next, attempt + 1);
            }
            TurnState::Stop => {
                prop_assert!(!kind.is_retryable() || attempt >= ctx.max_retry_attempts);
                let failed = matches!(result.effects.last(), Some(Effect::TurnFailed(_)));
                prop_assert!(failed);
            }
            TurnState::Dispatch { .. } => prop_assert!(false, "error cannot dispatch"),
        }
    }

    #[test]
    fn prop_rounds_bounded_by_recursion_limit(calls in arb_tool_calls(4), round in 1u32..10) {
        prop_assume!(!calls.is_empty());
        let ctx = test_context();
        let results = apply_tool_calls(&mut OrderState::new(), &calls, &mut StdRng::seed_from_u64(0));

        let result = transition(
            &TurnState::Dispatch { tool_calls: calls, round },
            &ctx,
            Event::ToolsApplied { results },
        )
        .unwrap();

        match result.new_state {
            TurnState::Policy { round: next, attempt } => {
                prop_assert_eq!(attempt, 1);
                prop_assert_eq!(next, round + 1);
                prop_assert!(next <= ctx.recursion_limit);
            }
            TurnState::Stop => prop_assert!(round >= ctx.recursion_limit),
            TurnState::Dispatch { .. } => prop_assert!(false, "dispatch cannot follow dispatch"),
        }
    }
}
