//! Order node: applies a batch of tool calls to the order
//!
//! Calls are handled strictly in request order, one reply message per
//! call. The only state touched is `order` and `finished`.

use super::state::{Message, OrderState, ToolCall, ToolInput};
use crate::tools::{draw_eta, line_item, menu_text};
use rand::RngCore;

pub const UNRECOGNIZED_ACTION: &str = "Unrecognized action.";
pub const ORDER_CLEARED: &str = "Order cleared.";

/// Apply `calls` to `state` and return the tool messages, one per call.
///
/// The returned messages are not appended to `state.messages`; the state
/// machine appends them once the whole batch is done.
pub fn apply_tool_calls(
    state: &mut OrderState,
    calls: &[ToolCall],
    rng: &mut dyn RngCore,
) -> Vec<Message> {
    let mut replies = Vec::with_capacity(calls.len());
    for call in calls {
        let reply = apply_one(state, call, rng);
        replies.push(Message::tool_result(call, reply));
    }
    replies
}

fn apply_one(state: &mut OrderState, call: &ToolCall, rng: &mut dyn RngCore) -> String {
    if state.finished && is_mutating(&call.input) {
        tracing::warn!(tool = call.name(), "Order mutated after it was placed");
    }

    match &call.input {
        ToolInput::GetMenu => menu_text().to_string(),

        ToolInput::AddToOrder(input) => {
            state.order.push(line_item(&input.drink, &input.modifiers));
            tracing::debug!(items = state.order.len(), "Added to order");
            format!("Order updated: {}.", state.order.join(", "))
        }

        ToolInput::ConfirmOrder(input) => {
            note_divergence(call.name(), &input.order, &state.order);
            if state.order.is_empty() {
                "Your order is empty. What would you like to order?".to_string()
            } else {
                format!("Your order is: {}. Is this correct?", state.order.join(", "))
            }
        }

        ToolInput::ClearOrder => {
            state.order.clear();
            ORDER_CLEARED.to_string()
        }

        ToolInput::PlaceOrder(input) => {
            note_divergence(call.name(), &input.order, &state.order);
            state.finished = true;
            let eta = draw_eta(rng);
            tracing::info!(items = state.order.len(), eta_minutes = eta, "Order placed");
            format!("Order placed! ETA: {eta} minutes.")
        }

        ToolInput::Unknown { name, .. } => {
            tracing::warn!(tool = %name, "Unrecognized tool call");
            UNRECOGNIZED_ACTION.to_string()
        }
    }
}

fn is_mutating(input: &ToolInput) -> bool {
    matches!(
        input,
        ToolInput::AddToOrder(_) | ToolInput::ClearOrder | ToolInput::PlaceOrder(_)
    )
}

/// The session's order is authoritative; the policy's copy is only logged
fn note_divergence(tool: &str, claimed: &[String], actual: &[String]) {
    if !claimed.is_empty() && claimed != actual {
        tracing::debug!(tool, ?claimed, ?actual, "Policy order differs from session order");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::state::{AddToOrderInput, OrderListInput, Role};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn add(id: &str, drink: &str, modifiers: &[&str]) -> ToolCall {
        ToolCall::new(
            id,
            ToolInput::AddToOrder(AddToOrderInput {
                drink: drink.to_string(),
                modifiers: modifiers.iter().map(|m| (*m).to_string()).collect(),
            }),
        )
    }

    fn place(id: &str) -> ToolCall {
        ToolCall::new(id, ToolInput::PlaceOrder(OrderListInput::default()))
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(1)
    }

    fn parse_eta(reply: &str) -> u32 {
        reply
            .trim_start_matches("Order placed! ETA: ")
            .trim_end_matches(" minutes.")
            .parse()
            .unwrap()
    }

    #[test]
    fn test_worked_example() {
        let mut state = OrderState::new();
        let mut rng = rng();

        let replies = apply_tool_calls(&mut state, &[add("1", "Latte", &["Oat", "Vanilla"])], &mut rng);
        assert_eq!(state.order, vec!["Latte (Oat, Vanilla)"]);
        assert_eq!(replies[0].content, "Order updated: Latte (Oat, Vanilla).");

        let replies = apply_tool_calls(&mut state, &[add("2", "Espresso", &[])], &mut rng);
        assert_eq!(state.order, vec!["Latte (Oat, Vanilla)", "Espresso (no modifiers)"]);
        assert_eq!(
            replies[0].content,
            "Order updated: Latte (Oat, Vanilla), Espresso (no modifiers)."
        );

        let replies = apply_tool_calls(&mut state, &[ToolCall::new("3", ToolInput::ClearOrder)], &mut rng);
        assert!(state.order.is_empty());
        assert_eq!(replies[0].content, "Order cleared.");

        let replies = apply_tool_calls(&mut state, &[place("4")], &mut rng);
        assert!(state.finished);
        assert!((1..=5).contains(&parse_eta(&replies[0].content)));
    }

    #[test]
    fn test_one_correlated_reply_per_call_in_order() {
        let mut state = OrderState::new();
        let calls = vec![
            add("a", "Mocha", &[]),
            ToolCall::new("b", ToolInput::GetMenu),
            ToolCall::new("c", ToolInput::ConfirmOrder(OrderListInput::default())),
        ];
        let replies = apply_tool_calls(&mut state, &calls, &mut rng());

        assert_eq!(replies.len(), 3);
        for (call, reply) in calls.iter().zip(&replies) {
            assert_eq!(reply.role, Role::Tool);
            assert_eq!(reply.tool_call_id.as_deref(), Some(call.id.as_str()));
            assert_eq!(reply.name.as_deref(), Some(call.name()));
        }
        assert_eq!(replies[1].content, menu_text());
        assert_eq!(replies[2].content, "Your order is: Mocha (no modifiers). Is this correct?");
    }

    #[test]
    fn test_confirm_does_not_mutate() {
        let mut state = OrderState::new();
        apply_tool_calls(&mut state, &[add("a", "Americano", &["Whole"])], &mut rng());
        let before = state.clone();

        let call = ToolCall::new(
            "b",
            ToolInput::ConfirmOrder(OrderListInput {
                order: vec!["Something else".to_string()],
            }),
        );
        let replies = apply_tool_calls(&mut state, &[call], &mut rng());

        assert_eq!(state, before);
        assert_eq!(replies[0].content, "Your order is: Americano (Whole). Is this correct?");
    }

    #[test]
    fn test_confirm_empty_order() {
        let mut state = OrderState::new();
        let call = ToolCall::new("a", ToolInput::ConfirmOrder(OrderListInput::default()));
        let replies = apply_tool_calls(&mut state, &[call], &mut rng());
        assert_eq!(
            replies[0].content,
            "Your order is empty. What would you like to order?"
        );
        assert!(state.order.is_empty());
    }

    #[test]
    fn test_unknown_tool_never_mutates() {
        let mut state = OrderState::new();
        apply_tool_calls(&mut state, &[add("a", "Latte", &[])], &mut rng());
        let before = state.clone();

        let call = ToolCall::new(
            "x",
            ToolInput::from_name_and_value("refund_order", json!({"all": true})),
        );
        let replies = apply_tool_calls(&mut state, &[call], &mut rng());

        assert_eq!(state, before);
        assert_eq!(replies[0].content, UNRECOGNIZED_ACTION);
        assert_eq!(replies[0].name.as_deref(), Some("refund_order"));
    }

    #[test]
    fn test_malformed_known_tool_is_unrecognized() {
        let mut state = OrderState::new();
        let call = ToolCall::new(
            "x",
            ToolInput::from_name_and_value("add_to_order", json!({"modifiers": "Oat"})),
        );
        let replies = apply_tool_calls(&mut state, &[call], &mut rng());
        assert!(state.order.is_empty());
        assert_eq!(replies[0].content, UNRECOGNIZED_ACTION);
    }

    #[test]
    fn test_finished_survives_later_batches() {
        let mut state = OrderState::new();
        apply_tool_calls(&mut state, &[place("a")], &mut rng());
        apply_tool_calls(&mut state, &[ToolCall::new("b", ToolInput::GetMenu)], &mut rng());
        assert!(state.finished);
    }

    #[test]
    fn test_mutation_after_placement_is_accepted() {
        let mut state = OrderState::new();
        apply_tool_calls(&mut state, &[place("a")], &mut rng());
        let replies = apply_tool_calls(&mut state, &[add("b", "Mocha", &["Caramel"])], &mut rng());

        assert!(state.finished);
        assert_eq!(state.order, vec!["Mocha (Caramel)"]);
        assert_eq!(replies[0].content, "Order updated: Mocha (Caramel).");
    }

    #[test]
    fn test_eta_uses_injected_rng() {
        let mut a = OrderState::new();
        let mut b = OrderState::new();
        let ra = apply_tool_calls(&mut a, &[place("p")], &mut StdRng::seed_from_u64(99));
        let rb = apply_tool_calls(&mut b, &[place("p")], &mut StdRng::seed_from_u64(99));
        assert_eq!(ra[0].content, rb[0].content);
    }

    #[test]
    fn test_does_not_append_messages() {
        let mut state = OrderState::new();
        apply_tool_calls(&mut state, &[add("a", "Latte", &[])], &mut rng());
        assert!(state.messages.is_empty());
    }
}
