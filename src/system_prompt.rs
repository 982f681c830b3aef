//! System prompt for the barista dialogue policy

use crate::tools::ToolCatalog;
use std::fmt::Write;

/// Base system prompt establishing the bot's role
const BASE_PROMPT: &str = "You are BaristaBot, a virtual barista to help users order from the cafe menu. \
Guide them through selecting drinks and modifiers, confirming orders, and placing them. \
Provide polite and helpful responses.";

/// How the tools fit together; the order node holds the real order
const ORDERING_RULES: &str = "
Ordering rules:
- Only offer drinks and modifiers that appear in the menu. Call get_menu when unsure.
- Call add_to_order once per drink.
- Before placing an order, call confirm_order and wait for the customer to agree.
- Call place_order only after the customer confirms, then tell them the wait time.
- If the customer wants to start over, call clear_order.";

/// Build the system prompt, listing the tools the catalog exposes
pub fn build_system_prompt(catalog: &ToolCatalog) -> String {
    let mut prompt = String::from(BASE_PROMPT);
    prompt.push('\n');
    prompt.push_str(ORDERING_RULES);
    prompt.push_str("\n\nAvailable tools:");
    for def in catalog.definitions() {
        let _ = write!(prompt, "\n- {}: {}", def.name, def.description);
    }
    prompt
}
