//! Order-affecting tools
//!
//! Declarations for the four tools the order node executes, plus the
//! formatting and ETA helpers it shares with them.

use super::Tool;
use rand::{Rng, RngCore};
use serde_json::{json, Value};
use std::ops::RangeInclusive;

/// Range of estimated wait times, in minutes
pub const ETA_MINUTES: RangeInclusive<u32> = 1..=5;

/// Render one line item: `"Latte (Oat, Vanilla)"` or `"Espresso (no modifiers)"`
pub fn line_item(drink: &str, modifiers: &[String]) -> String {
    if modifiers.is_empty() {
        format!("{drink} (no modifiers)")
    } else {
        format!("{drink} ({})", modifiers.join(", "))
    }
}

/// Draw an ETA uniformly from [`ETA_MINUTES`]
pub fn draw_eta(rng: &mut dyn RngCore) -> u32 {
    rng.gen_range(ETA_MINUTES)
}

fn order_list_schema(description: &str) -> Value {
    json!({
        "type": "array",
        "items": { "type": "string" },
        "description": description
    })
}

pub struct AddToOrderTool;

impl Tool for AddToOrderTool {
    fn name(&self) -> &'static str {
        "add_to_order"
    }

    fn description(&self) -> String {
        "Add a drink with specified modifiers to the order. Use one call per drink; \
         pass an empty modifiers list for a plain drink."
            .to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["drink", "modifiers"],
            "properties": {
                "drink": {
                    "type": "string",
                    "description": "Drink name from the menu"
                },
                "modifiers": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Milk and sweetener modifiers, in the order requested"
                }
            }
        })
    }
}

pub struct ConfirmOrderTool;

impl Tool for ConfirmOrderTool {
    fn name(&self) -> &'static str {
        "confirm_order"
    }

    fn description(&self) -> String {
        "Read the current order back to the customer and ask them to confirm it.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "order": order_list_schema("The current order items")
            }
        })
    }
}

pub struct ClearOrderTool;

impl Tool for ClearOrderTool {
    fn name(&self) -> &'static str {
        "clear_order"
    }

    fn description(&self) -> String {
        "Clear all items from the customer's order.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }
}

pub struct PlaceOrderTool;

impl Tool for PlaceOrderTool {
    fn name(&self) -> &'static str {
        "place_order"
    }

    fn description(&self) -> String {
        "Place the confirmed order and return the estimated wait time in minutes. \
         Only call this after the customer has confirmed."
            .to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "order": order_list_schema("The confirmed order items")
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_line_item_with_modifiers() {
        let mods = vec!["Oat".to_string(), "Vanilla".to_string()];
        assert_eq!(line_item("Latte", &mods), "Latte (Oat, Vanilla)");
    }

    #[test]
    fn test_line_item_without_modifiers() {
        assert_eq!(line_item("Espresso", &[]), "Espresso (no modifiers)");
    }

    #[test]
    fn test_eta_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            assert!(ETA_MINUTES.contains(&draw_eta(&mut rng)));
        }
    }

    #[test]
    fn test_eta_covers_whole_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = [false; 5];
        for _ in 0..500 {
            seen[(draw_eta(&mut rng) - 1) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
