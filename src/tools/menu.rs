//! Menu lookup tool

use super::Tool;
use serde_json::{json, Value};

const MENU: &str = "MENU:
Coffee Drinks:
Espresso, Americano, Cold Brew, Latte, Cappuccino, Mocha

Modifiers:
Milk: Whole, Oat, Almond
Sweeteners: Vanilla, Hazelnut, Caramel
";

/// The static café menu
pub fn menu_text() -> &'static str {
    MENU
}

pub struct GetMenuTool;

impl Tool for GetMenuTool {
    fn name(&self) -> &'static str {
        "get_menu"
    }

    fn description(&self) -> String {
        "Retrieve the café menu: available drinks and modifiers.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }
}
