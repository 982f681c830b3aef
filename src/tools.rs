//! Tool catalog exposed to the dialogue policy
//!
//! Tools here are declarations only: name, description and argument
//! schema. Execution against the order happens in the order node.

mod menu;
mod order;

pub use menu::{menu_text, GetMenuTool};
pub use order::{
    draw_eta, line_item, AddToOrderTool, ClearOrderTool, ConfirmOrderTool, PlaceOrderTool,
};

use crate::llm::ToolDefinition;
use serde_json::Value;
use std::sync::Arc;

/// A tool the dialogue policy may request
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &'static str;

    /// Tool description for LLM
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;
}

/// Fixed set of tools available to every session
pub struct ToolCatalog {
    tools: Vec<Arc<dyn Tool>>,
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolCatalog {
    pub fn new() -> Self {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(GetMenuTool),
            Arc::new(AddToOrderTool),
            Arc::new(ConfirmOrderTool),
            Arc::new(ClearOrderTool),
            Arc::new(PlaceOrderTool),
        ];
        Self { tools }
    }

    /// Get all tool definitions for LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Whether the policy may request a tool by this name
    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }
}
