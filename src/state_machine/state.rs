//! Order and turn state types

use crate::config::SessionConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

// ============================================================================
// Tool Input Types - Strongly typed inputs for each tool
// ============================================================================

/// Input for the `add_to_order` tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToOrderInput {
    pub drink: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

/// Input for `confirm_order` and `place_order`: the order as the policy sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OrderListInput {
    #[serde(default)]
    pub order: Vec<String>,
}

/// Strongly typed tool input enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_tool", rename_all = "snake_case")]
pub enum ToolInput {
    GetMenu,
    AddToOrder(AddToOrderInput),
    ConfirmOrder(OrderListInput),
    ClearOrder,
    PlaceOrder(OrderListInput),
    /// Fallback for unknown tools or arguments that fail validation
    Unknown { name: String, input: Value },
}

impl ToolInput {
    /// Get the tool name
    pub fn tool_name(&self) -> &str {
        match self {
            ToolInput::GetMenu => "get_menu",
            ToolInput::AddToOrder(_) => "add_to_order",
            ToolInput::ConfirmOrder(_) => "confirm_order",
            ToolInput::ClearOrder => "clear_order",
            ToolInput::PlaceOrder(_) => "place_order",
            ToolInput::Unknown { name, .. } => name,
        }
    }

    /// Convert to JSON Value for the policy's view of the call
    pub fn to_value(&self) -> Value {
        match self {
            ToolInput::GetMenu | ToolInput::ClearOrder => Value::Object(serde_json::Map::new()),
            ToolInput::AddToOrder(input) => serde_json::to_value(input).unwrap_or(Value::Null),
            ToolInput::ConfirmOrder(input) | ToolInput::PlaceOrder(input) => {
                serde_json::to_value(input).unwrap_or(Value::Null)
            }
            ToolInput::Unknown { input, .. } => input.clone(),
        }
    }

    /// Parse from tool name and JSON value
    pub fn from_name_and_value(name: &str, value: Value) -> Self {
        // Providers send `null` rather than `{}` for argument-less calls
        let args = if value.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            value
        };
        let unknown = |input: Value| ToolInput::Unknown {
            name: name.to_string(),
            input,
        };

        match name {
            "get_menu" => ToolInput::GetMenu,
            "clear_order" => ToolInput::ClearOrder,
            "add_to_order" => serde_json::from_value(args.clone())
                .map_or_else(|_| unknown(args), ToolInput::AddToOrder),
            "confirm_order" => serde_json::from_value(args.clone())
                .map_or_else(|_| unknown(args), ToolInput::ConfirmOrder),
            "place_order" => serde_json::from_value(args.clone())
                .map_or_else(|_| unknown(args), ToolInput::PlaceOrder),
            _ => unknown(args),
        }
    }
}

// ============================================================================
// Tool Call - A tool invocation with ID and typed input
// ============================================================================

/// A tool invocation request from the policy with typed input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub input: ToolInput,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, input: ToolInput) -> Self {
        Self {
            id: id.into(),
            input,
        }
    }

    /// Get the tool name
    pub fn name(&self) -> &str {
        self.input.tool_name()
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// One conversational turn, appended to the session history and never edited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For tool messages: the invocation this answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// For tool messages: the tool that produced it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::plain(Role::Assistant, content)
        }
    }

    /// Result of one tool invocation
    pub fn tool_result(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call.id.clone()),
            name: Some(call.name().to_string()),
            ..Self::plain(Role::Tool, content)
        }
    }
}

// ============================================================================
// Order State
// ============================================================================

/// The full session record threaded through every turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderState {
    pub messages: Vec<Message>,
    pub order: Vec<String>,
    /// Set once an order is placed; never cleared within a session
    pub finished: bool,
}

impl OrderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent message, which the router inspects
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

// ============================================================================
// Turn State
// ============================================================================

/// Where a session is within the current turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnState {
    /// Policy request in flight, with retry tracking and the policy round
    /// within this turn
    Policy { attempt: u32, round: u32 },

    /// Order node applying the latest assistant message's tool calls
    Dispatch { tool_calls: Vec<ToolCall>, round: u32 },

    /// Turn finished; ready for the next user message
    #[default]
    Stop,
}

impl TurnState {
    pub fn is_working(&self) -> bool {
        !matches!(self, TurnState::Stop)
    }
}

/// Context for a session (immutable configuration)
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub session_id: String,
    pub max_retry_attempts: u32,
    pub retry_base_delay: Duration,
    pub recursion_limit: u32,
}

impl TurnContext {
    pub fn new(session_id: impl Into<String>, config: &SessionConfig) -> Self {
        Self {
            session_id: session_id.into(),
            max_retry_attempts: config.max_retry_attempts,
            retry_base_delay: config.retry_base_delay,
            recursion_limit: config.recursion_limit,
        }
    }
}
