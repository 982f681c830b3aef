//! Effects produced by state transitions

use super::state::{Message, ToolCall};
use crate::llm::LlmErrorKind;
use std::time::Duration;

/// Why a turn ended without a final assistant reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnFailure {
    /// The dialogue policy call failed (after retries, when retryable)
    Policy {
        message: String,
        error_kind: LlmErrorKind,
    },
    /// Too many policy rounds in one turn
    RecursionLimit { limit: u32 },
}

/// Effects to be executed after state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Append a message to the session history
    AppendMessage(Message),

    /// Ask the dialogue policy for the next assistant message
    RequestPolicy,

    /// Wait, then retry the policy request
    ScheduleRetry { delay: Duration, attempt: u32 },

    /// Run the order node over these tool calls
    DispatchTools { tool_calls: Vec<ToolCall> },

    /// The turn reached `Stop` with a plain reply
    TurnComplete,

    /// The turn reached `Stop` without a reply
    TurnFailed(TurnFailure),
}

impl Effect {
    pub fn append_all(messages: impl IntoIterator<Item = Message>) -> impl Iterator<Item = Self> {
        messages.into_iter().map(Effect::AppendMessage)
    }
}
