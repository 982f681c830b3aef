//! Events that can occur during a turn

use super::state::Message;
use crate::llm::{LlmErrorKind, Usage};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserMessage {
        text: String,
    },

    // Policy events
    LlmResponse {
        /// Assistant message with typed tool calls
        message: Message,
        usage: Usage,
    },
    LlmError {
        message: String,
        error_kind: LlmErrorKind,
        attempt: u32,
    },
    RetryTimeout {
        attempt: u32,
    },

    // Order node events
    ToolsApplied {
        /// One tool message per dispatched call, in request order
        results: Vec<Message>,
    },
}
