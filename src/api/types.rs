//! API request and response types

use crate::state_machine::{Message, OrderState};
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Response for session creation
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub id: String,
}

/// Full view of a session
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub messages: Vec<Message>,
    pub order: Vec<String>,
    pub finished: bool,
}

impl SessionResponse {
    pub fn new(id: impl Into<String>, state: OrderState) -> Self {
        Self {
            id: id.into(),
            messages: state.messages,
            order: state.order,
            finished: state.finished,
        }
    }
}

/// Response for a completed chat turn
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    #[serde(flatten)]
    pub session: SessionResponse,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Query flags on the transcript page
#[derive(Debug, Default, Deserialize)]
pub struct TranscriptQuery {
    /// Set after a failed turn so the page can ask the customer to retry
    #[serde(default)]
    pub error: bool,
}
