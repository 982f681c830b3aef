//! Mock implementations for testing
//!
//! These mocks enable session testing without a real LLM.

use crate::llm::{ContentBlock, LlmError, LlmRequest, LlmResponse, LlmService, Usage};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Mock LLM service that returns queued responses
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    /// Record of all requests made
    requests: Mutex<Vec<LlmRequest>>,
}

impl Default for MockLlmService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a plain text reply
    pub fn queue_text(&self, text: &str) {
        self.queue_response(LlmResponse {
            content: vec![ContentBlock::text(text)],
            end_turn: true,
            usage: Usage::default(),
        });
    }

    /// Queue a reply requesting these tools, with ids unique per response
    pub fn queue_tool_calls(&self, calls: &[(&str, Value)]) {
        let content = calls
            .iter()
            .enumerate()
            .map(|(i, (name, input))| ContentBlock::tool_use(format!("call_{i}_{name}"), *name, input.clone()))
            .collect();
        self.queue_response(LlmResponse {
            content,
            end_turn: false,
            usage: Usage::default(),
        });
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::invalid_request("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}
