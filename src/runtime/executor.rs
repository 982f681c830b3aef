//! Session executor: drives one turn through the state machine

use super::{SessionError, TurnOutcome};
use crate::llm::{
    ContentBlock, LlmMessage, LlmRequest, LlmResponse, LlmService, MessageRole, SystemContent,
    Usage,
};
use crate::state_machine::{
    apply_tool_calls, transition, Effect, Event, Message, OrderState, Role, ToolCall, ToolInput,
    TurnContext, TurnFailure, TurnState,
};
use crate::tools::ToolCatalog;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One customer's session: exclusive owner of its order state
pub struct Session {
    context: TurnContext,
    turn: TurnState,
    state: OrderState,
    llm: Arc<dyn LlmService>,
    catalog: Arc<ToolCatalog>,
    system_prompt: Arc<str>,
    max_tokens: Option<u32>,
    rng: Box<dyn RngCore + Send>,
    /// Token usage accumulated over the session
    usage: Usage,
    last_active: Instant,
}

impl Session {
    pub fn new(
        context: TurnContext,
        llm: Arc<dyn LlmService>,
        catalog: Arc<ToolCatalog>,
        system_prompt: Arc<str>,
        max_tokens: Option<u32>,
    ) -> Self {
        Self {
            context,
            turn: TurnState::Stop,
            state: OrderState::new(),
            llm,
            catalog,
            system_prompt,
            max_tokens,
            rng: Box::new(StdRng::from_entropy()),
            usage: Usage::default(),
            last_active: Instant::now(),
        }
    }

    /// Replace the ETA randomness source
    #[cfg(test)]
    #[must_use]
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn state(&self) -> &OrderState {
        &self.state
    }

    /// Mark the session as in use now
    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn last_active(&self) -> Instant {
        self.last_active
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }

    #[cfg(test)]
    pub fn turn_state(&self) -> &TurnState {
        &self.turn
    }

    /// Run one user utterance through to `Stop`
    pub async fn handle_user_message(
        &mut self,
        text: impl Into<String>,
    ) -> Result<TurnOutcome, SessionError> {
        self.touch();
        if self.turn.is_working() {
            // Only an abandoned turn (its future was dropped) can leave us here
            tracing::warn!(
                session_id = %self.context.session_id,
                state = ?self.turn,
                "Recovering abandoned turn"
            );
            self.turn = TurnState::Stop;
        }

        let result = self.process_event(Event::UserMessage { text: text.into() }).await;
        if result.is_err() {
            self.turn = TurnState::Stop;
        }
        result?;

        let reply = self
            .state
            .last_message()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        Ok(TurnOutcome {
            reply,
            finished: self.state.finished,
        })
    }

    async fn process_event(&mut self, event: Event) -> Result<(), SessionError> {
        // Events are processed in a loop to handle chained effects
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            if let Event::LlmResponse { usage, .. } = &current_event {
                self.usage.input_tokens += usage.input_tokens;
                self.usage.output_tokens += usage.output_tokens;
            }
            let result = transition(&self.turn, &self.context, current_event)?;
            self.turn = result.new_state;

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect).await? {
                    events_to_process.push(generated_event);
                }
            }
        }

        Ok(())
    }

    async fn execute_effect(&mut self, effect: Effect) -> Result<Option<Event>, SessionError> {
        match effect {
            Effect::AppendMessage(message) => {
                self.state.messages.push(message);
                Ok(None)
            }

            Effect::RequestPolicy => {
                let attempt = match self.turn {
                    TurnState::Policy { attempt, .. } => attempt,
                    _ => 1,
                };
                let request = self.build_request();
                match self.llm.complete(&request).await {
                    Ok(response) => Ok(Some(Event::LlmResponse {
                        message: response_to_message(&response, &self.catalog),
                        usage: response.usage,
                    })),
                    Err(e) => Ok(Some(Event::LlmError {
                        message: e.message,
                        error_kind: e.kind,
                        attempt,
                    })),
                }
            }

            Effect::ScheduleRetry { delay, attempt } => {
                tracing::info!(
                    session_id = %self.context.session_id,
                    attempt,
                    delay_ms = %delay.as_millis(),
                    "Retrying dialogue policy"
                );
                tokio::time::sleep(delay).await;
                Ok(Some(Event::RetryTimeout { attempt }))
            }

            Effect::DispatchTools { tool_calls } => {
                tracing::debug!(
                    session_id = %self.context.session_id,
                    tools = ?tool_calls.iter().map(ToolCall::name).collect::<Vec<_>>(),
                    "Dispatching tool calls"
                );
                let results = apply_tool_calls(&mut self.state, &tool_calls, self.rng.as_mut());
                Ok(Some(Event::ToolsApplied { results }))
            }

            Effect::TurnComplete => {
                tracing::info!(
                    session_id = %self.context.session_id,
                    items = self.state.order.len(),
                    finished = self.state.finished,
                    input_tokens = self.usage.input_tokens,
                    output_tokens = self.usage.output_tokens,
                    "Turn complete"
                );
                Ok(None)
            }

            Effect::TurnFailed(failure) => {
                tracing::error!(
                    session_id = %self.context.session_id,
                    failure = ?failure,
                    "Turn failed"
                );
                Err(match failure {
                    TurnFailure::Policy {
                        message,
                        error_kind,
                    } => SessionError::Policy {
                        message,
                        kind: error_kind,
                    },
                    TurnFailure::RecursionLimit { limit } => SessionError::RecursionLimit(limit),
                })
            }
        }
    }

    fn build_request(&self) -> LlmRequest {
        let (extra_system, messages) = to_llm_messages(&self.state.messages);
        let mut system = vec![SystemContent::new(self.system_prompt.as_ref())];
        system.extend(extra_system);

        LlmRequest {
            system,
            messages,
            tools: self.catalog.definitions(),
            max_tokens: self.max_tokens,
        }
    }
}

/// Translate session history into provider-neutral LLM messages.
///
/// System messages move to the system prompt. Consecutive messages with the
/// same role are merged, so tool results answer their calls together and a
/// user message left by a failed turn does not break role alternation.
fn to_llm_messages(history: &[Message]) -> (Vec<SystemContent>, Vec<LlmMessage>) {
    let mut system = Vec::new();
    let mut messages: Vec<LlmMessage> = Vec::new();

    for msg in history {
        let (role, content) = match msg.role {
            Role::System => {
                system.push(SystemContent::new(msg.content.clone()));
                continue;
            }

            Role::User => (
                MessageRole::User,
                vec![ContentBlock::text(msg.content.clone())],
            ),

            Role::Assistant => {
                let mut content = Vec::with_capacity(msg.tool_calls.len() + 1);
                if !msg.content.is_empty() {
                    content.push(ContentBlock::text(msg.content.clone()));
                }
                content.extend(msg.tool_calls.iter().map(|call| {
                    ContentBlock::tool_use(call.id.clone(), call.name(), call.input.to_value())
                }));
                (MessageRole::Assistant, content)
            }

            Role::Tool => (
                MessageRole::User,
                vec![ContentBlock::tool_result(
                    msg.tool_call_id.clone().unwrap_or_default(),
                    msg.name.clone().unwrap_or_default(),
                    msg.content.clone(),
                )],
            ),
        };

        if content.is_empty() {
            continue;
        }
        match messages.last_mut() {
            Some(last) if last.role == role => last.content.extend(content),
            _ => messages.push(LlmMessage { role, content }),
        }
    }

    (system, messages)
}

/// Build the assistant message. Only names in the catalog are parsed into
/// typed inputs; anything else is dispatched as `Unknown`.
fn response_to_message(response: &LlmResponse, catalog: &ToolCatalog) -> Message {
    let tool_calls = response
        .tool_uses()
        .into_iter()
        .map(|(id, name, input)| {
            let input = if catalog.contains(name) {
                ToolInput::from_name_and_value(name, input.clone())
            } else {
                ToolInput::Unknown {
                    name: name.to_string(),
                    input: input.clone(),
                }
            };
            ToolCall::new(id, input)
        })
        .collect();
    Message::assistant(response.text(), tool_calls)
}
