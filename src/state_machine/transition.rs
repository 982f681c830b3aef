//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! new state and effects; all I/O happens in the session runtime.

use super::effect::TurnFailure;
use super::router::{route, Route};
use super::state::{Message, TurnState};
use super::{Effect, Event, TurnContext};
use std::time::Duration;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A turn is already in progress; wait for the reply before sending another message")]
    TurnInProgress,
    #[error("Tool results do not match the requested calls: {0}")]
    MismatchedResults(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &TurnState,
    context: &TurnContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User Message Handling
        // ============================================================

        // Stop + UserMessage -> Policy (first round of a new turn)
        (TurnState::Stop, Event::UserMessage { text }) => {
            Ok(TransitionResult::new(TurnState::Policy {
                attempt: 1,
                round: 1,
            })
            .with_effect(Effect::AppendMessage(Message::user(text)))
            .with_effect(Effect::RequestPolicy))
        }

        (TurnState::Policy { .. } | TurnState::Dispatch { .. }, Event::UserMessage { .. }) => {
            Err(TransitionError::TurnInProgress)
        }

        // ============================================================
        // Policy Response Processing
        // ============================================================

        // Policy + LlmResponse -> router decides Dispatch or Stop
        (TurnState::Policy { round, .. }, Event::LlmResponse { message, .. }) => {
            match route(&message) {
                Route::Dispatch => {
                    let tool_calls = message.tool_calls.clone();
                    Ok(TransitionResult::new(TurnState::Dispatch {
                        tool_calls: tool_calls.clone(),
                        round: *round,
                    })
                    .with_effect(Effect::AppendMessage(message))
                    .with_effect(Effect::DispatchTools { tool_calls }))
                }
                Route::Stop => Ok(TransitionResult::new(TurnState::Stop)
                    .with_effect(Effect::AppendMessage(message))
                    .with_effect(Effect::TurnComplete)),
            }
        }

        // ============================================================
        // Error Handling and Retry
        // ============================================================

        // Policy + LlmError (retryable) -> Policy with incremented attempt
        (
            TurnState::Policy { attempt, round },
            Event::LlmError { error_kind, .. },
        ) if error_kind.is_retryable() && *attempt < context.max_retry_attempts => {
            let new_attempt = attempt + 1;
            let delay = retry_delay(context.retry_base_delay, new_attempt);

            Ok(TransitionResult::new(TurnState::Policy {
                attempt: new_attempt,
                round: *round,
            })
            .with_effect(Effect::ScheduleRetry {
                delay,
                attempt: new_attempt,
            }))
        }

        // Policy + LlmError (non-retryable or exhausted) -> Stop
        (
            TurnState::Policy { .. },
            Event::LlmError {
                message,
                error_kind,
                attempt,
            },
        ) => {
            let message = if error_kind.is_retryable() {
                format!("Failed after {attempt} attempts: {message}")
            } else {
                message
            };

            Ok(TransitionResult::new(TurnState::Stop).with_effect(Effect::TurnFailed(
                TurnFailure::Policy {
                    message,
                    error_kind,
                },
            )))
        }

        // RetryTimeout for the current attempt -> request again
        (
            TurnState::Policy { attempt, round },
            Event::RetryTimeout {
                attempt: retry_attempt,
            },
        ) if *attempt == retry_attempt => Ok(TransitionResult::new(TurnState::Policy {
            attempt: *attempt,
            round: *round,
        })
        .with_effect(Effect::RequestPolicy)),

        // ============================================================
        // Tool Dispatch
        // ============================================================
        (TurnState::Dispatch { tool_calls, round }, Event::ToolsApplied { results }) => {
            check_correlation(tool_calls, &results)?;

            if *round >= context.recursion_limit {
                return Ok(TransitionResult::new(TurnState::Stop)
                    .with_effects(Effect::append_all(results))
                    .with_effect(Effect::TurnFailed(TurnFailure::RecursionLimit {
                        limit: context.recursion_limit,
                    })));
            }

            // Loop back so the policy can react to the tool results
            Ok(TransitionResult::new(TurnState::Policy {
                attempt: 1,
                round: round + 1,
            })
            .with_effects(Effect::append_all(results))
            .with_effect(Effect::RequestPolicy))
        }

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {event:?}"
        ))),
    }
}

/// Every call gets exactly one result, in request order
fn check_correlation(
    tool_calls: &[super::state::ToolCall],
    results: &[Message],
) -> Result<(), TransitionError> {
    if tool_calls.len() != results.len() {
        return Err(TransitionError::MismatchedResults(format!(
            "{} calls, {} results",
            tool_calls.len(),
            results.len()
        )));
    }
    for (call, result) in tool_calls.iter().zip(results) {
        if result.tool_call_id.as_deref() != Some(call.id.as_str()) {
            return Err(TransitionError::MismatchedResults(format!(
                "expected result for {}, got {:?}",
                call.id, result.tool_call_id
            )));
        }
    }
    Ok(())
}

/// Exponential backoff: base, 2x base, 4x base, ...
fn retry_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(2).min(16);
    base.saturating_mul(1 << exponent)
}
