//! Runtime for executing ordering sessions
//!
//! Each session owns its order state behind its own lock, so turns of one
//! customer serialize while different customers proceed independently.
//! Idle sessions are evicted whenever a new one is created.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::Session;

use crate::config::SessionConfig;
use crate::llm::{LlmErrorKind, LlmService};
use crate::state_machine::{OrderState, TransitionError, TurnContext};
use crate::tools::ToolCatalog;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Result of one completed turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Final assistant text for this turn (may be empty)
    pub reply: String,
    /// Whether an order has been placed in this session
    pub finished: bool,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("dialogue policy failed: {message}")]
    Policy { message: String, kind: LlmErrorKind },

    #[error("turn exceeded {0} policy rounds without finishing")]
    RecursionLimit(u32),
}

type SessionHandle = Arc<Mutex<Session>>;

/// Manager for all live sessions
pub struct SessionManager {
    llm: Arc<dyn LlmService>,
    catalog: Arc<ToolCatalog>,
    system_prompt: Arc<str>,
    max_tokens: Option<u32>,
    config: SessionConfig,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new(
        llm: Arc<dyn LlmService>,
        catalog: Arc<ToolCatalog>,
        system_prompt: impl Into<Arc<str>>,
        max_tokens: Option<u32>,
        config: SessionConfig,
    ) -> Self {
        Self {
            llm,
            catalog,
            system_prompt: system_prompt.into(),
            max_tokens,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a fresh session with an empty order, returning its id
    pub async fn create(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Session::new(
            TurnContext::new(&id, &self.config),
            self.llm.clone(),
            self.catalog.clone(),
            self.system_prompt.clone(),
            self.max_tokens,
        );

        let mut sessions = self.sessions.write().await;
        self.evict(&mut sessions);
        sessions.insert(id.clone(), Arc::new(Mutex::new(session)));

        tracing::info!(session_id = %id, active = sessions.len(), "Session started");
        id
    }

    /// Drop sessions idle past the timeout, then make room for one more
    /// under `max_sessions`. Sessions mid-turn are never evicted.
    fn evict(&self, sessions: &mut HashMap<String, SessionHandle>) {
        let timeout = self.config.idle_timeout;
        let before = sessions.len();
        sessions.retain(|_, handle| {
            handle
                .try_lock()
                .map_or(true, |session| session.idle_for() < timeout)
        });

        while sessions.len() >= self.config.max_sessions {
            let oldest = sessions
                .iter()
                .filter_map(|(id, handle)| {
                    handle
                        .try_lock()
                        .ok()
                        .map(|session| (session.last_active(), id.clone()))
                })
                .min();
            let Some((_, id)) = oldest else { break };
            sessions.remove(&id);
        }

        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
    }

    async fn get(&self, id: &str) -> Result<SessionHandle, SessionError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Copy of the session record. Waits for any turn in progress.
    pub async fn snapshot(&self, id: &str) -> Result<OrderState, SessionError> {
        let handle = self.get(id).await?;
        let mut session = handle.lock().await;
        session.touch();
        Ok(session.state().clone())
    }

    /// Run one user utterance through the session
    pub async fn send_message(&self, id: &str, text: &str) -> Result<TurnOutcome, SessionError> {
        let handle = self.get(id).await?;
        let mut session = handle.lock().await;
        session.handle_user_message(text).await
    }

    /// Discard a session and everything in it
    pub async fn end(&self, id: &str) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .remove(id)
            .map(|_| tracing::info!(session_id = %id, "Session ended"))
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    #[cfg(test)]
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
