//! HTTP API for BaristaBot
//!
//! A server-rendered ordering page plus a small JSON API over the same
//! sessions.

mod handlers;
mod render;
mod types;

pub use handlers::create_router;

use crate::runtime::SessionManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(sessions: SessionManager) -> Self {
        Self {
            sessions: Arc::new(sessions),
        }
    }
}
