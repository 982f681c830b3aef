//! Turn router: decides what follows an assistant message

use super::state::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The message requested tools; run the order node
    Dispatch,
    /// Plain reply; the turn is over
    Stop,
}

/// Route on the latest message. An empty tool-call list means stop.
pub fn route(message: &Message) -> Route {
    if message.tool_calls.is_empty() {
        Route::Stop
    } else {
        Route::Dispatch
    }
}
