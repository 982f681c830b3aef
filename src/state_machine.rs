//! Turn state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! `Policy` asks the dialogue policy for a reply, `Dispatch` runs the
//! order node over requested tools, `Stop` waits for the next user message.

mod effect;
pub mod event;
pub mod order_node;
pub mod router;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, TurnFailure};
pub use event::Event;
pub use order_node::apply_tool_calls;
pub use state::{Message, OrderState, Role, ToolCall, ToolInput, TurnContext, TurnState};
pub use transition::{transition, TransitionError};
