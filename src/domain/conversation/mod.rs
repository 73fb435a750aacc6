//! Conversation domain module.
//!
//! One session per user per template: the answers collected so far, the
//! step cursor, navigation through conditional logic, and completion.

mod answers;
mod errors;
mod events;
mod session;
mod state;
mod turn;

pub use answers::AnswerMap;
pub use errors::SessionError;
pub use events::{SessionCancelled, SessionCompleted, SessionStarted};
pub use session::{ConversationSession, SessionSnapshot};
pub use state::SessionStatus;
pub use turn::{AcceptedUpdate, NextAction, Prompt, TurnOutcome};
