//! Session lifecycle states.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// The lifecycle state of a conversation session.
///
/// - `NotStarted`: template bound, no question asked yet
/// - `InProgress`: gathering answers; the session also tracks the step cursor
/// - `Completed`: every reachable step passed
/// - `Cancelled`: abandoned by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Cancelled,
}

impl SessionStatus {
    /// Returns true if the session takes utterances.
    pub fn accepts_input(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Returns true if the session can still be cancelled.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::NotStarted | Self::InProgress)
    }
}

impl StateMachine for SessionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SessionStatus::*;
        matches!(
            (self, target),
            (NotStarted, InProgress)
                | (InProgress, Completed)
                | (NotStarted, Cancelled)
                | (InProgress, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SessionStatus::*;
        match self {
            NotStarted => vec![InProgress, Cancelled],
            InProgress => vec![Completed, Cancelled],
            Completed | Cancelled => vec![],
        }
    }
}
