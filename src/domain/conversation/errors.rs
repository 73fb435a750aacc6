//! Session errors.

use thiserror::Error;

use super::state::SessionStatus;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::template::TemplateError;
use crate::domain::validation::ValidationFailure;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("cannot {operation} a session that is {status:?}")]
    InvalidState {
        operation: &'static str,
        status: SessionStatus,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("snapshot does not match template: {0}")]
    SnapshotMismatch(String),
}

impl SessionError {
    pub fn invalid_state(operation: &'static str, status: SessionStatus) -> Self {
        Self::InvalidState { operation, status }
    }
}

impl From<SessionError> for DomainError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Template(t) => t.into(),
            SessionError::InvalidState { .. } => {
                DomainError::new(ErrorCode::InvalidStateTransition, err.to_string())
            }
            SessionError::Validation(ref failure) => {
                DomainError::validation(failure.field_id().to_string(), err.to_string())
            }
            SessionError::SnapshotMismatch(_) => {
                DomainError::new(ErrorCode::ValidationFailed, err.to_string())
            }
        }
    }
}
