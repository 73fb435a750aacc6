//! Application-level errors.

use thiserror::Error;

use crate::domain::conversation::SessionError;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::template::TemplateError;
use crate::ports::StoreError;

/// Errors returned by the conversation service and handlers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Another turn is in flight for this session.
    #[error("session is busy with another turn")]
    Busy,

    /// The in-flight turn was cancelled; its proposals were discarded.
    #[error("turn cancelled")]
    TurnCancelled,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<EngineError> for DomainError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Busy => DomainError::new(ErrorCode::SessionBusy, err.to_string()),
            EngineError::TurnCancelled => {
                DomainError::new(ErrorCode::SessionCancelled, err.to_string())
            }
            EngineError::Session(e) => e.into(),
            EngineError::Template(e) => e.into(),
            EngineError::Store(StoreError::NotFound(ref id)) => {
                DomainError::new(ErrorCode::TemplateNotFound, err.to_string())
                    .with_detail("template_id", id.clone())
            }
            EngineError::Store(_) => DomainError::new(ErrorCode::StorageError, err.to_string()),
        }
    }
}
