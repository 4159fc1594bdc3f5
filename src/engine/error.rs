use std::time::Duration;

use thiserror::Error;

use crate::db::types::SessionStatus;

#[derive(Debug, Error)]
pub(crate) enum EngineError {
    #[error("exam not found or inactive: {0}")]
    ExamNotFound(String),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("cannot {operation} a session with status {status:?}")]
    InvalidTransition { operation: &'static str, status: SessionStatus },
    #[error("exam has no questions")]
    EmptyQuestionSet,
    #[error("session store unavailable")]
    StoreUnavailable(#[source] StoreError),
}

impl EngineError {
    pub(crate) fn is_invalid_transition(&self) -> bool {
        matches!(self, EngineError::InvalidTransition { .. })
    }
}

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}
