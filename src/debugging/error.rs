//! Debugging engine errors.

/// Errors returned by [`DebuggingEngine`](super::DebuggingEngine) calls.
///
/// Handler failures are never errors: they are recorded as critical issues
/// on the session.
#[derive(Debug, thiserror::Error)]
pub enum DebugError {
    #[error("debugging session not found: {0}")]
    SessionNotFound(String),

    #[error("debugging session already completed: {0}")]
    SessionCompleted(String),

    #[error("debugging session is already running: {0}")]
    SessionRunning(String),

    #[error("failed to serialize debugging session: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type DebugResult<T> = Result<T, DebugError>;

/// Failure inside a constraint handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("unsupported constraint expression: {0}")]
    UnsupportedExpression(String),

    #[error("constraint '{0}' names no columns")]
    NoColumns(String),

    #[error("field '{field}' has an unexpected value: {reason}")]
    InvalidValue { field: String, reason: String },
}
