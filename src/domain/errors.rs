//! Domain errors for the hookrelay dispatcher.

use thiserror::Error;

use super::ports::DecisionBackendError;

/// Errors surfaced by the registry and the execution supervisor.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("Invalid handler definition '{id}': {reason}")]
    Validation { id: String, reason: String },

    #[error("Handler not found: {0}")]
    NotFound(String),

    #[error("Unknown hook event: {0}")]
    UnknownEvent(String),

    #[error("Handler '{handler_id}' failed after {attempts} attempt(s): {message}")]
    HandlerExecution {
        handler_id: String,
        attempts: u32,
        message: String,
    },

    #[error("Decision backend error: {0}")]
    DecisionBackend(#[from] DecisionBackendError),
}

pub type DomainResult<T> = Result<T, HookError>;
