use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prompt sent to the decision backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionRequest {
    pub prompt: String,
    /// Backend default when unset
    pub model: Option<String>,
    pub system_prompt: Option<String>,
}

/// Allow/continue (`ok = true`) or deny/block, with a reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub ok: bool,
    #[serde(default)]
    pub reason: String,
}

/// Decision backend errors
#[derive(Debug, Clone, Error)]
pub enum DecisionBackendError {
    #[error("Decision backend is not configured: {0}")]
    NotConfigured(String),

    #[error("Decision backend timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Decision backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Decision backend network error: {0}")]
    Network(String),

    #[error("Decision backend returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// Port for AI-assisted decisions
#[async_trait]
pub trait DecisionBackend: Send + Sync {
    async fn complete(&self, request: &DecisionRequest) -> Result<Decision, DecisionBackendError>;
}
