//! Decision backend over the Anthropic Messages API

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use std::time::Duration;
use tracing::{debug, instrument};

use super::types::{Message, MessageRequest, MessageResponse};
use crate::domain::models::DecisionBackendConfig;
use crate::domain::ports::{Decision, DecisionBackend, DecisionBackendError, DecisionRequest};

/// `anthropic-version` header value
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// System prompt used when a prompt handler does not bring its own
pub const DEFAULT_SYSTEM_PROMPT: &str = "You review actions taken by a coding assistant. \
Answer with a single JSON object and nothing else: \
{\"ok\": true, \"reason\": \"...\"} to let the action proceed, \
or {\"ok\": false, \"reason\": \"...\"} to stop it.";

/// HTTP decision backend
pub struct AnthropicDecisionBackend {
    http_client: ReqwestClient,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    timeout_ms: u64,
}

impl AnthropicDecisionBackend {
    /// Build a backend from configuration.
    ///
    /// Fails with `NotConfigured` when the backend is disabled or no API key
    /// can be resolved.
    pub fn from_config(config: &DecisionBackendConfig) -> Result<Self, DecisionBackendError> {
        if !config.enabled {
            return Err(DecisionBackendError::NotConfigured(
                "decision backend is disabled".to_string(),
            ));
        }
        let api_key = config.resolve_api_key().ok_or_else(|| {
            DecisionBackendError::NotConfigured(format!(
                "no API key in config or ${}",
                config.api_key_env
            ))
        })?;

        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| DecisionBackendError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout_ms: config.timeout_ms,
        })
    }

    fn transport_error(&self, error: &reqwest::Error) -> DecisionBackendError {
        if error.is_timeout() {
            DecisionBackendError::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else {
            DecisionBackendError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl DecisionBackend for AnthropicDecisionBackend {
    #[instrument(skip_all)]
    async fn complete(&self, request: &DecisionRequest) -> Result<Decision, DecisionBackendError> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        debug!(model = %model, "Requesting decision");

        let body = MessageRequest {
            model,
            max_tokens: self.max_tokens,
            system: Some(
                request
                    .system_prompt
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            ),
            messages: vec![Message::user(request.prompt.as_str())],
        };

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(DecisionBackendError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let message: MessageResponse = response
            .json()
            .await
            .map_err(|e| DecisionBackendError::InvalidResponse(e.to_string()))?;
        let text = message.first_text().ok_or_else(|| {
            DecisionBackendError::InvalidResponse("response has no text content".to_string())
        })?;

        let decision = parse_decision(text)?;
        debug!(ok = decision.ok, "Decision received");
        Ok(decision)
    }
}

/// Pull the `{ok, reason}` object out of model text, tolerating code fences
/// and surrounding prose
pub fn parse_decision(text: &str) -> Result<Decision, DecisionBackendError> {
    let object = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => {
            return Err(DecisionBackendError::InvalidResponse(format!(
                "no JSON object in response: {text}"
            )))
        }
    };

    serde_json::from_str(object)
        .map_err(|e| DecisionBackendError::InvalidResponse(format!("{e}: {object}")))
}
