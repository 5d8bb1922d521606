use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for hookrelay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// System-wide execution defaults
    #[serde(default)]
    pub defaults: ExecutionDefaults,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// AI decision backend used by prompt handlers
    #[serde(default)]
    pub decision_backend: DecisionBackendConfig,

    /// Hook definition files, loaded in order
    #[serde(default)]
    pub hook_files: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            defaults: ExecutionDefaults::default(),
            logging: LoggingConfig::default(),
            decision_backend: DecisionBackendConfig::default(),
            hook_files: vec![PathBuf::from(".hookrelay/hooks.yaml")],
        }
    }
}

/// Defaults applied when neither the dispatch call nor the handler says otherwise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutionDefaults {
    /// Per-attempt timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retry count for handlers that do not set one
    #[serde(default)]
    pub retry: u32,

    /// Linear backoff step: attempt `n` waits `n * backoff_step_ms`
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,

    /// Blocking exit codes for handlers that declare none
    #[serde(default = "default_blocking_exit_codes")]
    pub blocking_exit_codes: Vec<i32>,

    /// Run batches concurrently by default
    #[serde(default)]
    pub parallel: bool,

    /// Keep sequential batches going past hard failures by default
    #[serde(default)]
    pub continue_on_error: bool,
}

const fn default_timeout_ms() -> u64 {
    30_000
}

const fn default_backoff_step_ms() -> u64 {
    1_000
}

fn default_blocking_exit_codes() -> Vec<i32> {
    vec![2]
}

impl Default for ExecutionDefaults {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retry: 0,
            backoff_step_ms: default_backoff_step_ms(),
            blocking_exit_codes: default_blocking_exit_codes(),
            parallel: false,
            continue_on_error: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

/// Decision backend (Anthropic Messages API) configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DecisionBackendConfig {
    /// Whether prompt handlers may call the backend at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key (takes precedence over `api_key_env`)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used when a prompt handler names none
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens for the decision response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(default = "default_backend_timeout_ms")]
    pub timeout_ms: u64,
}

const fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

const fn default_max_tokens() -> u32 {
    512
}

const fn default_backend_timeout_ms() -> u64 {
    30_000
}

impl Default for DecisionBackendConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_base_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_backend_timeout_ms(),
        }
    }
}

impl DecisionBackendConfig {
    /// API key from config, else from `api_key_env`
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok().filter(|key| !key.is_empty()))
    }
}
