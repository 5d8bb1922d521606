//! Wiring shared by every command: config, hooks files, adapters, payload

use anyhow::{Context, Result};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::domain::models::{Config, EventContext, HookEvent};
use crate::infrastructure::config::{load_hook_files, ConfigLoader};
use crate::infrastructure::decision::AnthropicDecisionBackend;
use crate::infrastructure::modules::FunctionTable;
use crate::infrastructure::process::TokioCommandRunner;
use crate::infrastructure::sinks::TracingExecutionSink;
use crate::services::{HookDispatcher, HookExecutor, HookRegistry};

/// Load configuration from `--config` or the project hierarchy
pub fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Hooks files to load: the `--hooks` flags when given, else the configured list
pub fn hook_paths(config: &Config, overrides: &[PathBuf]) -> Vec<PathBuf> {
    if overrides.is_empty() {
        config.hook_files.clone()
    } else {
        overrides.to_vec()
    }
}

/// Build a dispatcher with every hooks file registered.
///
/// Configured files that do not exist are skipped; a missing `--hooks` file
/// is an error.
pub async fn build_dispatcher(config: &Config, hooks: &[PathBuf]) -> Result<HookDispatcher> {
    let definitions = load_hook_files(&hook_paths(config, hooks), hooks.is_empty())?;

    let registry = Arc::new(HookRegistry::new());
    registry
        .register_all(definitions)
        .await
        .context("Failed to register hook definitions")?;

    let mut executor = HookExecutor::new(
        registry,
        Arc::new(TokioCommandRunner::new()),
        Arc::new(FunctionTable::new()),
        config.defaults.clone(),
    )
    .with_sink(Arc::new(TracingExecutionSink));

    match AnthropicDecisionBackend::from_config(&config.decision_backend) {
        Ok(backend) => executor = executor.with_decision_backend(Arc::new(backend)),
        Err(e) => debug!(reason = %e, "Prompt handlers will fail open"),
    }

    Ok(HookDispatcher::new(executor))
}

/// Read the host payload from stdin.
///
/// An interactive terminal or empty input yields an empty object.
pub async fn read_payload() -> Result<serde_json::Value> {
    let mut stdin = tokio::io::stdin();
    if std::io::stdin().is_terminal() {
        warn!("stdin is a terminal, dispatching with an empty payload");
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }

    let mut raw = String::new();
    stdin
        .read_to_string(&mut raw)
        .await
        .context("Failed to read payload from stdin")?;
    parse_payload(&raw)
}

pub fn parse_payload(raw: &str) -> Result<serde_json::Value> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw).context("stdin payload is not valid JSON")
}

/// Event context for a payload, carrying the process environment
pub fn event_context(event: HookEvent, payload: serde_json::Value) -> EventContext {
    EventContext::from_host_payload(event, payload).with_environment(std::env::vars().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::HandlerKind;

    #[test]
    fn test_parse_payload() {
        assert_eq!(parse_payload("").unwrap(), serde_json::json!({}));
        assert_eq!(parse_payload("  \n").unwrap(), serde_json::json!({}));
        assert_eq!(
            parse_payload(r#"{"tool_name":"Bash"}"#).unwrap()["tool_name"],
            "Bash"
        );
        assert!(parse_payload("{not json").is_err());
    }

    #[test]
    fn test_hooks_flags_replace_configured_files() {
        let config = Config::default();
        assert_eq!(hook_paths(&config, &[]), config.hook_files);

        let flags = vec![PathBuf::from("mine.yaml")];
        assert_eq!(hook_paths(&config, &flags), flags);
    }

    #[tokio::test]
    async fn test_build_dispatcher_registers_hooks_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hooks.yaml");
        std::fs::write(
            &path,
            "hooks:\n  - id: lint\n    name: Lint\n    events: [PostToolUse]\n    handler: { type: command, command: 'true' }\n",
        )
        .unwrap();

        let dispatcher = build_dispatcher(&Config::default(), &[path]).await.unwrap();
        let lint = dispatcher.registry().get("lint").await.unwrap();
        assert!(matches!(lint.handler, HandlerKind::Command { .. }));
    }

    #[tokio::test]
    async fn test_missing_hooks_flag_file_fails_but_configured_one_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");

        let err = build_dispatcher(&Config::default(), &[missing.clone()])
            .await
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("Hooks file not found"));

        let config = Config {
            hook_files: vec![missing],
            ..Config::default()
        };
        let dispatcher = build_dispatcher(&config, &[]).await.unwrap();
        assert!(dispatcher.registry().is_empty().await);
    }

    #[tokio::test]
    async fn test_duplicate_ids_across_files_fail() {
        let dir = tempfile::tempdir().unwrap();
        let body = "hooks:\n  - id: dup\n    name: Dup\n    events: [Stop]\n    handler: { type: command, command: 'true' }\n";
        let a = dir.path().join("a.yaml");
        let b = dir.path().join("b.yaml");
        std::fs::write(&a, body).unwrap();
        std::fs::write(&b, body).unwrap();

        assert!(build_dispatcher(&Config::default(), &[a, b]).await.is_err());
    }
}
