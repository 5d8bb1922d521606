//! `hookrelay list`: registered handlers as a table

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use super::EXIT_OK;
use crate::cli::app;
use crate::cli::output::{list_table, output, truncate, CommandOutput};
use crate::domain::models::{Config, HandlerDefinition, HookEvent};

#[derive(Debug, Serialize)]
pub struct HandlerOutput {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub events: Vec<HookEvent>,
    pub matcher: Option<String>,
    pub priority: u32,
    pub enabled: bool,
}

impl From<&HandlerDefinition> for HandlerOutput {
    fn from(definition: &HandlerDefinition) -> Self {
        Self {
            id: definition.id.clone(),
            name: definition.name.clone(),
            kind: definition.handler.kind_name(),
            events: definition.events.clone(),
            matcher: definition.matcher.clone(),
            priority: definition.priority,
            enabled: definition.enabled,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HandlerListOutput {
    pub handlers: Vec<HandlerOutput>,
    pub total: usize,
}

impl CommandOutput for HandlerListOutput {
    fn to_human(&self) -> String {
        if self.handlers.is_empty() {
            return "No handlers found.".to_string();
        }

        let mut table = list_table(&["id", "name", "type", "events", "matcher", "priority", "enabled"]);
        for handler in &self.handlers {
            let events: Vec<&str> = handler.events.iter().map(HookEvent::as_str).collect();
            table.add_row(vec![
                handler.id.clone(),
                truncate(&handler.name, 30),
                handler.kind.to_string(),
                events.join(","),
                handler.matcher.clone().unwrap_or_else(|| "*".to_string()),
                handler.priority.to_string(),
                if handler.enabled { "yes" } else { "no" }.to_string(),
            ]);
        }

        format!("{} handler(s):\n{table}", self.total)
    }
}

pub async fn execute(
    event: Option<HookEvent>,
    config: &Config,
    hooks: &[PathBuf],
    json_mode: bool,
) -> Result<i32> {
    let dispatcher = app::build_dispatcher(config, hooks).await?;
    let registry = dispatcher.registry();

    let definitions = match event {
        Some(event) => registry.for_event(event).await,
        None => registry.list().await,
    };

    let out = HandlerListOutput {
        total: definitions.len(),
        handlers: definitions.iter().map(|d| HandlerOutput::from(d.as_ref())).collect(),
    };
    output(&out, json_mode);
    Ok(EXIT_OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::HandlerKind;

    #[test]
    fn test_list_output() {
        let definition = HandlerDefinition::new(
            "fmt",
            "Format",
            vec![HookEvent::PostToolUse, HookEvent::Stop],
            HandlerKind::command("cargo fmt"),
        )
        .with_matcher("Edit|Write")
        .with_priority(10);

        let out = HandlerListOutput {
            total: 1,
            handlers: vec![HandlerOutput::from(&definition)],
        };

        let human = out.to_human();
        assert!(human.starts_with("1 handler(s):"));
        assert!(human.contains("PostToolUse,Stop"));
        assert!(human.contains("Edit|Write"));

        let json = out.to_json();
        assert_eq!(json["handlers"][0]["type"], "command");
        assert_eq!(json["handlers"][0]["priority"], 10);
    }

    #[test]
    fn test_empty_list() {
        let out = HandlerListOutput {
            handlers: Vec::new(),
            total: 0,
        };
        assert_eq!(out.to_human(), "No handlers found.");
    }
}
