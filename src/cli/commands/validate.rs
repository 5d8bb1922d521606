//! `hookrelay validate`: load and register every hooks file

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use super::EXIT_OK;
use crate::cli::app;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Debug, Serialize)]
pub struct ValidateOutput {
    pub files: Vec<PathBuf>,
    pub handlers: usize,
}

impl CommandOutput for ValidateOutput {
    fn to_human(&self) -> String {
        let files: Vec<String> = self.files.iter().map(|p| p.display().to_string()).collect();
        format!(
            "{} handler(s) valid across {} file(s): {}",
            self.handlers,
            self.files.len(),
            files.join(", ")
        )
    }
}

/// Any invalid or duplicate definition surfaces as an error
pub async fn execute(config: &Config, hooks: &[PathBuf], json_mode: bool) -> Result<i32> {
    let dispatcher = app::build_dispatcher(config, hooks).await?;

    let out = ValidateOutput {
        files: app::hook_paths(config, hooks)
            .into_iter()
            .filter(|p| p.exists())
            .collect(),
        handlers: dispatcher.registry().len().await,
    };
    output(&out, json_mode);
    Ok(EXIT_OK)
}
