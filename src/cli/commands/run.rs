//! `hookrelay run`: a single handler by id, outside its registered events

use anyhow::Result;
use std::path::PathBuf;

use super::{EXIT_BLOCKED, EXIT_FAILED, EXIT_OK};
use crate::cli::app;
use crate::cli::output::emit_json;
use crate::domain::models::{Config, ExecutionRecord, HookEvent};

pub async fn execute(
    handler_id: &str,
    event: HookEvent,
    config: &Config,
    hooks: &[PathBuf],
) -> Result<i32> {
    let dispatcher = app::build_dispatcher(config, hooks).await?;
    let context = app::event_context(event, app::read_payload().await?);

    let record = dispatcher.run_one(handler_id, &context).await?;
    emit_json(&record)?;
    Ok(exit_code(&record))
}

/// Host-facing exit code for a single record
pub const fn exit_code(record: &ExecutionRecord) -> i32 {
    if record.blocked {
        EXIT_BLOCKED
    } else if record.outcome.success {
        EXIT_OK
    } else {
        EXIT_FAILED
    }
}
