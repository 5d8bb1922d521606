//! `hookrelay dispatch`: one host event in, one batch result out on stdout

use anyhow::Result;
use std::path::PathBuf;

use super::{EXIT_BLOCKED, EXIT_FAILED, EXIT_OK};
use crate::cli::app;
use crate::cli::output::emit_json;
use crate::domain::models::{BatchHalt, BatchResult, Config, DispatchOptions, HookEvent};

/// Batch settings taken from the command line
#[derive(Debug, Clone, Default)]
pub struct DispatchArgs {
    pub parallel: bool,
    pub continue_on_error: bool,
    pub timeout_ms: Option<u64>,
    pub retry: Option<u32>,
}

impl DispatchArgs {
    /// Flags left off fall back to the configured defaults
    pub fn options(&self) -> DispatchOptions {
        DispatchOptions {
            parallel: self.parallel.then_some(true),
            continue_on_error: self.continue_on_error.then_some(true),
            timeout_override_ms: self.timeout_ms,
            retry_override: self.retry,
        }
    }
}

pub async fn execute(
    event: HookEvent,
    args: DispatchArgs,
    config: &Config,
    hooks: &[PathBuf],
) -> Result<i32> {
    let dispatcher = app::build_dispatcher(config, hooks).await?;
    let context = app::event_context(event, app::read_payload().await?);

    let result = dispatcher.dispatch(&context, &args.options()).await;
    emit_json(&result)?;
    Ok(exit_code(&result))
}

/// Host-facing exit code for a batch
pub const fn exit_code(result: &BatchResult) -> i32 {
    if result.blocked {
        EXIT_BLOCKED
    } else if matches!(result.halt, Some(BatchHalt::Failed { .. })) {
        EXIT_FAILED
    } else {
        EXIT_OK
    }
}
