//! Command-line interface for hookrelay
//!
//! stdout carries results for the host; logs and errors go to stderr.

pub mod app;
pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

use crate::domain::models::Config;
use commands::dispatch::DispatchArgs;

/// Run the parsed command and return the process exit code
pub async fn run(cli: Cli, config: &Config) -> i32 {
    let hooks = cli.hooks.as_slice();
    let result = match cli.command {
        Commands::Dispatch {
            event,
            parallel,
            continue_on_error,
            timeout_ms,
            retry,
        } => {
            let args = DispatchArgs {
                parallel,
                continue_on_error,
                timeout_ms,
                retry,
            };
            commands::dispatch::execute(event, args, config, hooks).await
        }
        Commands::Run { handler_id, event } => {
            commands::run::execute(&handler_id, event, config, hooks).await
        }
        Commands::List { event } => commands::list::execute(event, config, hooks, cli.json).await,
        Commands::Validate => commands::validate::execute(config, hooks, cli.json).await,
    };

    result.unwrap_or_else(|err| {
        handle_error(&err, cli.json);
        commands::EXIT_FAILED
    })
}

/// Report a command failure on stderr
pub fn handle_error(err: &anyhow::Error, json_mode: bool) {
    tracing::error!(error = %format!("{err:#}"), "Command failed");
    if json_mode {
        eprintln!("{}", serde_json::json!({ "error": format!("{err:#}") }));
    } else {
        eprintln!("Error: {err:#}");
    }
}
