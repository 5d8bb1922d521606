//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::models::HookEvent;

#[derive(Parser, Debug)]
#[command(name = "hookrelay")]
#[command(about = "hookrelay - lifecycle hook dispatcher for coding assistants", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to .hookrelay/config.yaml + local.yaml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Hooks file to load; repeat to load several. Replaces `hook_files` from config
    #[arg(long = "hooks", global = true, value_name = "FILE")]
    pub hooks: Vec<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch an event read from stdin to every registered handler
    Dispatch {
        /// Event name (e.g. PreToolUse, post_tool_use)
        #[arg(short, long, value_parser = parse_event)]
        event: HookEvent,

        /// Run handlers concurrently
        #[arg(long)]
        parallel: bool,

        /// Keep going after a handler exhausts its retries
        #[arg(long)]
        continue_on_error: bool,

        /// Per-attempt timeout for every handler, in milliseconds
        #[arg(long, value_name = "N")]
        timeout_ms: Option<u64>,

        /// Retry count for every handler
        #[arg(long, value_name = "N")]
        retry: Option<u32>,
    },

    /// Run a single handler by id with the stdin payload
    Run {
        /// Handler id
        handler_id: String,

        /// Event to run it for
        #[arg(short, long, value_parser = parse_event)]
        event: HookEvent,
    },

    /// List registered handlers
    List {
        /// Only handlers that would run for this event
        #[arg(short, long, value_parser = parse_event)]
        event: Option<HookEvent>,
    },

    /// Load and register every hooks file, reporting problems
    Validate,
}

fn parse_event(s: &str) -> Result<HookEvent, String> {
    s.parse::<HookEvent>().map_err(|e| e.to_string())
}
