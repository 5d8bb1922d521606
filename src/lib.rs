//! hookrelay - lifecycle hook dispatcher for coding assistants
//!
//! A host emits lifecycle events (before a tool runs, after a prompt is
//! submitted, when a session starts). hookrelay routes each event to the
//! registered handlers that select it, supervises them with timeouts and
//! retries, and reports whether any of them asked the host to block.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): handler and execution models, ports, errors
//! - **Service Layer** (`services`): registry, selection, supervision, batching
//! - **Infrastructure Layer** (`infrastructure`): processes, HTTP backend, config, logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use hookrelay::{
//!     DispatchOptions, EventContext, ExecutionDefaults, HandlerDefinition, HandlerKind,
//!     HookDispatcher, HookEvent, HookExecutor, HookRegistry,
//! };
//! use hookrelay::infrastructure::{modules::FunctionTable, process::TokioCommandRunner};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = Arc::new(HookRegistry::new());
//!     registry
//!         .register(HandlerDefinition::new(
//!             "guard",
//!             "Guard shell commands",
//!             vec![HookEvent::PreToolUse],
//!             HandlerKind::command("./guard.sh"),
//!         ))
//!         .await?;
//!
//!     let executor = HookExecutor::new(
//!         registry,
//!         Arc::new(TokioCommandRunner::new()),
//!         Arc::new(FunctionTable::new()),
//!         ExecutionDefaults::default(),
//!     );
//!     let dispatcher = HookDispatcher::new(executor);
//!
//!     let context = EventContext::new(HookEvent::PreToolUse, "session-1").with_tool("Bash");
//!     let result = dispatcher.dispatch(&context, &DispatchOptions::default()).await;
//!     println!("blocked: {}", result.blocked);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    BatchHalt, BatchResult, BatchSummary, Config, DispatchOptions, EventContext,
    ExecutionDefaults, ExecutionOutcome, ExecutionRecord, ExecutionStatus, HandlerDefinition,
    HandlerKind, HandlerStats, HookEvent, HookFilter,
};
pub use domain::ports::{
    CommandRunner, Decision, DecisionBackend, ExecutionSink, HookCallback, ModuleLoader,
};
pub use domain::{DomainResult, HookError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{BatchRunner, HookDispatcher, HookExecutor, HookRegistry, PromptEvaluator};
