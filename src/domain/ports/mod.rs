//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the async trait interfaces the dispatcher consumes:
//! - CommandRunner: spawning native processes with a hard timeout
//! - ModuleLoader: resolving and calling named functions
//! - DecisionBackend: AI-assisted allow/block decisions
//! - ExecutionSink: observability side channel for execution records
//! - HookCallback: in-process handler bodies
//!
//! Infrastructure adapters implement these; services only see the traits.

pub mod callback;
pub mod command_runner;
pub mod decision_backend;
pub mod execution_sink;
pub mod module_loader;
pub mod null_sink;

pub use callback::HookCallback;
pub use command_runner::{CommandError, CommandOutput, CommandRunner, CommandSpec};
pub use decision_backend::{Decision, DecisionBackend, DecisionBackendError, DecisionRequest};
pub use execution_sink::ExecutionSink;
pub use module_loader::{ModuleError, ModuleLoader};
pub use null_sink::NullExecutionSink;
