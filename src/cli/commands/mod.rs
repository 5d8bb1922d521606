//! Subcommand implementations
//!
//! Each `execute` returns the process exit code on success.

pub mod dispatch;
pub mod list;
pub mod run;
pub mod validate;

/// Nothing blocked and nothing halted the batch
pub const EXIT_OK: i32 = 0;
/// A handler failed hard, or the command itself failed
pub const EXIT_FAILED: i32 = 1;
/// A handler asked the host to abort its action
pub const EXIT_BLOCKED: i32 = 2;
