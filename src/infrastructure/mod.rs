//! Infrastructure layer module
//!
//! This module contains the adapters behind the domain ports:
//! - Configuration management and hooks files
//! - Logging infrastructure
//! - Process execution
//! - In-process module functions
//! - Anthropic decision backend
//! - Execution sinks
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod decision;
pub mod logging;
pub mod modules;
pub mod process;
pub mod sinks;
