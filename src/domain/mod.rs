//! Domain layer for the hookrelay dispatcher
//!
//! This module contains the handler and execution models, the ports the
//! dispatcher consumes, and the error taxonomy.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainResult, HookError};
