use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::models::EventContext;

/// Module loader errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Module function not found: {path}#{function}")]
    NotFound { path: String, function: String },

    #[error("Module function {path}#{function} failed: {message}")]
    Failed {
        path: String,
        function: String,
        message: String,
    },
}

/// Port for resolving a named function by module path and calling it.
///
/// The caller enforces the timeout by dropping the returned future.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn invoke(
        &self,
        path: &str,
        function: &str,
        context: &EventContext,
    ) -> Result<Value, ModuleError>;
}
