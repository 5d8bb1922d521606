//! In-process module loader
//!
//! Module handlers name a `(path, function)` pair. This loader resolves the
//! pair against a table of async functions registered at startup.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::models::EventContext;
use crate::domain::ports::{HookCallback, ModuleError, ModuleLoader};

/// Table of named module functions
#[derive(Clone, Default)]
pub struct FunctionTable {
    functions: HashMap<(String, String), Arc<dyn HookCallback>>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` of module `path`, replacing any previous entry
    pub fn register(
        &mut self,
        path: impl Into<String>,
        function: impl Into<String>,
        body: impl HookCallback + 'static,
    ) {
        self.functions
            .insert((path.into(), function.into()), Arc::new(body));
    }

    /// Builder form of [`FunctionTable::register`]
    pub fn with(
        mut self,
        path: impl Into<String>,
        function: impl Into<String>,
        body: impl HookCallback + 'static,
    ) -> Self {
        self.register(path, function, body);
        self
    }

    pub fn contains(&self, path: &str, function: &str) -> bool {
        self.functions
            .contains_key(&(path.to_string(), function.to_string()))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[async_trait]
impl ModuleLoader for FunctionTable {
    async fn invoke(
        &self,
        path: &str,
        function: &str,
        context: &EventContext,
    ) -> Result<Value, ModuleError> {
        let body = self
            .functions
            .get(&(path.to_string(), function.to_string()))
            .ok_or_else(|| ModuleError::NotFound {
                path: path.to_string(),
                function: function.to_string(),
            })?;

        debug!(path, function, "Invoking module function");
        body.call(context).await.map_err(|e| ModuleError::Failed {
            path: path.to_string(),
            function: function.to_string(),
            message: format!("{e:#}"),
        })
    }
}
