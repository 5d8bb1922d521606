//! Public dispatch API: one event in, one batch result out

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::domain::errors::{DomainResult, HookError};
use crate::domain::models::{BatchResult, DispatchOptions, EventContext, ExecutionRecord};
use crate::services::batch_runner::BatchRunner;
use crate::services::hook_executor::HookExecutor;
use crate::services::hook_registry::HookRegistry;

/// Ties registry, selection, supervision and batching together
#[derive(Clone)]
pub struct HookDispatcher {
    executor: Arc<HookExecutor>,
    batches: BatchRunner,
}

impl HookDispatcher {
    pub fn new(executor: HookExecutor) -> Self {
        let executor = Arc::new(executor);
        Self {
            batches: BatchRunner::new(executor.clone()),
            executor,
        }
    }

    pub fn registry(&self) -> &Arc<HookRegistry> {
        self.executor.registry()
    }

    /// Run every enabled handler registered for the context's event
    #[instrument(skip_all, fields(event = %context.event, session_id = %context.session_id))]
    pub async fn dispatch(&self, context: &EventContext, options: &DispatchOptions) -> BatchResult {
        let handlers = self.registry().for_event(context.event).await;
        if handlers.is_empty() {
            debug!("No handlers registered for event");
            return BatchResult::empty(context.event);
        }

        let result = self.batches.run(&handlers, context, options).await;
        info!(
            total = result.summary.total,
            successful = result.summary.successful,
            failed = result.summary.failed,
            skipped = result.summary.skipped,
            blocked = result.blocked,
            "Dispatch complete"
        );
        result
    }

    /// Run a single handler by id, regardless of the events it is registered for
    #[instrument(skip(self, context), fields(event = %context.event))]
    pub async fn run_one(&self, id: &str, context: &EventContext) -> DomainResult<ExecutionRecord> {
        let definition = self
            .registry()
            .get(id)
            .await
            .ok_or_else(|| HookError::NotFound(id.to_string()))?;

        self.executor
            .execute(&definition, context, &DispatchOptions::default())
            .await
    }
}
