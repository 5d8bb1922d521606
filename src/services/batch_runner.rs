//! Batch execution of the handlers selected for one event

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::models::{
    BatchHalt, BatchResult, DispatchOptions, EventContext, ExecutionRecord, ExecutionStatus,
    HandlerDefinition,
};
use crate::services::hook_executor::HookExecutor;

/// Runs a priority-ordered list of handlers sequentially or concurrently
#[derive(Clone)]
pub struct BatchRunner {
    executor: Arc<HookExecutor>,
}

impl BatchRunner {
    pub const fn new(executor: Arc<HookExecutor>) -> Self {
        Self { executor }
    }

    /// Run in the mode the options (or configured defaults) ask for
    pub async fn run(
        &self,
        handlers: &[Arc<HandlerDefinition>],
        context: &EventContext,
        options: &DispatchOptions,
    ) -> BatchResult {
        let parallel = options
            .parallel
            .unwrap_or(self.executor.defaults().parallel);

        if parallel {
            self.run_parallel(handlers, context, options).await
        } else {
            self.run_sequential(handlers, context, options).await
        }
    }

    /// Run handlers one at a time in order.
    ///
    /// Stops at the first blocking record, and at the first hard failure
    /// unless the batch or the failing handler continues on error.
    pub async fn run_sequential(
        &self,
        handlers: &[Arc<HandlerDefinition>],
        context: &EventContext,
        options: &DispatchOptions,
    ) -> BatchResult {
        let continue_on_error = options
            .continue_on_error
            .unwrap_or(self.executor.defaults().continue_on_error);

        let mut records = Vec::with_capacity(handlers.len());
        let mut skipped = 0;
        let mut halt = None;

        for definition in handlers {
            let record = self
                .executor
                .execute_recorded(definition, context, options)
                .await;

            if record.status.is_unselected() {
                skipped += 1;
                continue;
            }

            if record.blocked {
                info!(handler_id = %record.handler_id, "Sequential batch stopped by blocking handler");
                halt = Some(BatchHalt::Blocked {
                    handler_id: record.handler_id.clone(),
                });
                records.push(record);
                break;
            }

            if record.status == ExecutionStatus::FailedExhausted
                && !(continue_on_error || definition.continue_on_error)
            {
                warn!(handler_id = %record.handler_id, "Sequential batch stopped by failing handler");
                halt = Some(BatchHalt::Failed {
                    handler_id: record.handler_id.clone(),
                    message: record.outcome.error.clone().unwrap_or_default(),
                });
                records.push(record);
                break;
            }

            records.push(record);
        }

        BatchResult::new(context.event, records, skipped, halt)
    }

    /// Run every handler concurrently and settle all of them.
    ///
    /// Each handler runs on its own task, so a panicking handler settles as
    /// a failed record. Blocking never cancels siblings; records keep the
    /// input order.
    pub async fn run_parallel(
        &self,
        handlers: &[Arc<HandlerDefinition>],
        context: &EventContext,
        options: &DispatchOptions,
    ) -> BatchResult {
        let tasks = handlers.iter().map(|definition| {
            let executor = self.executor.clone();
            let definition = definition.clone();
            let context = context.clone();
            let options = options.clone();
            tokio::spawn(async move {
                executor
                    .execute_recorded(&definition, &context, &options)
                    .await
            })
        });
        let joined = join_all(tasks).await;

        let mut settled: Vec<ExecutionRecord> = Vec::with_capacity(joined.len());
        for (definition, result) in handlers.iter().zip(joined) {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    self.executor
                        .record_aborted(definition, context, format!("handler task failed: {e}"))
                        .await
                }
            };
            settled.push(record);
        }

        let total = settled.len();
        let records: Vec<ExecutionRecord> = settled
            .into_iter()
            .filter(|record| !record.status.is_unselected())
            .collect();
        debug!(ran = records.len(), total, "Parallel batch settled");

        let skipped = total - records.len();
        BatchResult::new(context.event, records, skipped, None)
    }
}
