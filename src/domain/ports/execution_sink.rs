use crate::domain::models::ExecutionRecord;

/// Observability side channel for execution records.
///
/// Called inline by the executor, so implementations must not block.
pub trait ExecutionSink: Send + Sync {
    fn record(&self, record: &ExecutionRecord);
}
