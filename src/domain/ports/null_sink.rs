//! Null execution sink implementation.
//!
//! Used when nothing observes execution records but the executor
//! requires an ExecutionSink.

use crate::domain::models::ExecutionRecord;
use super::ExecutionSink;

/// A sink that drops every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullExecutionSink;

impl ExecutionSink for NullExecutionSink {
    fn record(&self, _record: &ExecutionRecord) {}
}
