//! Execution sinks
//!
//! Both sinks are non-blocking: the executor calls them inline.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::models::{ExecutionRecord, ExecutionStatus};
use crate::domain::ports::ExecutionSink;

/// Logs one structured event per record
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingExecutionSink;

impl ExecutionSink for TracingExecutionSink {
    fn record(&self, record: &ExecutionRecord) {
        match record.status {
            ExecutionStatus::Completed => info!(
                execution_id = %record.execution_id,
                handler_id = %record.handler_id,
                event = %record.event,
                attempts = record.attempts,
                duration_ms = record.duration_ms,
                exit_code = record.outcome.exit_code,
                success = record.outcome.success,
                blocked = record.blocked,
                "Handler executed"
            ),
            ExecutionStatus::FailedExhausted => warn!(
                execution_id = %record.execution_id,
                handler_id = %record.handler_id,
                event = %record.event,
                attempts = record.attempts,
                duration_ms = record.duration_ms,
                error = record.outcome.error.as_deref().unwrap_or_default(),
                "Handler failed"
            ),
            status => debug!(
                handler_id = %record.handler_id,
                event = %record.event,
                status = ?status,
                "Handler skipped"
            ),
        }
    }
}

/// Forwards records to an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelExecutionSink {
    sender: mpsc::UnboundedSender<ExecutionRecord>,
}

impl ChannelExecutionSink {
    /// Sink plus the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionRecord>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ExecutionSink for ChannelExecutionSink {
    fn record(&self, record: &ExecutionRecord) {
        if self.sender.send(record.clone()).is_err() {
            debug!(handler_id = %record.handler_id, "Execution record receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ExecutionOutcome, HookEvent};
    use chrono::Utc;
    use uuid::Uuid;

    fn record(status: ExecutionStatus) -> ExecutionRecord {
        let now = Utc::now();
        ExecutionRecord {
            execution_id: Uuid::new_v4(),
            handler_id: "h".to_string(),
            handler_name: "Handler".to_string(),
            event: HookEvent::Stop,
            status,
            attempts: 1,
            started_at: now,
            finished_at: now,
            duration_ms: 5,
            outcome: ExecutionOutcome::succeeded(),
            blocked: false,
        }
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_records() {
        let (sink, mut receiver) = ChannelExecutionSink::channel();
        sink.record(&record(ExecutionStatus::Completed));
        sink.record(&record(ExecutionStatus::SkippedNoMatch));

        assert_eq!(receiver.recv().await.unwrap().status, ExecutionStatus::Completed);
        assert_eq!(receiver.recv().await.unwrap().status, ExecutionStatus::SkippedNoMatch);
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (sink, receiver) = ChannelExecutionSink::channel();
        drop(receiver);
        sink.record(&record(ExecutionStatus::Completed));
    }

    #[test]
    fn test_tracing_sink_accepts_every_status() {
        let sink = TracingExecutionSink;
        for status in [
            ExecutionStatus::Completed,
            ExecutionStatus::FailedExhausted,
            ExecutionStatus::SkippedDisabled,
        ] {
            sink.record(&record(status));
        }
    }
}
