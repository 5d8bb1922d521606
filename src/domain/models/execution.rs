//! Execution results, batch summaries and per-handler statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use uuid::Uuid;

use super::hook::HookEvent;

/// Maximum number of entries kept in a handler's error history
pub const MAX_ERROR_HISTORY: usize = 100;

/// Canonical result of one handler invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    pub success: bool,
    pub exit_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionOutcome {
    /// Successful no-op
    pub const fn succeeded() -> Self {
        Self {
            success: true,
            exit_code: 0,
            stdout: None,
            stderr: None,
            output: None,
            error: None,
        }
    }

    /// Failed outcome with an error message
    pub fn failed(exit_code: i32, error: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code,
            stdout: None,
            stderr: None,
            output: None,
            error: Some(error.into()),
        }
    }

    /// Outcome derived from a bare exit code
    pub fn from_exit_code(exit_code: i32) -> Self {
        if exit_code == 0 {
            Self::succeeded()
        } else {
            Self::failed(exit_code, format!("exited with code {exit_code}"))
        }
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    /// Normalize the raw value returned by a callback or module function.
    ///
    /// - `true`/`false` map to exit 0/1
    /// - numbers are exit codes
    /// - objects pass through `success`, `exitCode`, `stdout`, `stderr`,
    ///   `output`, `error`; `exitCode` defaults to 0 on success, else 1
    /// - `null` is a success, a string becomes stdout, an array becomes output
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Bool(true) | Value::Null => Self::succeeded(),
            Value::Bool(false) => Self::failed(1, "handler returned false"),
            Value::Number(n) => {
                let code = n.as_i64().and_then(|c| i32::try_from(c).ok()).unwrap_or(1);
                Self::from_exit_code(code)
            }
            Value::String(s) => Self {
                stdout: Some(s),
                ..Self::succeeded()
            },
            Value::Array(_) => Self::succeeded().with_output(value),
            Value::Object(map) => {
                let explicit_code = map
                    .get("exitCode")
                    .or_else(|| map.get("exit_code"))
                    .and_then(Value::as_i64)
                    .and_then(|c| i32::try_from(c).ok());
                let success = map
                    .get("success")
                    .and_then(Value::as_bool)
                    .unwrap_or_else(|| explicit_code.is_none_or(|c| c == 0));
                let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);

                Self {
                    success,
                    exit_code: explicit_code.unwrap_or(i32::from(!success)),
                    stdout: text("stdout"),
                    stderr: text("stderr"),
                    output: map.get("output").filter(|v| !v.is_null()).cloned(),
                    error: text("error"),
                }
            }
        }
    }

    /// Normalize a finished process.
    ///
    /// Stdout starting with `{` is parsed as structured output; the raw text
    /// is kept either way.
    pub fn from_process(exit_code: i32, stdout: String, stderr: String) -> Self {
        let trimmed = stdout.trim();
        let output = if trimmed.starts_with('{') {
            serde_json::from_str::<Value>(trimmed).ok()
        } else {
            None
        };

        let success = exit_code == 0;
        let error = if success {
            None
        } else if stderr.trim().is_empty() {
            Some(format!("exited with code {exit_code}"))
        } else {
            Some(stderr.trim().to_string())
        };

        Self {
            success,
            exit_code,
            stdout: (!stdout.is_empty()).then_some(stdout),
            stderr: (!stderr.is_empty()).then_some(stderr),
            output,
            error,
        }
    }
}

/// Where a single handler invocation ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Handler is disabled
    SkippedDisabled,
    /// Matcher rejected the event
    SkippedNoMatch,
    /// Filter rejected the event
    SkippedNoFilter,
    /// An attempt ran to completion. The outcome may still carry
    /// `success = false` from a non-zero exit that was not retried.
    Completed,
    /// Every attempt failed or timed out
    FailedExhausted,
}

impl ExecutionStatus {
    /// The handler was not selected for this event
    pub const fn is_unselected(self) -> bool {
        matches!(self, Self::SkippedNoMatch | Self::SkippedNoFilter)
    }
}

/// One handler's execution for one event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub execution_id: Uuid,
    pub handler_id: String,
    pub handler_name: String,
    pub event: HookEvent,
    pub status: ExecutionStatus,
    /// Attempts made (0 when skipped)
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: ExecutionOutcome,
    /// Exit code is one of the handler's blocking codes
    pub blocked: bool,
}

impl ExecutionRecord {
    pub const fn success(&self) -> bool {
        self.outcome.success
    }
}

/// Failure entry in a batch summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchError {
    pub handler_id: String,
    pub message: String,
}

/// Aggregate counts over a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub blocked: usize,
    /// Handlers registered for the event but not selected by matcher/filter
    pub skipped: usize,
    pub average_duration_ms: f64,
    pub errors: Vec<BatchError>,
}

impl BatchSummary {
    /// Summarize executed records
    #[allow(clippy::cast_precision_loss)]
    pub fn from_records(records: &[ExecutionRecord], skipped: usize) -> Self {
        let successful = records.iter().filter(|r| r.success()).count();
        let blocked = records.iter().filter(|r| r.blocked).count();
        let average_duration_ms = if records.is_empty() {
            0.0
        } else {
            records.iter().map(|r| r.duration_ms as f64).sum::<f64>() / records.len() as f64
        };
        let errors = records
            .iter()
            .filter(|r| !r.success())
            .map(|r| BatchError {
                handler_id: r.handler_id.clone(),
                message: r
                    .outcome
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("exited with code {}", r.outcome.exit_code)),
            })
            .collect();

        Self {
            total: records.len(),
            successful,
            failed: records.len() - successful,
            blocked,
            skipped,
            average_duration_ms,
            errors,
        }
    }
}

/// Why a sequential batch stopped before the end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum BatchHalt {
    /// A handler asked the host to abort
    #[serde(rename_all = "camelCase")]
    Blocked { handler_id: String },
    /// A handler exhausted its retries
    #[serde(rename_all = "camelCase")]
    Failed { handler_id: String, message: String },
}

/// What the host gets back from a dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub event: HookEvent,
    pub records: Vec<ExecutionRecord>,
    pub summary: BatchSummary,
    /// At least one record is blocking
    pub blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halt: Option<BatchHalt>,
}

impl BatchResult {
    pub fn new(
        event: HookEvent,
        records: Vec<ExecutionRecord>,
        skipped: usize,
        halt: Option<BatchHalt>,
    ) -> Self {
        let summary = BatchSummary::from_records(&records, skipped);
        Self {
            event,
            blocked: summary.blocked > 0,
            records,
            summary,
            halt,
        }
    }

    /// Nothing was registered or selected for the event
    pub fn empty(event: HookEvent) -> Self {
        Self::new(event, Vec::new(), 0, None)
    }
}

/// Per-call overrides for a dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOptions {
    /// Run handlers concurrently (configured default when unset)
    pub parallel: Option<bool>,
    /// Keep a sequential batch going past hard failures
    pub continue_on_error: Option<bool>,
    /// Per-attempt timeout for every handler in the batch
    pub timeout_override_ms: Option<u64>,
    /// Retry count for every handler in the batch
    pub retry_override: Option<u32>,
}

impl DispatchOptions {
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = Some(continue_on_error);
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_override_ms = Some(timeout_ms);
        self
    }

    pub fn retry(mut self, retry: u32) -> Self {
        self.retry_override = Some(retry);
        self
    }
}

/// Timestamped error kept in a handler's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Execution statistics for one handler
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlerStats {
    pub execution_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub blocked_count: u64,
    pub average_duration_ms: f64,
    pub last_execution: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub error_history: VecDeque<ErrorEntry>,
}

impl HandlerStats {
    /// Fold one execution into the counters and running average
    #[allow(clippy::cast_precision_loss)]
    pub fn record_outcome(&mut self, duration_ms: u64, success: bool, blocked: bool, at: DateTime<Utc>) {
        self.execution_count += 1;
        let n = self.execution_count as f64;
        self.average_duration_ms = self.average_duration_ms.mul_add(n - 1.0, duration_ms as f64) / n;

        if success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        if blocked {
            self.blocked_count += 1;
        }
        self.last_execution = Some(at);
    }

    /// Append to the bounded error history
    pub fn record_error(&mut self, message: impl Into<String>, at: DateTime<Utc>) {
        let message = message.into();
        self.last_error = Some(message.clone());
        self.error_history.push_back(ErrorEntry {
            timestamp: at,
            message,
        });
        while self.error_history.len() > MAX_ERROR_HISTORY {
            self.error_history.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, outcome: ExecutionOutcome, blocked: bool, duration_ms: u64) -> ExecutionRecord {
        let now = Utc::now();
        ExecutionRecord {
            execution_id: Uuid::new_v4(),
            handler_id: id.to_string(),
            handler_name: id.to_string(),
            event: HookEvent::PreToolUse,
            status: ExecutionStatus::Completed,
            attempts: 1,
            started_at: now,
            finished_at: now,
            duration_ms,
            outcome,
            blocked,
        }
    }

    #[test]
    fn test_from_value_bool_and_number() {
        assert_eq!(ExecutionOutcome::from_value(json!(true)).exit_code, 0);

        let failed = ExecutionOutcome::from_value(json!(false));
        assert!(!failed.success);
        assert_eq!(failed.exit_code, 1);

        let code = ExecutionOutcome::from_value(json!(2));
        assert!(!code.success);
        assert_eq!(code.exit_code, 2);
    }

    #[test]
    fn test_from_value_object_defaults() {
        let ok = ExecutionOutcome::from_value(json!({ "success": true, "stdout": "hi" }));
        assert_eq!(ok.exit_code, 0);
        assert_eq!(ok.stdout.as_deref(), Some("hi"));

        let not_ok = ExecutionOutcome::from_value(json!({ "success": false }));
        assert_eq!(not_ok.exit_code, 1);

        // A successful outcome may still carry a blocking exit code
        let blocking = ExecutionOutcome::from_value(json!({
            "success": true,
            "exitCode": 2,
            "output": { "decision": "block" }
        }));
        assert!(blocking.success);
        assert_eq!(blocking.exit_code, 2);
        assert_eq!(blocking.output, Some(json!({ "decision": "block" })));

        let code_only = ExecutionOutcome::from_value(json!({ "exitCode": 3 }));
        assert!(!code_only.success);
    }

    #[test]
    fn test_from_process_parses_json_stdout() {
        let outcome = ExecutionOutcome::from_process(0, r#"{"decision":"allow"}"#.to_string(), String::new());
        assert_eq!(outcome.output, Some(json!({ "decision": "allow" })));
        assert!(outcome.stderr.is_none());

        let raw = ExecutionOutcome::from_process(0, "{not json".to_string(), String::new());
        assert!(raw.output.is_none());
        assert_eq!(raw.stdout.as_deref(), Some("{not json"));
    }

    #[test]
    fn test_from_process_failure_uses_stderr() {
        let outcome = ExecutionOutcome::from_process(1, String::new(), "boom\n".to_string());
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_completed_status_does_not_imply_success() {
        let failed_exit = record("lint", ExecutionOutcome::from_process(1, String::new(), String::new()), false, 5);
        assert_eq!(failed_exit.status, ExecutionStatus::Completed);
        assert!(!failed_exit.success());
        assert_eq!(
            serde_json::to_value(ExecutionStatus::Completed).unwrap(),
            json!("completed")
        );
    }

    #[test]
    fn test_summary_counts() {
        let records = vec![
            record("a", ExecutionOutcome::succeeded(), false, 100),
            record("b", ExecutionOutcome::from_value(json!({"success": true, "exitCode": 2})), true, 200),
            record("c", ExecutionOutcome::failed(1, "nope"), false, 300),
        ];

        let summary = BatchSummary::from_records(&records, 4);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.blocked, 1);
        assert_eq!(summary.skipped, 4);
        assert!((summary.average_duration_ms - 200.0).abs() < f64::EPSILON);
        assert_eq!(
            summary.errors,
            vec![BatchError {
                handler_id: "c".to_string(),
                message: "nope".to_string()
            }]
        );
    }

    #[test]
    fn test_empty_summary_average_is_zero() {
        let summary = BatchSummary::from_records(&[], 0);
        assert_eq!(summary.total, 0);
        assert!(summary.average_duration_ms.abs() < f64::EPSILON);
    }

    #[test]
    fn test_stats_running_average_is_exact() {
        let mut stats = HandlerStats::default();
        for duration in [100, 200, 300] {
            stats.record_outcome(duration, true, false, Utc::now());
        }
        assert_eq!(stats.execution_count, 3);
        assert!((stats.average_duration_ms - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_error_history_is_bounded() {
        let mut stats = HandlerStats::default();
        for i in 0..150 {
            stats.record_error(format!("error {i}"), Utc::now());
        }
        assert_eq!(stats.error_history.len(), MAX_ERROR_HISTORY);
        assert_eq!(stats.error_history.front().unwrap().message, "error 50");
        assert_eq!(stats.last_error.as_deref(), Some("error 149"));
    }

    #[test]
    fn test_batch_halt_serialization() {
        let halt = BatchHalt::Blocked {
            handler_id: "h1".to_string(),
        };
        let json = serde_json::to_value(&halt).unwrap();
        assert_eq!(json, json!({ "reason": "blocked", "handlerId": "h1" }));
    }
}
