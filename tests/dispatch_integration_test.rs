//! End-to-end dispatch behavior over fake ports

mod common;

use common::{call_log, dispatcher_with, executor, logging_handler, CannedBackend, FixedRunner};
use hookrelay::domain::ports::{Decision, DecisionBackendError};
use hookrelay::{
    BatchHalt, DispatchOptions, EventContext, ExecutionStatus, HandlerDefinition, HandlerKind,
    HookDispatcher, HookError, HookEvent, HookFilter, HookRegistry,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn pre_tool_use() -> EventContext {
    EventContext::new(HookEvent::PreToolUse, "session-1").with_tool("Bash")
}

#[tokio::test]
async fn test_no_handlers_yields_empty_result() {
    let dispatcher = dispatcher_with(Vec::new(), FixedRunner::exiting(0)).await;

    let result = dispatcher
        .dispatch(&pre_tool_use(), &DispatchOptions::default())
        .await;

    assert!(result.records.is_empty());
    assert_eq!(result.summary.total, 0);
    assert!(!result.blocked);
    assert!(result.halt.is_none());
}

#[tokio::test]
async fn test_handlers_run_in_priority_order() {
    let log = call_log();
    let dispatcher = dispatcher_with(
        vec![
            logging_handler("late", HookEvent::PreToolUse, &log, Some(json!(true))).with_priority(300),
            logging_handler("early", HookEvent::PreToolUse, &log, Some(json!(true))).with_priority(10),
            logging_handler("middle", HookEvent::PreToolUse, &log, Some(json!(true))),
        ],
        FixedRunner::exiting(0),
    )
    .await;

    let result = dispatcher
        .dispatch(&pre_tool_use(), &DispatchOptions::default())
        .await;

    assert_eq!(*log.lock().unwrap(), vec!["early", "middle", "late"]);
    assert_eq!(result.summary.successful, 3);
}

#[tokio::test]
async fn test_disabled_handler_is_not_dispatched() {
    let log = call_log();
    let dispatcher = dispatcher_with(
        vec![
            logging_handler("on", HookEvent::PreToolUse, &log, Some(json!(true))),
            logging_handler("off", HookEvent::PreToolUse, &log, Some(json!(true))),
        ],
        FixedRunner::exiting(0),
    )
    .await;
    dispatcher.registry().set_enabled("off", false).await.unwrap();

    let result = dispatcher
        .dispatch(&pre_tool_use(), &DispatchOptions::default())
        .await;

    assert_eq!(*log.lock().unwrap(), vec!["on"]);
    assert_eq!(result.records.len(), 1);
    assert!(dispatcher.registry().get("off").await.is_some());
}

#[tokio::test]
async fn test_matcher_and_filter_gate_handlers() {
    let log = call_log();
    let dispatcher = dispatcher_with(
        vec![
            logging_handler("edits", HookEvent::PreToolUse, &log, Some(json!(true)))
                .with_matcher("Edit|Write"),
            logging_handler("shell", HookEvent::PreToolUse, &log, Some(json!(true)))
                .with_matcher("Bash"),
            logging_handler("installs", HookEvent::PreToolUse, &log, Some(json!(true))).with_filter(
                HookFilter {
                    commands: Some(vec!["npm install".to_string()]),
                    ..HookFilter::default()
                },
            ),
            logging_handler("any", HookEvent::PreToolUse, &log, Some(json!(true))).with_matcher("*"),
        ],
        FixedRunner::exiting(0),
    )
    .await;

    let result = dispatcher
        .dispatch(&pre_tool_use(), &DispatchOptions::default())
        .await;

    let mut ran = log.lock().unwrap().clone();
    ran.sort();
    assert_eq!(ran, vec!["any", "shell"]);
    assert_eq!(result.summary.total, 2);
    assert_eq!(result.summary.skipped, 2);
}

#[tokio::test]
async fn test_sequential_block_stops_the_batch() {
    let log = call_log();
    let dispatcher = dispatcher_with(
        vec![
            logging_handler("guard", HookEvent::PreToolUse, &log, Some(json!({ "exitCode": 2 })))
                .with_priority(1),
            logging_handler("after", HookEvent::PreToolUse, &log, Some(json!(true))).with_priority(2),
        ],
        FixedRunner::exiting(0),
    )
    .await;

    let result = dispatcher
        .dispatch(&pre_tool_use(), &DispatchOptions::default())
        .await;

    assert_eq!(*log.lock().unwrap(), vec!["guard"]);
    assert!(result.blocked);
    assert_eq!(
        result.halt,
        Some(BatchHalt::Blocked {
            handler_id: "guard".to_string()
        })
    );
}

#[tokio::test]
async fn test_blocking_exit_code_on_command_handler() {
    let runner = FixedRunner::exiting(2);
    let dispatcher = dispatcher_with(
        vec![HandlerDefinition::new(
            "deny",
            "Deny",
            vec![HookEvent::PreToolUse],
            HandlerKind::command("./deny.sh"),
        )],
        runner.clone(),
    )
    .await;

    let result = dispatcher
        .dispatch(&pre_tool_use(), &DispatchOptions::default())
        .await;

    let record = &result.records[0];
    assert_eq!(record.status, ExecutionStatus::Completed);
    assert_eq!(record.outcome.exit_code, 2);
    assert!(record.blocked);
    assert!(result.blocked);
    assert_eq!(runner.calls(), 1);
}

#[tokio::test]
async fn test_parallel_batch_settles_every_handler() {
    let log = call_log();
    let dispatcher = dispatcher_with(
        vec![
            logging_handler("fails", HookEvent::PreToolUse, &log, None),
            logging_handler("passes", HookEvent::PreToolUse, &log, Some(json!(true))),
        ],
        FixedRunner::exiting(0),
    )
    .await;

    let result = dispatcher
        .dispatch(&pre_tool_use(), &DispatchOptions::default().parallel(true))
        .await;

    assert_eq!(result.records.len(), 2);
    assert_eq!(result.summary.failed, 1);
    assert_eq!(result.summary.successful, 1);
    assert_eq!(result.summary.errors[0].handler_id, "fails");
    assert!(result.halt.is_none());
}

#[tokio::test]
async fn test_sequential_failure_halts_unless_continuing() {
    let log = call_log();
    let definitions = || {
        vec![
            logging_handler("fails", HookEvent::PreToolUse, &log, None).with_priority(1),
            logging_handler("next", HookEvent::PreToolUse, &log, Some(json!(true))).with_priority(2),
        ]
    };

    let halting = dispatcher_with(definitions(), FixedRunner::exiting(0)).await;
    let result = halting
        .dispatch(&pre_tool_use(), &DispatchOptions::default())
        .await;
    assert!(matches!(result.halt, Some(BatchHalt::Failed { ref handler_id, .. }) if handler_id == "fails"));
    assert_eq!(result.records.len(), 1);

    let continuing = dispatcher_with(definitions(), FixedRunner::exiting(0)).await;
    let result = continuing
        .dispatch(&pre_tool_use(), &DispatchOptions::default().continue_on_error(true))
        .await;
    assert!(result.halt.is_none());
    assert_eq!(result.records.len(), 2);
    assert_eq!(result.summary.failed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_invokes_handler_three_times_with_linear_backoff() {
    let log = call_log();
    let dispatcher = dispatcher_with(
        vec![logging_handler("flaky", HookEvent::PreToolUse, &log, None).with_retry(2)],
        FixedRunner::exiting(0),
    )
    .await;

    let started = tokio::time::Instant::now();
    let err = dispatcher.run_one("flaky", &pre_tool_use()).await.unwrap_err();

    assert_eq!(log.lock().unwrap().len(), 3);
    assert_eq!(started.elapsed(), Duration::from_millis(1000));
    assert!(matches!(err, HookError::HandlerExecution { attempts: 3, .. }));

    let stats = dispatcher.registry().stats("flaky").await.unwrap();
    assert_eq!(stats.execution_count, 1);
    assert_eq!(stats.failure_count, 1);
}

#[tokio::test]
async fn test_run_one_unknown_handler() {
    let dispatcher = dispatcher_with(Vec::new(), FixedRunner::exiting(0)).await;
    assert!(matches!(
        dispatcher.run_one("ghost", &pre_tool_use()).await,
        Err(HookError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_prompt_handler_outside_decision_events_skips_backend() {
    let backend = CannedBackend::answering(Ok(Decision {
        ok: false,
        reason: "no".to_string(),
    }));
    let registry = Arc::new(HookRegistry::new());
    registry
        .register(HandlerDefinition::new(
            "review",
            "Review",
            vec![HookEvent::SessionStart],
            HandlerKind::prompt("Review $ARGUMENTS"),
        ))
        .await
        .unwrap();
    let dispatcher = HookDispatcher::new(
        executor(registry, FixedRunner::exiting(0)).with_decision_backend(backend.clone()),
    );

    let result = dispatcher
        .dispatch(
            &EventContext::new(HookEvent::SessionStart, "s"),
            &DispatchOptions::default(),
        )
        .await;

    assert_eq!(backend.calls(), 0);
    assert!(result.records[0].success());
    assert!(!result.blocked);
}

#[tokio::test]
async fn test_prompt_handler_fails_open_on_backend_error() {
    let backend = CannedBackend::answering(Err(DecisionBackendError::Timeout { timeout_ms: 10 }));
    let registry = Arc::new(HookRegistry::new());
    registry
        .register(HandlerDefinition::new(
            "review",
            "Review",
            vec![HookEvent::UserPromptSubmit],
            HandlerKind::prompt("Does this leak secrets?"),
        ))
        .await
        .unwrap();
    let dispatcher = HookDispatcher::new(
        executor(registry, FixedRunner::exiting(0)).with_decision_backend(backend.clone()),
    );

    let result = dispatcher
        .dispatch(
            &EventContext::new(HookEvent::UserPromptSubmit, "s"),
            &DispatchOptions::default(),
        )
        .await;

    let record = &result.records[0];
    assert_eq!(backend.calls(), 1);
    assert!(record.success());
    assert!(!record.blocked);
    let output = record.outcome.output.as_ref().unwrap();
    assert_eq!(output["decision"], "continue");
    assert_eq!(output["failOpen"], true);
}

#[tokio::test]
async fn test_prompt_denial_blocks_permission_event() {
    let backend = CannedBackend::answering(Ok(Decision {
        ok: false,
        reason: "deletes the repository".to_string(),
    }));
    let registry = Arc::new(HookRegistry::new());
    registry
        .register(HandlerDefinition::new(
            "review",
            "Review",
            vec![HookEvent::PreToolUse],
            HandlerKind::prompt("Is this safe? $ARGUMENTS"),
        ))
        .await
        .unwrap();
    let dispatcher = HookDispatcher::new(
        executor(registry, FixedRunner::exiting(0)).with_decision_backend(backend),
    );

    let result = dispatcher
        .dispatch(
            &pre_tool_use().with_command("rm -rf .git"),
            &DispatchOptions::default(),
        )
        .await;

    assert!(result.blocked);
    let output = result.records[0].outcome.output.as_ref().unwrap();
    assert_eq!(output["decision"], "deny");
    assert_eq!(output["reason"], "deletes the repository");
}

#[tokio::test]
async fn test_summary_averages_durations() {
    let dispatcher = dispatcher_with(
        vec![HandlerDefinition::new(
            "quick",
            "Quick",
            vec![HookEvent::Stop],
            HandlerKind::command("true"),
        )],
        FixedRunner::exiting(0),
    )
    .await;

    let mut result = dispatcher
        .dispatch(&EventContext::new(HookEvent::Stop, "s"), &DispatchOptions::default())
        .await;

    let template = result.records[0].clone();
    result.records = [100, 200, 300]
        .into_iter()
        .map(|duration_ms| {
            let mut record = template.clone();
            record.duration_ms = duration_ms;
            record
        })
        .collect();
    let summary = hookrelay::BatchSummary::from_records(&result.records, 0);

    assert!((summary.average_duration_ms - 200.0).abs() < f64::EPSILON);
    assert_eq!(summary.total, 3);
}
