//! Hook Executor Service
//!
//! Runs one handler to completion: selection, the retry loop with linear
//! backoff and per-attempt timeouts, variant normalization and blocking.

use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainResult, HookError};
use crate::domain::models::{
    DispatchOptions, EventContext, ExecutionDefaults, ExecutionOutcome, ExecutionRecord,
    ExecutionStatus, HandlerDefinition, HandlerKind,
};
use crate::domain::ports::{
    CommandRunner, CommandSpec, DecisionBackend, ExecutionSink, ModuleLoader, NullExecutionSink,
};
use crate::services::hook_registry::HookRegistry;
use crate::services::hook_selector::{self, Selection};
use crate::services::prompt_evaluator::PromptEvaluator;

/// Slack past the attempt timeout before a process attempt is abandoned
const PROCESS_TIMEOUT_GRACE: Duration = Duration::from_millis(500);

/// Options for one invocation, resolved as call override > handler > default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveOptions {
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Attempts after the first
    pub retries: u32,
    /// Exit codes that mark the record as blocking
    pub blocking_codes: Vec<i32>,
    /// Linear backoff step
    pub backoff_step: Duration,
}

impl EffectiveOptions {
    pub fn resolve(
        definition: &HandlerDefinition,
        options: &DispatchOptions,
        defaults: &ExecutionDefaults,
    ) -> Self {
        let timeout_ms = options
            .timeout_override_ms
            .or(definition.timeout_ms)
            .unwrap_or(defaults.timeout_ms);

        let retries = options
            .retry_override
            .or(definition.retry)
            .unwrap_or(defaults.retry);

        let blocking_codes = definition
            .exit_code_blocking
            .clone()
            .unwrap_or_else(|| defaults.blocking_exit_codes.clone());

        Self {
            timeout: Duration::from_millis(timeout_ms),
            retries,
            blocking_codes,
            backoff_step: Duration::from_millis(defaults.backoff_step_ms),
        }
    }

    /// Sleep before the retry that follows failed attempt `attempt` (0-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

/// Executor for hook handlers
pub struct HookExecutor {
    registry: Arc<HookRegistry>,
    commands: Arc<dyn CommandRunner>,
    modules: Arc<dyn ModuleLoader>,
    prompts: PromptEvaluator,
    sink: Arc<dyn ExecutionSink>,
    defaults: ExecutionDefaults,
}

impl HookExecutor {
    /// Create an executor with no decision backend and no execution sink
    pub fn new(
        registry: Arc<HookRegistry>,
        commands: Arc<dyn CommandRunner>,
        modules: Arc<dyn ModuleLoader>,
        defaults: ExecutionDefaults,
    ) -> Self {
        Self {
            registry,
            commands,
            modules,
            prompts: PromptEvaluator::disabled(),
            sink: Arc::new(NullExecutionSink),
            defaults,
        }
    }

    /// Decision backend used by prompt handlers
    pub fn with_decision_backend(mut self, backend: Arc<dyn DecisionBackend>) -> Self {
        self.prompts = PromptEvaluator::new(backend);
        self
    }

    /// Side channel receiving every record this executor produces
    pub fn with_sink(mut self, sink: Arc<dyn ExecutionSink>) -> Self {
        self.sink = sink;
        self
    }

    pub const fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    pub const fn defaults(&self) -> &ExecutionDefaults {
        &self.defaults
    }

    /// Execute a handler, surfacing exhausted retries as
    /// [`HookError::HandlerExecution`]
    pub async fn execute(
        &self,
        definition: &HandlerDefinition,
        context: &EventContext,
        options: &DispatchOptions,
    ) -> DomainResult<ExecutionRecord> {
        let record = self.execute_recorded(definition, context, options).await;
        if record.status == ExecutionStatus::FailedExhausted {
            return Err(HookError::HandlerExecution {
                handler_id: record.handler_id,
                attempts: record.attempts,
                message: record.outcome.error.unwrap_or_default(),
            });
        }
        Ok(record)
    }

    /// Execute a handler; exhausted retries come back as a
    /// `FailedExhausted` record instead of an error
    #[instrument(skip_all, fields(handler_id = %definition.id, event = %context.event))]
    pub async fn execute_recorded(
        &self,
        definition: &HandlerDefinition,
        context: &EventContext,
        options: &DispatchOptions,
    ) -> ExecutionRecord {
        let started_at = Utc::now();
        let clock = Instant::now();

        let skipped = match hook_selector::select(definition, context) {
            Selection::Selected => None,
            Selection::Disabled => Some(ExecutionStatus::SkippedDisabled),
            Selection::NoMatch => Some(ExecutionStatus::SkippedNoMatch),
            Selection::NoFilter => Some(ExecutionStatus::SkippedNoFilter),
        };
        if let Some(status) = skipped {
            let record = ExecutionRecord {
                execution_id: Uuid::new_v4(),
                handler_id: definition.id.clone(),
                handler_name: definition.name.clone(),
                event: context.event,
                status,
                attempts: 0,
                started_at,
                finished_at: started_at,
                duration_ms: 0,
                outcome: ExecutionOutcome::succeeded(),
                blocked: false,
            };
            self.sink.record(&record);
            return record;
        }

        let effective = EffectiveOptions::resolve(definition, options, &self.defaults);
        let (status, attempts, outcome) = self.attempt_loop(definition, context, &effective).await;

        let blocked = status == ExecutionStatus::Completed
            && effective.blocking_codes.contains(&outcome.exit_code);
        let duration_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);

        let record = ExecutionRecord {
            execution_id: Uuid::new_v4(),
            handler_id: definition.id.clone(),
            handler_name: definition.name.clone(),
            event: context.event,
            status,
            attempts,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
            outcome,
            blocked,
        };

        self.registry
            .record_outcome(&definition.id, duration_ms, record.success(), blocked)
            .await;
        if !record.success() {
            let message = record
                .outcome
                .error
                .clone()
                .unwrap_or_else(|| format!("exited with code {}", record.outcome.exit_code));
            self.registry.record_error(&definition.id, &message).await;
        }

        if blocked {
            info!(exit_code = record.outcome.exit_code, "Handler blocked the host action");
        }
        self.sink.record(&record);
        record
    }

    /// Record for a handler whose task died before producing one
    pub async fn record_aborted(
        &self,
        definition: &HandlerDefinition,
        context: &EventContext,
        message: String,
    ) -> ExecutionRecord {
        let now = Utc::now();
        warn!(handler_id = %definition.id, error = %message, "Handler task aborted");
        self.registry.record_outcome(&definition.id, 0, false, false).await;
        self.registry.record_error(&definition.id, &message).await;

        let record = ExecutionRecord {
            execution_id: Uuid::new_v4(),
            handler_id: definition.id.clone(),
            handler_name: definition.name.clone(),
            event: context.event,
            status: ExecutionStatus::FailedExhausted,
            attempts: 1,
            started_at: now,
            finished_at: now,
            duration_ms: 0,
            outcome: ExecutionOutcome::failed(1, message),
            blocked: false,
        };
        self.sink.record(&record);
        record
    }

    async fn attempt_loop(
        &self,
        definition: &HandlerDefinition,
        context: &EventContext,
        effective: &EffectiveOptions,
    ) -> (ExecutionStatus, u32, ExecutionOutcome) {
        let mut attempt: u32 = 0;
        loop {
            debug!(attempt = attempt + 1, "Running handler attempt");

            // Process handlers get a grace period so the runner's own timeout
            // fires first and reaps the whole process group
            let deadline = if definition.handler.spawns_process() {
                effective.timeout + PROCESS_TIMEOUT_GRACE
            } else {
                effective.timeout
            };
            let result =
                tokio::time::timeout(deadline, self.invoke(definition, context, effective.timeout))
                    .await
                    .unwrap_or_else(|_| {
                        Err(format!(
                            "timed out after {}ms",
                            effective.timeout.as_millis()
                        ))
                    });

            let error = match result {
                Ok(outcome) => return (ExecutionStatus::Completed, attempt + 1, outcome),
                Err(error) => error,
            };

            if attempt >= effective.retries {
                warn!(attempts = attempt + 1, error = %error, "Handler exhausted its attempts");
                return (
                    ExecutionStatus::FailedExhausted,
                    attempt + 1,
                    ExecutionOutcome::failed(1, error),
                );
            }

            let delay = effective.backoff_for(attempt);
            debug!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis(),
                error = %error,
                "Handler attempt failed, retrying"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    /// One attempt of the handler body; `Err` is an attempt error
    async fn invoke(
        &self,
        definition: &HandlerDefinition,
        context: &EventContext,
        timeout: Duration,
    ) -> Result<ExecutionOutcome, String> {
        match &definition.handler {
            HandlerKind::Command {
                command,
                args,
                cwd,
                env,
                shell,
            } => {
                let (program, argv) = if *shell {
                    let mut argv = vec!["-c".to_string(), command.clone()];
                    if !args.is_empty() {
                        argv.push("hookrelay".to_string());
                        argv.extend(args.iter().cloned());
                    }
                    ("sh".to_string(), argv)
                } else {
                    (command.clone(), args.clone())
                };
                let spec = process_spec(program, argv, cwd.as_deref(), env, context, timeout);
                self.run_process(spec).await
            }

            HandlerKind::Script {
                path,
                args,
                interpreter,
                env,
            } => {
                let resolved = resolve_script_path(path, context.project_dir.as_deref());
                if tokio::fs::metadata(&resolved).await.is_err() {
                    return Err(format!("script not found: {}", resolved.display()));
                }
                let script = resolved.to_string_lossy().into_owned();

                let (program, argv) =
                    match interpreter.clone().or_else(|| interpreter_for(&resolved)) {
                        Some(interpreter) => {
                            let mut argv = vec![script];
                            argv.extend(args.iter().cloned());
                            (interpreter, argv)
                        }
                        None => (script, args.clone()),
                    };
                let spec = process_spec(program, argv, None, env, context, timeout);
                self.run_process(spec).await
            }

            HandlerKind::Module { path, function } => self
                .modules
                .invoke(path, function, context)
                .await
                .map(ExecutionOutcome::from_value)
                .map_err(|e| e.to_string()),

            HandlerKind::Callback(handle) => handle
                .callback()
                .call(context)
                .await
                .map(ExecutionOutcome::from_value)
                .map_err(|e| format!("{e:#}")),

            HandlerKind::Prompt {
                prompt,
                model,
                system_prompt,
            } => Ok(self
                .prompts
                .evaluate(prompt, model.as_deref(), system_prompt.as_deref(), context)
                .await),
        }
    }

    async fn run_process(&self, spec: CommandSpec) -> Result<ExecutionOutcome, String> {
        let output = self.commands.run(spec).await.map_err(|e| e.to_string())?;
        Ok(ExecutionOutcome::from_process(
            output.exit_code,
            output.stdout,
            output.stderr,
        ))
    }
}

fn process_spec(
    program: String,
    args: Vec<String>,
    cwd: Option<&Path>,
    env: &HashMap<String, String>,
    context: &EventContext,
    timeout: Duration,
) -> CommandSpec {
    let mut merged = context.environment.clone();
    merged.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged.insert("HOOKRELAY_EVENT".to_string(), context.event.to_string());
    merged.insert("HOOKRELAY_SESSION_ID".to_string(), context.session_id.clone());
    if let Some(dir) = &context.project_dir {
        merged.insert(
            "HOOKRELAY_PROJECT_DIR".to_string(),
            dir.to_string_lossy().into_owned(),
        );
    }

    CommandSpec {
        program,
        args,
        cwd: cwd
            .map(Path::to_path_buf)
            .or_else(|| context.project_dir.clone()),
        env: merged,
        stdin: Some(context.to_json_string()),
        timeout,
    }
}

/// Absolute paths as-is; relative ones against the project directory when known
fn resolve_script_path(path: &Path, project_dir: Option<&Path>) -> PathBuf {
    match project_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

fn interpreter_for(path: &Path) -> Option<String> {
    let interpreter = match path.extension()?.to_str()? {
        "sh" => "sh",
        "py" => "python3",
        "js" | "mjs" => "node",
        "rb" => "ruby",
        _ => return None,
    };
    Some(interpreter.to_string())
}
