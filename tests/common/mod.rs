//! Fake ports shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use hookrelay::domain::ports::{
    CommandError, CommandOutput, CommandRunner, CommandSpec, Decision, DecisionBackend,
    DecisionBackendError, DecisionRequest, ModuleError, ModuleLoader,
};
use hookrelay::{
    EventContext, ExecutionDefaults, HandlerDefinition, HandlerKind, HookDispatcher, HookEvent,
    HookExecutor, HookRegistry,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Command runner answering every spawn with a fixed result
pub struct FixedRunner {
    pub exit_code: i32,
    pub calls: AtomicUsize,
}

impl FixedRunner {
    pub fn exiting(exit_code: i32) -> Arc<Self> {
        Arc::new(Self {
            exit_code,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandRunner for FixedRunner {
    async fn run(&self, _spec: CommandSpec) -> Result<CommandOutput, CommandError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CommandOutput {
            exit_code: self.exit_code,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

pub struct NoModules;

#[async_trait]
impl ModuleLoader for NoModules {
    async fn invoke(&self, path: &str, function: &str, _: &EventContext) -> Result<Value, ModuleError> {
        Err(ModuleError::NotFound {
            path: path.to_string(),
            function: function.to_string(),
        })
    }
}

/// Decision backend returning a canned answer and counting calls
pub struct CannedBackend {
    pub answer: Result<Decision, DecisionBackendError>,
    pub calls: AtomicUsize,
}

impl CannedBackend {
    pub fn answering(answer: Result<Decision, DecisionBackendError>) -> Arc<Self> {
        Arc::new(Self {
            answer,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecisionBackend for CannedBackend {
    async fn complete(&self, _request: &DecisionRequest) -> Result<Decision, DecisionBackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

/// Shared log of which callbacks ran, in order
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Callback handler that logs its id, then returns `value` or fails when `None`
pub fn logging_handler(
    id: &str,
    event: HookEvent,
    log: &CallLog,
    value: Option<Value>,
) -> HandlerDefinition {
    let log = log.clone();
    let name = id.to_string();
    HandlerDefinition::new(
        id,
        id,
        vec![event],
        HandlerKind::callback(move |_ctx: EventContext| {
            let log = log.clone();
            let name = name.clone();
            let value = value.clone();
            async move {
                log.lock().unwrap().push(name);
                value.ok_or_else(|| anyhow::anyhow!("handler failed"))
            }
        }),
    )
}

pub fn executor(registry: Arc<HookRegistry>, runner: Arc<dyn CommandRunner>) -> HookExecutor {
    HookExecutor::new(
        registry,
        runner,
        Arc::new(NoModules),
        ExecutionDefaults::default(),
    )
}

/// Dispatcher over fakes with every definition registered
pub async fn dispatcher_with(
    definitions: Vec<HandlerDefinition>,
    runner: Arc<dyn CommandRunner>,
) -> HookDispatcher {
    let registry = Arc::new(HookRegistry::new());
    registry.register_all(definitions).await.unwrap();
    HookDispatcher::new(executor(registry, runner))
}
