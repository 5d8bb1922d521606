//! Fail-open adapter between prompt handlers and the decision backend.

use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::models::{EventContext, ExecutionOutcome, HookEvent};
use crate::domain::ports::{Decision, DecisionBackend, DecisionRequest};

/// Placeholder in a prompt template replaced by the event context JSON
pub const ARGUMENTS_PLACEHOLDER: &str = "$ARGUMENTS";

/// Exit code carried by deny/block decisions
pub const DECISION_BLOCK_EXIT_CODE: i32 = 2;

/// Runs prompt handlers against an optional decision backend.
///
/// Never fails: backend errors (and a missing backend) turn into an
/// allow/continue outcome flagged with `failOpen`.
#[derive(Clone, Default)]
pub struct PromptEvaluator {
    backend: Option<Arc<dyn DecisionBackend>>,
}

impl PromptEvaluator {
    pub fn new(backend: Arc<dyn DecisionBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Evaluator without a backend; every decision event fails open
    pub const fn disabled() -> Self {
        Self { backend: None }
    }

    pub const fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Evaluate a prompt handler for one event
    pub async fn evaluate(
        &self,
        prompt: &str,
        model: Option<&str>,
        system_prompt: Option<&str>,
        context: &EventContext,
    ) -> ExecutionOutcome {
        if !context.event.is_decision_event() {
            debug!(event = %context.event, "Prompt handler ignored for non-decision event");
            return ExecutionOutcome::succeeded();
        }

        let Some(backend) = &self.backend else {
            return fail_open(context.event, "no decision backend configured");
        };

        let request = DecisionRequest {
            prompt: render_prompt(prompt, context),
            model: model.map(str::to_string),
            system_prompt: system_prompt.map(str::to_string),
        };

        match backend.complete(&request).await {
            Ok(decision) => decision_outcome(context.event, &decision),
            Err(e) => {
                warn!(event = %context.event, error = %e, "Decision backend failed, failing open");
                fail_open(context.event, &e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for PromptEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptEvaluator")
            .field("has_backend", &self.has_backend())
            .finish()
    }
}

/// Substitute the context JSON for `$ARGUMENTS`, or append it after a blank line
pub fn render_prompt(template: &str, context: &EventContext) -> String {
    let arguments = context.to_json_string();
    if template.contains(ARGUMENTS_PLACEHOLDER) {
        template.replace(ARGUMENTS_PLACEHOLDER, &arguments)
    } else {
        format!("{template}\n\n{arguments}")
    }
}

const fn decision_words(event: HookEvent) -> (&'static str, &'static str) {
    if event.is_permission_event() {
        ("allow", "deny")
    } else {
        ("continue", "block")
    }
}

fn decision_outcome(event: HookEvent, decision: &Decision) -> ExecutionOutcome {
    let (proceed, stop) = decision_words(event);
    let (word, exit_code) = if decision.ok {
        (proceed, 0)
    } else {
        (stop, DECISION_BLOCK_EXIT_CODE)
    };

    ExecutionOutcome {
        exit_code,
        ..ExecutionOutcome::succeeded()
    }
    .with_output(json!({ "decision": word, "reason": decision.reason }))
}

fn fail_open(event: HookEvent, reason: &str) -> ExecutionOutcome {
    let (proceed, _) = decision_words(event);
    ExecutionOutcome::succeeded().with_output(json!({
        "decision": proceed,
        "reason": reason,
        "failOpen": true,
    }))
}
