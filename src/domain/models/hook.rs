//! Hook definition domain models
//!
//! Lifecycle events, handler definitions with their selection rules, and the
//! event context a host hands to the dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::domain::errors::{DomainResult, HookError};
use crate::domain::ports::HookCallback;

/// Highest priority value a handler may declare.
pub const MAX_PRIORITY: u32 = 1000;

/// Lifecycle events emitted by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HookEvent {
    /// Before a tool runs
    #[serde(alias = "pre_tool_use")]
    PreToolUse,
    /// After a tool succeeded
    #[serde(alias = "post_tool_use")]
    PostToolUse,
    /// After a tool failed
    #[serde(alias = "post_tool_use_failure")]
    PostToolUseFailure,
    /// Host is asking for a permission decision
    #[serde(alias = "permission_request")]
    PermissionRequest,
    /// User submitted a prompt
    #[serde(alias = "user_prompt_submit")]
    UserPromptSubmit,
    /// Host notification
    #[serde(alias = "notification")]
    Notification,
    /// Main agent finished responding
    #[serde(alias = "stop")]
    Stop,
    /// Subagent started
    #[serde(alias = "subagent_start")]
    SubagentStart,
    /// Subagent finished
    #[serde(alias = "subagent_stop")]
    SubagentStop,
    /// Before context compaction
    #[serde(alias = "pre_compact")]
    PreCompact,
    /// Session started or resumed
    #[serde(alias = "session_start")]
    SessionStart,
    /// Session ended
    #[serde(alias = "session_end")]
    SessionEnd,
}

impl HookEvent {
    /// Every known event, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::PreToolUse,
        Self::PostToolUse,
        Self::PostToolUseFailure,
        Self::PermissionRequest,
        Self::UserPromptSubmit,
        Self::Notification,
        Self::Stop,
        Self::SubagentStart,
        Self::SubagentStop,
        Self::PreCompact,
        Self::SessionStart,
        Self::SessionEnd,
    ];

    /// Wire name of the event
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::PostToolUseFailure => "PostToolUseFailure",
            Self::PermissionRequest => "PermissionRequest",
            Self::UserPromptSubmit => "UserPromptSubmit",
            Self::Notification => "Notification",
            Self::Stop => "Stop",
            Self::SubagentStart => "SubagentStart",
            Self::SubagentStop => "SubagentStop",
            Self::PreCompact => "PreCompact",
            Self::SessionStart => "SessionStart",
            Self::SessionEnd => "SessionEnd",
        }
    }

    /// Events whose matcher target is the tool name
    pub const fn is_tool_event(self) -> bool {
        matches!(
            self,
            Self::PreToolUse
                | Self::PostToolUse
                | Self::PostToolUseFailure
                | Self::PermissionRequest
        )
    }

    /// Events on which an AI-prompt handler may render a decision
    pub const fn is_decision_event(self) -> bool {
        matches!(
            self,
            Self::PreToolUse
                | Self::PostToolUse
                | Self::PostToolUseFailure
                | Self::PermissionRequest
                | Self::UserPromptSubmit
                | Self::SubagentStop
        )
    }

    /// Decision events answered with allow/deny rather than continue/block
    pub const fn is_permission_event(self) -> bool {
        matches!(self, Self::PreToolUse | Self::PermissionRequest)
    }

    /// Metadata key holding the matcher target for non-tool events.
    ///
    /// `None` for tool events (they match on the tool name) and for events
    /// with no matcher target at all.
    pub const fn matcher_metadata_key(self) -> Option<&'static str> {
        match self {
            Self::SessionStart => Some("source"),
            Self::SessionEnd => Some("reason"),
            Self::SubagentStart | Self::SubagentStop => Some("agent_type"),
            Self::Notification => Some("type"),
            Self::PreCompact => Some("trigger"),
            _ => None,
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookEvent {
    type Err = HookError;

    /// Accepts `PreToolUse`, `pre_tool_use`, `pre-tool-use` and any casing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        Self::ALL
            .into_iter()
            .find(|event| event.as_str().to_ascii_lowercase() == wanted)
            .ok_or_else(|| HookError::UnknownEvent(s.to_string()))
    }
}

/// Fine-grained, event-agnostic predicates; every present list must match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookFilter {
    /// Tool name must be one of these
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,

    /// Command must contain at least one of these substrings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<String>>,

    /// Serialized tool input must contain at least one of these substrings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<String>>,

    /// Context user must be one of these
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<String>>,

    /// Project directory must be one of these
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<String>>,

    /// Active environment name must be one of these
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environments: Option<Vec<String>>,
}

impl HookFilter {
    /// True when no sub-condition is set
    pub fn is_empty(&self) -> bool {
        self.tools.is_none()
            && self.commands.is_none()
            && self.patterns.is_none()
            && self.users.is_none()
            && self.projects.is_none()
            && self.environments.is_none()
    }
}

/// Shared handle to an in-process callback
#[derive(Clone)]
pub struct CallbackHandle(Arc<dyn HookCallback>);

impl CallbackHandle {
    /// Wrap a callback
    pub fn new(callback: impl HookCallback + 'static) -> Self {
        Self(Arc::new(callback))
    }

    /// The wrapped callback
    pub fn callback(&self) -> &Arc<dyn HookCallback> {
        &self.0
    }
}

impl fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CallbackHandle(..)")
    }
}

/// What a handler runs when selected
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HandlerKind {
    /// Spawn a command, through `sh -c` unless `shell` is false
    Command {
        command: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        env: HashMap<String, String>,
        #[serde(default = "default_true")]
        shell: bool,
    },

    /// Resolve a script file, then spawn it
    Script {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interpreter: Option<String>,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        env: HashMap<String, String>,
    },

    /// Call a named function through the module loader
    Module {
        path: String,
        #[serde(default = "default_module_function")]
        function: String,
    },

    /// In-process callback, registered from code only
    #[serde(skip)]
    Callback(CallbackHandle),

    /// Ask the decision backend
    Prompt {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        system_prompt: Option<String>,
    },
}

fn default_true() -> bool {
    true
}

fn default_module_function() -> String {
    "default".to_string()
}

impl HandlerKind {
    /// Shell command with no extra arguments
    pub fn command(command: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
            shell: true,
        }
    }

    /// Script resolved against the project directory
    pub fn script(path: impl Into<PathBuf>) -> Self {
        Self::Script {
            path: path.into(),
            args: Vec::new(),
            interpreter: None,
            env: HashMap::new(),
        }
    }

    /// Named function of a module
    pub fn module(path: impl Into<String>, function: impl Into<String>) -> Self {
        Self::Module {
            path: path.into(),
            function: function.into(),
        }
    }

    /// In-process callback
    pub fn callback(callback: impl HookCallback + 'static) -> Self {
        Self::Callback(CallbackHandle::new(callback))
    }

    /// AI prompt using the backend's default model
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self::Prompt {
            prompt: prompt.into(),
            model: None,
            system_prompt: None,
        }
    }

    /// Variant tag, as written in hook files
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Command { .. } => "command",
            Self::Script { .. } => "script",
            Self::Module { .. } => "module",
            Self::Callback(_) => "callback",
            Self::Prompt { .. } => "prompt",
        }
    }

    /// Command and script handlers run as child processes
    pub const fn spawns_process(&self) -> bool {
        matches!(self, Self::Command { .. } | Self::Script { .. })
    }

    fn missing_field(&self) -> Option<&'static str> {
        match self {
            Self::Command { command, .. } if command.trim().is_empty() => Some("command"),
            Self::Script { path, .. } if path.as_os_str().is_empty() => Some("path"),
            Self::Module { path, .. } if path.trim().is_empty() => Some("path"),
            Self::Module { function, .. } if function.trim().is_empty() => Some("function"),
            Self::Prompt { prompt, .. } if prompt.trim().is_empty() => Some("prompt"),
            _ => None,
        }
    }
}

/// Free-form handler metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlerMetadata {
    /// Opaque scope tag (e.g. "user", "project")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Anything else the definition source attached
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Complete handler definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerDefinition {
    /// Unique identifier
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Whether this handler runs at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Events this handler applies to
    pub events: Vec<HookEvent>,

    /// Coarse regex gate on the event's target string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,

    /// Fine-grained predicates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<HookFilter>,

    /// What to run
    pub handler: HandlerKind,

    /// Execution priority (lower = earlier)
    #[serde(default = "default_priority")]
    pub priority: u32,

    /// Per-attempt timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Extra attempts after the first failure; the configured default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,

    /// Keep a sequential batch going when this handler fails hard
    #[serde(default)]
    pub continue_on_error: bool,

    /// Exit codes that ask the host to abort its action; the configured
    /// default when unset. An empty list never blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code_blocking: Option<Vec<i32>>,

    /// Free-form metadata
    #[serde(default)]
    pub metadata: HandlerMetadata,
}

const fn default_priority() -> u32 {
    100
}

impl HandlerDefinition {
    /// Create an enabled handler with default priority, retry and blocking codes
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        events: Vec<HookEvent>,
        handler: HandlerKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enabled: true,
            events,
            matcher: None,
            filter: None,
            handler,
            priority: default_priority(),
            timeout_ms: None,
            retry: None,
            continue_on_error: false,
            exit_code_blocking: None,
            metadata: HandlerMetadata::default(),
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_matcher(mut self, matcher: impl Into<String>) -> Self {
        self.matcher = Some(matcher.into());
        self
    }

    pub fn with_filter(mut self, filter: HookFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    pub fn with_exit_code_blocking(mut self, codes: Vec<i32>) -> Self {
        self.exit_code_blocking = Some(codes);
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.metadata.scope = Some(scope.into());
        self
    }

    /// Same handler, disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Check the structural invariants a registry relies on
    pub fn validate(&self) -> DomainResult<()> {
        let invalid = |reason: String| {
            Err(HookError::Validation {
                id: self.id.clone(),
                reason,
            })
        };

        if self.id.trim().is_empty() {
            return invalid("id is required".to_string());
        }
        if self.name.trim().is_empty() {
            return invalid("name is required".to_string());
        }
        if self.events.is_empty() {
            return invalid("at least one event is required".to_string());
        }
        if self.priority > MAX_PRIORITY {
            return invalid(format!(
                "priority {} is out of range 0..={MAX_PRIORITY}",
                self.priority
            ));
        }
        if let Some(field) = self.handler.missing_field() {
            return invalid(format!(
                "{} handler requires a non-empty `{field}`",
                self.handler.kind_name()
            ));
        }

        Ok(())
    }

    /// Collapse duplicate events, keeping first occurrence order
    pub(crate) fn dedup_events(&mut self) {
        let mut seen = Vec::with_capacity(self.events.len());
        self.events.retain(|event| {
            if seen.contains(event) {
                false
            } else {
                seen.push(*event);
                true
            }
        });
    }
}

/// Environment variables consulted, in order, for the active environment name
const ENVIRONMENT_NAME_KEYS: [&str; 3] = ["HOOKRELAY_ENV", "ENVIRONMENT", "NODE_ENV"];

/// Everything a handler may look at for one event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventContext {
    /// Event being dispatched
    pub event: HookEvent,

    /// When the host emitted the event
    pub timestamp: DateTime<Utc>,

    /// Host session identifier
    #[serde(default)]
    pub session_id: String,

    /// Tool involved, for tool events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// Shell command involved, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Tool input payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<Value>,

    /// Tool output payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_output: Option<Value>,

    /// Event-specific fields (source, reason, agent_type, ...)
    #[serde(default)]
    pub metadata: HashMap<String, Value>,

    /// Process environment visible to handlers. Never serialized.
    #[serde(skip)]
    pub environment: HashMap<String, String>,

    /// Project root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_dir: Option<PathBuf>,
}

impl EventContext {
    /// Empty context for an event, timestamped now
    pub fn new(event: HookEvent, session_id: impl Into<String>) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
            session_id: session_id.into(),
            tool_name: None,
            command: None,
            tool_input: None,
            tool_output: None,
            metadata: HashMap::new(),
            environment: HashMap::new(),
            project_dir: None,
        }
    }

    /// Build a context from the JSON payload a host writes for an event.
    ///
    /// Known fields (`session_id`, `tool_name`, `tool_input`,
    /// `tool_response`/`tool_output`, `cwd`/`project_dir`, `command`) are
    /// lifted into typed fields; everything else lands in `metadata`. When no
    /// explicit command is given, `tool_input.command` is used.
    pub fn from_host_payload(event: HookEvent, payload: Value) -> Self {
        let mut fields = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let take_string = |fields: &mut Map<String, Value>, key: &str| match fields.remove(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };

        let session_id = take_string(&mut fields, "session_id").unwrap_or_default();
        let tool_name = take_string(&mut fields, "tool_name");
        let tool_input = fields.remove("tool_input");
        let tool_output = fields
            .remove("tool_response")
            .or_else(|| fields.remove("tool_output"));
        let project_dir = take_string(&mut fields, "cwd")
            .or_else(|| take_string(&mut fields, "project_dir"))
            .map(PathBuf::from);
        let command = take_string(&mut fields, "command").or_else(|| {
            tool_input
                .as_ref()
                .and_then(|input| input.get("command"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        fields.remove("hook_event_name");

        Self {
            event,
            timestamp: Utc::now(),
            session_id,
            tool_name,
            command,
            tool_input,
            tool_output,
            metadata: fields.into_iter().collect(),
            environment: HashMap::new(),
            project_dir,
        }
    }

    pub fn with_tool(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_tool_input(mut self, input: Value) -> Self {
        self.tool_input = Some(input);
        self
    }

    pub fn with_tool_output(mut self, output: Value) -> Self {
        self.tool_output = Some(output);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(dir.into());
        self
    }

    /// String-valued metadata entry
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// The string a non-wildcard matcher is evaluated against
    pub fn matcher_target(&self) -> Option<&str> {
        if self.event.is_tool_event() {
            return self.tool_name.as_deref();
        }
        self.event
            .matcher_metadata_key()
            .and_then(|key| self.metadata_str(key))
    }

    /// User the event belongs to: `metadata.user`, else `$USER`/`$USERNAME`
    pub fn user(&self) -> Option<&str> {
        self.metadata_str("user").or_else(|| {
            self.environment
                .get("USER")
                .or_else(|| self.environment.get("USERNAME"))
                .map(String::as_str)
        })
    }

    /// Active environment name: `metadata.environment`, else the first of
    /// `HOOKRELAY_ENV`, `ENVIRONMENT`, `NODE_ENV` present in the environment
    pub fn active_environment(&self) -> Option<&str> {
        self.metadata_str("environment").or_else(|| {
            ENVIRONMENT_NAME_KEYS
                .iter()
                .find_map(|key| self.environment.get(*key))
                .map(String::as_str)
        })
    }

    /// Tool input serialized as JSON (`null` when absent)
    pub fn input_json(&self) -> String {
        self.tool_input
            .as_ref()
            .map_or_else(|| "null".to_string(), Value::to_string)
    }

    /// Whole context serialized as JSON
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
