//! Handler selection: the coarse matcher gate, then the fine-grained filter.

use regex::Regex;
use tracing::trace;

use crate::domain::models::{EventContext, HandlerDefinition, HookFilter};

/// Matchers that accept every event
const WILDCARD_MATCHERS: [&str; 3] = ["*", "", ".*"];

/// Result of running a handler through selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Both gates passed
    Selected,
    /// Handler is disabled; neither gate was consulted
    Disabled,
    /// Matcher rejected the event
    NoMatch,
    /// Filter rejected the event
    NoFilter,
}

/// Decide whether a handler applies to an event
pub fn select(definition: &HandlerDefinition, context: &EventContext) -> Selection {
    if !definition.enabled {
        return Selection::Disabled;
    }
    if !matcher_passes(definition.matcher.as_deref(), context) {
        trace!(handler_id = %definition.id, "Matcher rejected event");
        return Selection::NoMatch;
    }
    if !filter_passes(definition.filter.as_ref(), context) {
        trace!(handler_id = %definition.id, "Filter rejected event");
        return Selection::NoFilter;
    }
    Selection::Selected
}

/// True when the matcher is absent or one of `*`, `""`, `.*`
pub fn is_wildcard(matcher: Option<&str>) -> bool {
    matcher.is_none_or(|m| WILDCARD_MATCHERS.contains(&m))
}

/// Coarse gate: anchored regex against the event's target string.
///
/// Events without a target (and contexts missing it) fail any non-wildcard
/// matcher. A pattern that does not compile is compared literally.
pub fn matcher_passes(matcher: Option<&str>, context: &EventContext) -> bool {
    if is_wildcard(matcher) {
        return true;
    }
    let Some(pattern) = matcher else {
        return true;
    };
    let Some(target) = context.matcher_target() else {
        return false;
    };

    pattern_matches(pattern, target)
}

fn pattern_matches(pattern: &str, target: &str) -> bool {
    match Regex::new(&format!("^(?:{pattern})$")) {
        Ok(regex) => regex.is_match(target),
        Err(_) => pattern == target,
    }
}

/// Fine-grained gate; every present sub-condition must hold
pub fn filter_passes(filter: Option<&HookFilter>, context: &EventContext) -> bool {
    let Some(filter) = filter else {
        return true;
    };

    if let Some(tools) = &filter.tools {
        if !contains_exact(tools, context.tool_name.as_deref()) {
            return false;
        }
    }

    if let Some(commands) = &filter.commands {
        let Some(command) = context.command.as_deref() else {
            return false;
        };
        if !commands.iter().any(|needle| command.contains(needle.as_str())) {
            return false;
        }
    }

    if let Some(patterns) = &filter.patterns {
        let input = context.input_json();
        if !patterns.iter().any(|needle| input.contains(needle.as_str())) {
            return false;
        }
    }

    if let Some(users) = &filter.users {
        if !contains_exact(users, context.user()) {
            return false;
        }
    }

    if let Some(projects) = &filter.projects {
        let project = context
            .project_dir
            .as_ref()
            .map(|dir| dir.to_string_lossy().into_owned());
        if !contains_exact(projects, project.as_deref()) {
            return false;
        }
    }

    if let Some(environments) = &filter.environments {
        if !contains_exact(environments, context.active_environment()) {
            return false;
        }
    }

    true
}

fn contains_exact(allowed: &[String], value: Option<&str>) -> bool {
    value.is_some_and(|v| allowed.iter().any(|a| a == v))
}
