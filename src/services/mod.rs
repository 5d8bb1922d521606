//! Dispatch engine services
//!
//! - [`HookRegistry`]: handler storage, event indexes and statistics
//! - [`hook_selector`]: matcher and filter gates
//! - [`HookExecutor`]: per-handler supervision (retry, timeout, blocking)
//! - [`BatchRunner`]: sequential and parallel batches
//! - [`PromptEvaluator`]: fail-open decision backend adapter
//! - [`HookDispatcher`]: the public dispatch API

pub mod batch_runner;
pub mod hook_dispatcher;
pub mod hook_executor;
pub mod hook_registry;
pub mod hook_selector;
pub mod prompt_evaluator;

pub use batch_runner::BatchRunner;
pub use hook_dispatcher::HookDispatcher;
pub use hook_executor::{EffectiveOptions, HookExecutor};
pub use hook_registry::HookRegistry;
pub use hook_selector::Selection;
pub use prompt_evaluator::PromptEvaluator;
