//! Decision backend adapters

pub mod anthropic;
pub mod types;

pub use anthropic::AnthropicDecisionBackend;
