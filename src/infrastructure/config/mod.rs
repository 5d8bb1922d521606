//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading
//! - Environment variable overrides
//! - Configuration validation
//!
//! Plus the hooks files that carry handler definitions.

pub mod hooks_file;
pub mod loader;

pub use hooks_file::{load_hook_files, load_hooks_file, HooksFile};
pub use loader::{ConfigError, ConfigLoader};
