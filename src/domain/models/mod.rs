pub mod config;
pub mod execution;
pub mod hook;

pub use config::{Config, DecisionBackendConfig, ExecutionDefaults, LoggingConfig};
pub use execution::{
    BatchError, BatchHalt, BatchResult, BatchSummary, DispatchOptions, ErrorEntry,
    ExecutionOutcome, ExecutionRecord, ExecutionStatus, HandlerStats, MAX_ERROR_HISTORY,
};
pub use hook::{
    CallbackHandle, EventContext, HandlerDefinition, HandlerKind, HandlerMetadata, HookEvent,
    HookFilter, MAX_PRIORITY,
};
