//! orderhist runner: task handlers, extraction coordinator, configuration,
//! and report export.
//!
//! Task handlers mirror the `{statusCode, body}` contract: a fetch task
//! persists per-symbol artifacts, an aggregate task merges them into one
//! report, and the coordinator runs both for a whole symbol list.

pub mod config;
pub mod context;
pub mod coordinator;
pub mod export;
pub mod request;
pub mod response;
pub mod tasks;

pub use config::{credentials_from_env, ConfigError, PipelineConfig};
pub use context::TaskContext;
pub use coordinator::{
    Coordinator, ExecutionSummary, LogProgress, SymbolResult, TaskProgress, TaskStatus,
};
pub use export::{export_report_csv, load_report, write_csv};
pub use request::{AggregateRequest, ExtractRequest, FetchRequest, ValidationError};
pub use response::TaskResponse;
pub use tasks::{
    execute_aggregate, execute_fetch, run_aggregate_task, run_fetch_task, run_health_check,
    AggregateOutput, FetchOutput, TaskError,
};
