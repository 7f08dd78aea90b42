//! Batch orchestration engine: replays a validated container seed against a
//! remote workspace as one ordered, reference-resolving run.
//!
//! - `orchestrator` drives the fixed phase sequence (workspace, variables,
//!   triggers, tags) and owns the trigger name→id map
//! - `result` holds the per-item outcome accumulation and aggregate status
//! - `report` formats a finished run for humans

pub mod orchestrator;
pub mod report;
pub mod result;

pub use orchestrator::{FatalError, RunOptions, RunPhase, WorkspaceApi, filter_by_type, generate_workspace_name, run};
pub use result::{ExecutionResult, ItemOutcome, ItemResult, RunStatus, Tally};
