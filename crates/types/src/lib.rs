//! Shared type definitions for the tagforge pipeline.
//!
//! The models here describe the canonical in-memory form of a container seed
//! file: three ordered resource lists (variables, triggers, tags) whose
//! cross-references are still expressed by *name*. Identifier assignment only
//! happens once the batch orchestrator replays the seed against the remote
//! workspace API.

pub mod seed;

pub use seed::validation::{ValidationError, ValidationFailure, validate_seed};
pub use seed::{ContainerSeed, Parameter, ResourceKind, TagSpec, TriggerFilter, TriggerSpec, VariableSpec};
