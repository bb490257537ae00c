//! Command orchestration layer.
//!
//! Commands start imports and change stored state; queries only read.

pub mod engine_command;
pub mod engine_query;

pub use engine_command::{apply_engine_command, EngineCommand, EngineCommandResult};
pub use engine_query::{
    apply_engine_query, resolve_patch, EngineQuery, EngineQueryResult, PatchDiffResult, SynthInfo,
};
