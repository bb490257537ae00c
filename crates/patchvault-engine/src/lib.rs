//! PatchVault Engine - orchestration layer
//!
//! Coordinates the core pipeline, the SQLite store and the transport for an
//! interactive session: background ingestion, tagged page queries, patch
//! selection and the command/query surface used by the CLI.

pub mod capture;
pub mod commands;
pub mod engine;
pub mod file_import;
pub mod registry;
pub mod tasks;

pub use engine::{Detection, Engine, DEFAULT_CAPTURE_TIMEOUT};
pub use registry::VariantRegistry;
