//! Core types shared across PatchVault facilities
//!
//! This crate provides foundational types used by the error and logging
//! facilities as well as the engine:
//!
//! - **Correlation types**: RunId, QueryId
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::{QueryId, RunId};
