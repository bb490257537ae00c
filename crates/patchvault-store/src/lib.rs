//! PatchVault Store - SQLite persistence for the patch store contract
//!
//! Provides:
//! - SQLite schema with an embedded, checksummed migration framework
//! - [`SqlitePatchStore`], the on-disk implementation of
//!   [`patchvault_core::store::PatchStore`]

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

// Re-export key types
pub use errors::Result;
pub use repo::SqlitePatchStore;
