//! Structured logging facility for PatchVault
//!
//! This module provides:
//! - Single initialization point via `init(profile)`
//! - Operation macros (`log_op_start!`, `log_op_end!`, `log_op_error!`) and
//!   patch-run records (`log_item_failed!`, `log_run_aborted!`,
//!   `log_capability_fallback!`)
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use patchvault_core::logging_facility::{init, Profile};
//!
//! // Initialize once at application startup
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CaptureLayer, CapturedEvent, TestCapture};
