//! Patch diff engine.
//!
//! Compares two stored patches of the same synth and produces ordered,
//! field-level entries, layer by layer for layered patches.
//!
//! ## Entry point
//!
//! ```ignore
//! use patchvault_core::diff::{compute_diff, render_human_summary, DiffMode};
//!
//! let diff = compute_diff(&variant, &a, &b, DiffMode::IgnoreNames);
//! println!("{}", render_human_summary(&diff));
//! ```

pub mod engine;
pub mod human_summary;
pub mod model;

pub use engine::compute_diff;
pub use human_summary::render_human_summary;
pub use model::{DiffEntry, DiffField, DiffMode, LayerDiff, PatchDiff};
