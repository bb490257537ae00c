//! Schema migrations for the patch library

mod catalog;
mod runner;

pub use catalog::{latest_id, Migration, MIGRATIONS};
pub use runner::{applied_migrations, apply_migrations};
