//! SQLite implementation of the patch store contract

mod hydration;
mod sqlite_store;

pub use sqlite_store::SqlitePatchStore;
