//! Background work
//!
//! Ingestion runs on its own thread and reports over a `flume` channel; page
//! queries run on short-lived threads and answer with a [`QueryTag`] so that
//! the session can drop stale pages.
//!
//! [`QueryTag`]: patchvault_core::context::QueryTag

pub mod ingest;
pub mod query;

pub use ingest::{spawn_ingest, IngestEvent, IngestHandle, IngestRequest, ItemSource};
pub use query::{spawn_page_query, Page, PageRequest, PageResult};
