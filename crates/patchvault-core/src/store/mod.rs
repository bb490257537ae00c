//! Store adapter
//!
//! The contract the core consumes for persistent patch storage. The core
//! ships only the in-memory implementation; the SQLite engine lives in the
//! `patchvault-store` crate.

pub mod memory;

pub use memory::MemoryStore;

use crate::errors::ExError;
use crate::model::{Fingerprint, PatchHolder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Selection criteria for counting and paging
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchFilter {
    pub variant: String,
    /// Import source id
    pub import_source: Option<String>,
    pub favorites_only: bool,
}

impl PatchFilter {
    pub fn for_variant(variant: impl Into<String>) -> Self {
        Self {
            variant: variant.into(),
            ..Self::default()
        }
    }

    pub fn with_import_source(mut self, source_id: impl Into<String>) -> Self {
        self.import_source = Some(source_id.into());
        self
    }

    pub fn favorites_only(mut self) -> Self {
        self.favorites_only = true;
        self
    }

    pub fn matches(&self, holder: &PatchHolder) -> bool {
        holder.variant() == self.variant
            && self
                .import_source
                .as_deref()
                .map_or(true, |id| holder.source().id == id)
            && (!self.favorites_only || holder.favorite)
    }
}

/// Persistent patch storage
///
/// Ordering of `paged_fetch` is insertion order and stays stable while the
/// store is not modified. `upsert_batch` is all-or-nothing.
pub trait PatchStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `Persistence` when the backing storage fails.
    fn count(&self, filter: &PatchFilter) -> Result<usize, ExError>;

    /// # Errors
    ///
    /// Returns `Persistence` when the backing storage fails.
    fn paged_fetch(
        &self,
        filter: &PatchFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<PatchHolder>, ExError>;

    /// Import sources of `variant` keyed by label
    ///
    /// # Errors
    ///
    /// Returns `Persistence` when the backing storage fails.
    fn list_import_sources(&self, variant: &str) -> Result<BTreeMap<String, String>, ExError>;

    /// Insert new holders and replace existing ones with the same key
    ///
    /// Returns the number of holders that were not stored before.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` when the write fails; nothing is written then.
    fn upsert_batch(&self, entries: &[PatchHolder]) -> Result<usize, ExError>;

    /// # Errors
    ///
    /// Returns `Persistence` when the backing storage fails.
    fn get(&self, variant: &str, fingerprint: &Fingerprint)
        -> Result<Option<PatchHolder>, ExError>;

    /// # Errors
    ///
    /// Returns `NotFound` when no such patch is stored.
    fn set_favorite(
        &self,
        variant: &str,
        fingerprint: &Fingerprint,
        favorite: bool,
    ) -> Result<(), ExError>;
}
