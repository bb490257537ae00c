use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use super::{PatchFilter, PatchStore};
use crate::errors::{ExError, ExErrorKind};
use crate::model::{Fingerprint, PatchHolder};

#[derive(Debug, Default)]
struct Inner {
    /// Keys in insertion order
    order: Vec<String>,
    holders: HashMap<String, PatchHolder>,
    upserts: usize,
}

/// In-memory patch store
///
/// Thread-safe behind a `RwLock`; readers never block each other. Used by
/// tests and by embedders that bring their own persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `upsert_batch` calls that reached the store
    pub fn upsert_calls(&self) -> usize {
        self.inner.read().upserts
    }

    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn key(variant: &str, fingerprint: &Fingerprint) -> String {
    format!("{}/{}", variant, fingerprint)
}

impl PatchStore for MemoryStore {
    fn count(&self, filter: &PatchFilter) -> Result<usize, ExError> {
        let inner = self.inner.read();
        Ok(inner.holders.values().filter(|h| filter.matches(h)).count())
    }

    fn paged_fetch(
        &self,
        filter: &PatchFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<PatchHolder>, ExError> {
        let inner = self.inner.read();
        Ok(inner
            .order
            .iter()
            .filter_map(|k| inner.holders.get(k))
            .filter(|h| filter.matches(h))
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    fn list_import_sources(&self, variant: &str) -> Result<BTreeMap<String, String>, ExError> {
        let inner = self.inner.read();
        let mut sources = BTreeMap::new();
        for holder in inner
            .order
            .iter()
            .filter_map(|k| inner.holders.get(k))
            .filter(|h| h.variant() == variant)
        {
            let source = holder.source();
            sources.insert(source.label.clone(), source.id.clone());
        }
        Ok(sources)
    }

    fn upsert_batch(&self, entries: &[PatchHolder]) -> Result<usize, ExError> {
        let mut inner = self.inner.write();
        inner.upserts += 1;
        let mut inserted = 0;
        for holder in entries {
            let k = holder.key();
            if inner.holders.insert(k.clone(), holder.clone()).is_none() {
                inner.order.push(k);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn get(
        &self,
        variant: &str,
        fingerprint: &Fingerprint,
    ) -> Result<Option<PatchHolder>, ExError> {
        Ok(self.inner.read().holders.get(&key(variant, fingerprint)).cloned())
    }

    fn set_favorite(
        &self,
        variant: &str,
        fingerprint: &Fingerprint,
        favorite: bool,
    ) -> Result<(), ExError> {
        let mut inner = self.inner.write();
        match inner.holders.get_mut(&key(variant, fingerprint)) {
            Some(holder) => {
                holder.favorite = favorite;
                Ok(())
            }
            None => Err(ExError::new(ExErrorKind::NotFound)
                .with_op("set_favorite")
                .with_variant(variant)
                .with_fingerprint(fingerprint.as_str())
                .with_message("patch not stored")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::fingerprint_bytes;
    use crate::model::{DataType, ImportSource, PatchData};

    fn holder(variant: &str, seed: u8, source: &ImportSource) -> PatchHolder {
        let data = PatchData::new(DataType::Patch, vec![seed; 8], format!("P{}", seed));
        PatchHolder::new(
            variant,
            fingerprint_bytes(variant, data.bytes()),
            data,
            source.clone(),
        )
    }

    #[test]
    fn test_paging_keeps_insertion_order() {
        let store = MemoryStore::new();
        let source = ImportSource::from_file("bank.syx");
        let batch: Vec<_> = (0..5).map(|i| holder("OB-6", i, &source)).collect();
        assert_eq!(store.upsert_batch(&batch).unwrap(), 5);

        let filter = PatchFilter::for_variant("OB-6");
        let page = store.paged_fetch(&filter, 1, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].name(), "P1");
        assert_eq!(page[1].name(), "P2");
        assert_eq!(store.count(&filter).unwrap(), 5);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let store = MemoryStore::new();
        let source = ImportSource::from_file("a.syx");
        let a = holder("OB-6", 1, &source);
        let b = holder("OB-6", 2, &source);
        store.upsert_batch(&[a.clone(), b]).unwrap();

        let mut renamed = a.clone();
        renamed.favorite = true;
        assert_eq!(store.upsert_batch(&[renamed]).unwrap(), 0);

        let first = store
            .paged_fetch(&PatchFilter::for_variant("OB-6"), 0, 1)
            .unwrap();
        assert!(first[0].favorite);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_filters() {
        let store = MemoryStore::new();
        let one = ImportSource::from_file("one.syx");
        let two = ImportSource::from_file("two.syx");
        store
            .upsert_batch(&[holder("OB-6", 1, &one), holder("OB-6", 2, &two), holder("Other", 3, &two)])
            .unwrap();
        store
            .set_favorite("OB-6", &fingerprint_bytes("OB-6", &[2; 8]), true)
            .unwrap();

        let by_source = PatchFilter::for_variant("OB-6").with_import_source(two.id.clone());
        assert_eq!(store.count(&by_source).unwrap(), 1);
        let favorites = PatchFilter::for_variant("OB-6").favorites_only();
        assert_eq!(store.count(&favorites).unwrap(), 1);

        let sources = store.list_import_sources("OB-6").unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources.get(&one.label), Some(&one.id));
    }

    #[test]
    fn test_set_favorite_unknown_patch() {
        let store = MemoryStore::new();
        let err = store
            .set_favorite("OB-6", &Fingerprint::from_hex("00"), true)
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
    }
}
