#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Both store implementations run through the same contract checks

use patchvault_core::identity::fingerprint_bytes;
use patchvault_core::ingest::{merge_patches, IngestItem, NoProgress, WriteGate};
use patchvault_core::model::{DataType, ImportSource, PatchData, PatchHolder};
use patchvault_core::store::MemoryStore;
use patchvault_core::variants::native_variant;
use patchvault_core::{ExErrorKind, PatchFilter, PatchStore};
use patchvault_store::SqlitePatchStore;

fn holder(variant: &str, seed: u8, source: &ImportSource) -> PatchHolder {
    let data = PatchData::new(DataType::Patch, vec![seed; 16], format!("Patch {}", seed));
    PatchHolder::new(
        variant,
        fingerprint_bytes(variant, data.bytes()),
        data,
        source.clone(),
    )
}

fn stores() -> Vec<(&'static str, Box<dyn PatchStore>)> {
    vec![
        ("memory", Box::new(MemoryStore::new())),
        ("sqlite", Box::new(SqlitePatchStore::open_in_memory().unwrap())),
    ]
}

#[test]
fn test_paging_is_insertion_ordered_and_stable() {
    for (kind, store) in stores() {
        let source = ImportSource::from_file("paging.syx");
        let holders: Vec<_> = (0..25).map(|i| holder("OB-6", i, &source)).collect();
        assert_eq!(store.upsert_batch(&holders).unwrap(), 25, "{}", kind);

        let filter = PatchFilter::for_variant("OB-6");
        assert_eq!(store.count(&filter).unwrap(), 25, "{}", kind);

        let mut seen = Vec::new();
        for page in 0..3 {
            let fetched = store.paged_fetch(&filter, page * 10, 10).unwrap();
            seen.extend(fetched.into_iter().map(|h| h.name().to_string()));
        }
        let expected: Vec<_> = (0..25).map(|i| format!("Patch {}", i)).collect();
        assert_eq!(seen, expected, "{}", kind);

        let again = store.paged_fetch(&filter, 10, 10).unwrap();
        assert_eq!(again[0].name(), "Patch 10", "{}", kind);
    }
}

#[test]
fn test_filters_by_variant_source_and_favorite() {
    for (kind, store) in stores() {
        let first = ImportSource::from_file("first.syx");
        let second = ImportSource::from_file("second.syx");
        store
            .upsert_batch(&[
                holder("OB-6", 1, &first),
                holder("OB-6", 2, &second),
                holder("Alesis Andromeda A6", 1, &first),
            ])
            .unwrap();
        let fav = holder("OB-6", 2, &second);
        store.set_favorite("OB-6", fav.fingerprint(), true).unwrap();

        let ob6 = PatchFilter::for_variant("OB-6");
        assert_eq!(store.count(&ob6).unwrap(), 2, "{}", kind);
        assert_eq!(
            store.count(&ob6.clone().with_import_source(&first.id)).unwrap(),
            1,
            "{}",
            kind
        );
        let favorites = store.paged_fetch(&ob6.favorites_only(), 0, 10).unwrap();
        assert_eq!(favorites.len(), 1, "{}", kind);
        assert_eq!(favorites[0].name(), "Patch 2", "{}", kind);

        let sources = store.list_import_sources("OB-6").unwrap();
        assert_eq!(sources.len(), 2, "{}", kind);
        assert_eq!(sources.get(&second.label), Some(&second.id), "{}", kind);
    }
}

#[test]
fn test_upsert_counts_only_new_keys() {
    for (kind, store) in stores() {
        let source = ImportSource::from_file("upsert.syx");
        store.upsert_batch(&[holder("OB-6", 1, &source)]).unwrap();

        let inserted = store
            .upsert_batch(&[holder("OB-6", 1, &source), holder("OB-6", 2, &source)])
            .unwrap();

        assert_eq!(inserted, 1, "{}", kind);
        assert_eq!(store.count(&PatchFilter::for_variant("OB-6")).unwrap(), 2, "{}", kind);
    }
}

#[test]
fn test_get_and_set_favorite_on_missing_key() {
    for (kind, store) in stores() {
        let absent = holder("OB-6", 99, &ImportSource::from_file("none.syx"));
        assert!(store.get("OB-6", absent.fingerprint()).unwrap().is_none(), "{}", kind);
        let err = store.set_favorite("OB-6", absent.fingerprint(), true).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound, "{}", kind);
    }
}

#[test]
fn test_pipeline_against_sqlite_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.db");
    let ob6 = native_variant("OB-6").unwrap();
    let gate = WriteGate::new();

    let data = |seed: u8| {
        let mut bytes = vec![seed; 1024];
        bytes[107..127].copy_from_slice(b"Stored On Disk      ");
        PatchData::new(DataType::Patch, bytes, "Stored On Disk")
    };
    let items = || -> Vec<IngestItem> { (1..=3).map(|s| data(s).into()).collect() };

    {
        let store = SqlitePatchStore::open(&path).unwrap();
        let outcome = merge_patches(
            &ob6,
            &ImportSource::from_file("disk.syx"),
            items(),
            &store,
            &gate,
            &NoProgress,
        )
        .unwrap();
        assert_eq!(outcome.inserted, 3);
    }

    let reopened = SqlitePatchStore::open(&path).unwrap();
    let rerun = merge_patches(
        &ob6,
        &ImportSource::from_file("disk.syx"),
        items(),
        &reopened,
        &gate,
        &NoProgress,
    )
    .unwrap();
    assert_eq!(rerun.new_or_changed(), 0);
    assert_eq!(reopened.count(&PatchFilter::for_variant("OB-6")).unwrap(), 3);
}
