#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use common::{engine_with, write_syx, A6, A6_BRAIN_ACTIVITY, A6_THE_DREAM, OB6};
use patchvault_core::diff::model::{DiffMode, PatchDiff};
use patchvault_core::errors::ExErrorKind;
use patchvault_core::logging_facility::test_capture::init_test_capture;
use patchvault_core::store::MemoryStore;
use patchvault_core::{
    DataType, Fingerprint, ImportSource, PatchData, PatchFilter, PatchHolder, PatchStore,
};
use patchvault_core_types::schema::{EVENT_END, EVENT_END_ERROR};
use patchvault_engine::commands::{
    apply_engine_command, apply_engine_query, resolve_patch, EngineCommand, EngineCommandResult,
    EngineQuery, EngineQueryResult,
};
use patchvault_engine::Engine;

/// Engine holding both A6 fixture programs, plus their fingerprints
fn a6_engine() -> (Engine, Vec<Fingerprint>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_syx(dir.path(), "a6.syx", &[A6_BRAIN_ACTIVITY, A6_THE_DREAM].concat());
    let engine = engine_with(Arc::new(MemoryStore::new()));

    let result = apply_engine_command(
        EngineCommand::ImportFile {
            variant: A6.to_string(),
            path,
        },
        &engine,
    )
    .unwrap();
    let outcome = match result {
        EngineCommandResult::IngestStarted(handle) => handle.wait().unwrap(),
        other => panic!("unexpected result {:?}", other),
    };
    assert!(outcome.frame_errors.is_empty());
    let fingerprints = outcome
        .affected
        .iter()
        .map(|h| h.fingerprint().clone())
        .collect();
    (engine, fingerprints, dir)
}

fn count(engine: &Engine, filter: PatchFilter) -> usize {
    match apply_engine_query(EngineQuery::CountPatches { filter }, engine).unwrap() {
        EngineQueryResult::Count(n) => n,
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_list_and_count_after_import() {
    let (engine, fingerprints, _dir) = a6_engine();

    assert_eq!(count(&engine, PatchFilter::for_variant(A6)), 2);
    assert_eq!(count(&engine, PatchFilter::for_variant(OB6)), 0);

    let page = match apply_engine_query(
        EngineQuery::ListPatches {
            filter: PatchFilter::for_variant(A6),
            skip: 1,
            limit: 5,
        },
        &engine,
    )
    .unwrap()
    {
        EngineQueryResult::Patches(page) => page,
        other => panic!("unexpected result {:?}", other),
    };
    assert_eq!(page.total, 2);
    assert_eq!(page.patches.len(), 1);
    assert_eq!(page.patches[0].fingerprint(), &fingerprints[1]);
}

#[test]
fn test_favorite_filter() {
    let (engine, fingerprints, _dir) = a6_engine();

    let result = apply_engine_command(
        EngineCommand::SetFavorite {
            variant: A6.to_string(),
            fingerprint: fingerprints[1].clone(),
            favorite: true,
        },
        &engine,
    )
    .unwrap();
    assert!(matches!(result, EngineCommandResult::FavoriteSet));
    assert_eq!(count(&engine, PatchFilter::for_variant(A6).favorites_only()), 1);

    let err = apply_engine_command(
        EngineCommand::SetFavorite {
            variant: A6.to_string(),
            fingerprint: Fingerprint::from_hex("0".repeat(64)),
            favorite: true,
        },
        &engine,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_import_sources_filter_by_source() {
    let (engine, _, _dir) = a6_engine();

    let sources = match apply_engine_query(
        EngineQuery::ImportSources {
            variant: A6.to_string(),
        },
        &engine,
    )
    .unwrap()
    {
        EngineQueryResult::ImportSources(sources) => sources,
        other => panic!("unexpected result {:?}", other),
    };
    assert_eq!(sources.len(), 1);
    let source_id = sources.get("Imported from file a6.syx").unwrap().clone();
    assert_eq!(
        count(&engine, PatchFilter::for_variant(A6).with_import_source(source_id)),
        2
    );
}

#[test]
fn test_diff_by_fingerprint_prefix() {
    let (engine, fingerprints, _dir) = a6_engine();
    let result = apply_engine_query(
        EngineQuery::Diff {
            variant: A6.to_string(),
            a: fingerprints[0].as_str()[..12].to_string(),
            b: fingerprints[1].as_str().to_uppercase(),
            mode: DiffMode::IgnoreNames,
        },
        &engine,
    )
    .unwrap();

    let diff = match result {
        EngineQueryResult::Diff(diff) => diff,
        other => panic!("unexpected result {:?}", other),
    };
    match &diff.structured_diff {
        PatchDiff::Compared {
            name_a, name_b, ..
        } => {
            assert_eq!(name_a, "Brain Activity");
            assert_eq!(name_b, "The Dream");
        }
        other => panic!("unexpected diff {:?}", other),
    }
    assert!(!diff.structured_diff.is_identical());
    assert!(diff.human_summary.starts_with("## Patch Diff: Alesis Andromeda A6"));
}

#[test]
fn test_diff_with_unknown_or_empty_reference() {
    let (engine, fingerprints, _dir) = a6_engine();

    let missing = apply_engine_query(
        EngineQuery::Diff {
            variant: A6.to_string(),
            a: "zz".to_string(),
            b: fingerprints[1].to_string(),
            mode: DiffMode::AllParameters,
        },
        &engine,
    )
    .unwrap_err();
    assert_eq!(missing.kind(), ExErrorKind::NotFound);

    let empty = apply_engine_query(
        EngineQuery::Diff {
            variant: A6.to_string(),
            a: "  ".to_string(),
            b: fingerprints[1].to_string(),
            mode: DiffMode::AllParameters,
        },
        &engine,
    )
    .unwrap_err();
    assert_eq!(empty.kind(), ExErrorKind::InvalidInput);
}

#[test]
fn test_ambiguous_prefix_is_rejected() {
    let store = MemoryStore::new();
    let source = ImportSource::from_file("twins.syx");
    let holders: Vec<PatchHolder> = ["abc1", "abc2"]
        .iter()
        .map(|head| {
            let data = PatchData::new(DataType::Patch, head.as_bytes().to_vec(), *head);
            let fingerprint = Fingerprint::from_hex(format!("{}{}", head, "0".repeat(60)));
            PatchHolder::new(OB6, fingerprint, data, source.clone())
        })
        .collect();
    store.upsert_batch(&holders).unwrap();

    let err = resolve_patch(&store, OB6, "abc").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    let unique = resolve_patch(&store, OB6, "ABC2").unwrap();
    assert_eq!(unique.name(), "abc2");
}

#[test]
fn test_banks_and_synths_are_listed() {
    let (engine, _, _dir) = a6_engine();

    match apply_engine_query(
        EngineQuery::Banks {
            variant: "ob-6".to_string(),
        },
        &engine,
    )
    .unwrap()
    {
        EngineQueryResult::Banks(banks) => assert_eq!(banks.len(), 10),
        other => panic!("unexpected result {:?}", other),
    }

    let synths = match apply_engine_query(EngineQuery::Synths, &engine).unwrap() {
        EngineQueryResult::Synths(synths) => synths,
        other => panic!("unexpected result {:?}", other),
    };
    let a6 = synths.iter().find(|s| s.name == A6).unwrap();
    assert_eq!(a6.stored_patches, 2);
    assert!(a6.capabilities.contains(&"DataFileLoad"));
    assert_eq!(a6.data_files, vec!["Program".to_string()]);
    let ob6 = synths.iter().find(|s| s.name == OB6).unwrap();
    assert!(ob6.data_files.contains(&"Global Settings".to_string()));
    assert_eq!(ob6.channel, Some(1));
    assert_eq!(ob6.output.as_deref(), Some(common::OB6_PORT));
}

#[test]
fn test_queries_log_start_and_end() {
    let capture = init_test_capture();
    let engine = engine_with(Arc::new(MemoryStore::new()));

    apply_engine_query(EngineQuery::Synths, &engine).unwrap();
    let err = apply_engine_query(
        EngineQuery::Banks {
            variant: "Prophet-5".to_string(),
        },
        &engine,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);

    capture.assert_event_exists("list_synths", EVENT_END);
    let failed = capture
        .events()
        .into_iter()
        .find(|e| e.op.as_deref() == Some("bank_list") && e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("bank_list error event");
    assert_eq!(failed.field("err_code"), Some("ERR_NOT_FOUND"));
}
