//! Engine-level read-only query surface.
//!
//! `apply_engine_query` is the single entry point for reads that span the
//! store, the registry and the core. It never writes to the store and runs on
//! the calling thread; the interactive paging path goes through
//! [`Engine::fetch_page`] instead.

use std::collections::BTreeMap;
use std::time::Instant;

use patchvault_core::capability::dispatch;
use patchvault_core::diff::engine::compute_diff;
use patchvault_core::diff::human_summary::render_human_summary;
use patchvault_core::diff::model::{DiffMode, PatchDiff};
use patchvault_core::errors::{ExError, ExErrorKind, PatchVaultError};
use patchvault_core::{log_op_end, log_op_error, log_op_start};
use patchvault_core::{BankNumber, Fingerprint, PatchFilter, PatchHolder, PatchStore};
use serde::Serialize;

use crate::engine::Engine;
use crate::tasks::Page;

const CALLER: &str = "engine_query";
const SCAN_PAGE: usize = 256;
const FINGERPRINT_LEN: usize = 64;

/// The structured and rendered result of a diff query.
#[derive(Debug, Clone, Serialize)]
pub struct PatchDiffResult {
    pub structured_diff: PatchDiff,
    pub human_summary: String,
}

/// What the engine knows about one synth variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthInfo {
    pub name: String,
    pub active: bool,
    /// One-based
    pub channel: Option<u8>,
    pub output: Option<String>,
    pub capabilities: Vec<&'static str>,
    /// Names of the data blocks the synth can load
    pub data_files: Vec<String>,
    pub stored_patches: usize,
}

/// Read-only queries supported by the engine.
#[derive(Debug, Clone)]
pub enum EngineQuery {
    CountPatches { filter: PatchFilter },
    ListPatches {
        filter: PatchFilter,
        skip: usize,
        limit: usize,
    },
    /// Import source labels mapped to ids.
    ImportSources { variant: String },
    /// Bank numbers and display names, with capability fallback.
    Banks { variant: String },
    /// Compare two stored patches, each given by a fingerprint or a unique
    /// prefix of one.
    Diff {
        variant: String,
        a: String,
        b: String,
        mode: DiffMode,
    },
    /// Every registered variant.
    Synths,
}

#[derive(Debug, Clone)]
pub enum EngineQueryResult {
    Count(usize),
    Patches(Page),
    ImportSources(BTreeMap<String, String>),
    Banks(Vec<(BankNumber, String)>),
    Diff(Box<PatchDiffResult>),
    Synths(Vec<SynthInfo>),
}

fn op_name(query: &EngineQuery) -> &'static str {
    match query {
        EngineQuery::CountPatches { .. } => "count_patches",
        EngineQuery::ListPatches { .. } => "list_patches",
        EngineQuery::ImportSources { .. } => "list_import_sources",
        EngineQuery::Banks { .. } => "bank_list",
        EngineQuery::Diff { .. } => "patch_diff",
        EngineQuery::Synths => "list_synths",
    }
}

/// Find the stored patch whose fingerprint is `reference` or starts with it
///
/// # Errors
///
/// Returns `NotFound` when nothing matches and `InvalidInput` when the
/// prefix is ambiguous or empty.
pub fn resolve_patch(
    store: &dyn PatchStore,
    variant: &str,
    reference: &str,
) -> Result<PatchHolder, ExError> {
    let reference = reference.trim().to_ascii_lowercase();
    if reference.is_empty() {
        return Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("resolve_patch")
            .with_variant(variant)
            .with_message("Empty patch reference"));
    }
    let not_found = || {
        ExError::from(PatchVaultError::PatchNotFound {
            variant: variant.to_string(),
            fingerprint: reference.clone(),
        })
    };

    if reference.len() == FINGERPRINT_LEN {
        return store
            .get(variant, &Fingerprint::from_hex(reference.clone()))?
            .ok_or_else(not_found);
    }

    let filter = PatchFilter::for_variant(variant);
    let mut found: Option<PatchHolder> = None;
    let mut skip = 0;
    loop {
        let page = store.paged_fetch(&filter, skip, SCAN_PAGE)?;
        for holder in &page {
            if holder.fingerprint().as_str().starts_with(&reference) {
                if found.is_some() {
                    return Err(ExError::new(ExErrorKind::InvalidInput)
                        .with_op("resolve_patch")
                        .with_variant(variant)
                        .with_fingerprint(reference.clone())
                        .with_message("Ambiguous fingerprint prefix"));
                }
                found = Some(holder.clone());
            }
        }
        if page.len() < SCAN_PAGE {
            break;
        }
        skip += page.len();
    }
    found.ok_or_else(not_found)
}

fn run_query(query: EngineQuery, engine: &Engine) -> Result<EngineQueryResult, ExError> {
    let store = engine.store();
    match query {
        EngineQuery::CountPatches { filter } => store.count(&filter).map(EngineQueryResult::Count),

        EngineQuery::ListPatches {
            filter,
            skip,
            limit,
        } => {
            let total = store.count(&filter)?;
            let patches = store.paged_fetch(&filter, skip, limit)?;
            Ok(EngineQueryResult::Patches(Page { total, patches }))
        }

        EngineQuery::ImportSources { variant } => {
            let variant = engine.variant(&variant)?;
            store
                .list_import_sources(variant.name())
                .map(EngineQueryResult::ImportSources)
        }

        EngineQuery::Banks { variant } => {
            let variant = engine.variant(&variant)?;
            Ok(EngineQueryResult::Banks(dispatch::bank_list(&variant, CALLER)))
        }

        EngineQuery::Diff {
            variant,
            a,
            b,
            mode,
        } => {
            let variant = engine.variant(&variant)?;
            let patch_a = resolve_patch(store, variant.name(), &a)?;
            let patch_b = resolve_patch(store, variant.name(), &b)?;
            let structured_diff = compute_diff(&variant, &patch_a, &patch_b, mode);
            let human_summary = render_human_summary(&structured_diff);
            Ok(EngineQueryResult::Diff(Box::new(PatchDiffResult {
                structured_diff,
                human_summary,
            })))
        }

        EngineQuery::Synths => {
            let mut synths = Vec::new();
            for variant in engine.registry().all() {
                synths.push(SynthInfo {
                    name: variant.name().to_string(),
                    active: variant.active,
                    channel: variant.channel.map(|c| c.to_one_based()),
                    output: variant.output.clone(),
                    capabilities: variant.declared().iter().map(|tag| tag.name()).collect(),
                    data_files: dispatch::data_files(&variant, CALLER)
                        .into_iter()
                        .map(|d| d.name)
                        .collect(),
                    stored_patches: store.count(&PatchFilter::for_variant(variant.name()))?,
                });
            }
            Ok(EngineQueryResult::Synths(synths))
        }
    }
}

/// Apply a read-only engine query.
///
/// # Errors
///
/// Returns `NotFound` for unknown variants or patches, `InvalidInput` for an
/// ambiguous patch reference, or the store error.
pub fn apply_engine_query(query: EngineQuery, engine: &Engine) -> Result<EngineQueryResult, ExError> {
    let op = op_name(&query);
    log_op_start!(op);
    let start = Instant::now();

    let result = run_query(query, engine);

    let elapsed = start.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => {
            log_op_end!(op, duration_ms = elapsed);
        }
        Err(e) => {
            log_op_error!(op, e.clone(), duration_ms = elapsed);
        }
    }
    result
}
