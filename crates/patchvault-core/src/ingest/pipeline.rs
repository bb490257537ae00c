//! Per-item reconciliation and the single batch commit
//!
//! For every item: decode, fingerprint, look the key up in this batch and
//! then in the store. Absent means insert, present with different payload
//! bytes means update, otherwise skip. Updates keep the stored holder's
//! favorite flag, categories and import source.
//!
//! The store sees at most one `upsert_batch` per run, made after every key of
//! the batch is held in the [`WriteGate`] and the staged entries have been
//! checked against the store again.

use std::collections::HashMap;

use super::{IngestItem, ItemFailure, MergeOutcome, ProgressHandler, WriteGate};
use crate::errors::{ExError, ExErrorKind};
use crate::identity;
use crate::model::{ImportSource, PatchData, PatchHolder};
use crate::store::PatchStore;
use crate::variants::SynthVariant;
use crate::{log_item_failed, log_op_end, log_op_error, log_op_start, log_run_aborted};

const OP: &str = "merge_patches";

struct Staged {
    holder: PatchHolder,
    is_new: bool,
}

/// Reconcile `items` captured from `variant` against `store`
///
/// Decode and fingerprint failures are recorded in the outcome and do not
/// stop the batch. An abort requested through `progress` leaves the store
/// untouched.
///
/// # Errors
///
/// Returns `Persistence` when a store lookup or the final commit fails. A
/// failed commit writes nothing.
pub fn merge_patches(
    variant: &SynthVariant,
    source: &ImportSource,
    items: Vec<IngestItem>,
    store: &dyn PatchStore,
    gate: &WriteGate,
    progress: &dyn ProgressHandler,
) -> Result<MergeOutcome, ExError> {
    let total = items.len();
    log_op_start!(
        OP,
        variant = variant.name(),
        import_source = %source.label,
        items = total
    );
    let start = std::time::Instant::now();

    let result = merge_impl(variant, source, items, store, gate, progress).map_err(|e| {
        log_op_error!(
            OP,
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            variant = variant.name()
        );
        e
    })?;

    log_op_end!(
        OP,
        duration_ms = start.elapsed().as_millis() as u64,
        variant = variant.name(),
        inserted = result.inserted,
        updated = result.updated,
        skipped = result.skipped,
        failed = result.failures.len()
    );
    Ok(result)
}

fn merge_impl(
    variant: &SynthVariant,
    source: &ImportSource,
    items: Vec<IngestItem>,
    store: &dyn PatchStore,
    gate: &WriteGate,
    progress: &dyn ProgressHandler,
) -> Result<MergeOutcome, ExError> {
    let mut outcome = MergeOutcome::default();
    let total = items.len();
    if total == 0 {
        if progress.should_abort() {
            return Ok(aborted(outcome, variant, 0));
        }
        return Ok(outcome);
    }

    let mut staged: Vec<Staged> = Vec::new();
    let mut staged_by_key: HashMap<String, usize> = HashMap::new();

    for (index, item) in items.into_iter().enumerate() {
        if progress.should_abort() {
            return Ok(aborted(outcome, variant, index));
        }

        let (patch, fingerprint) = match decode_and_fingerprint(variant, item) {
            Ok(decoded) => decoded,
            Err(e) => {
                let error = ExError::from(e)
                    .with_op(OP)
                    .with_variant(variant.name())
                    .with_item_index(index);
                log_item_failed!(OP, variant.name(), index, &error);
                outcome.failures.push(ItemFailure { index, error });
                progress.set_progress((index + 1) as f64 / total as f64);
                continue;
            }
        };

        let key = format!("{}/{}", variant.name(), fingerprint);
        if let Some(&at) = staged_by_key.get(&key) {
            let entry = &mut staged[at];
            if entry.holder.patch().bytes() == patch.bytes() {
                outcome.skipped += 1;
            } else {
                entry.holder = entry.holder.clone().with_patch(patch);
            }
        } else {
            match store.get(variant.name(), &fingerprint)? {
                Some(stored) if stored.patch().bytes() == patch.bytes() => {
                    outcome.skipped += 1;
                }
                Some(stored) => {
                    staged_by_key.insert(key, staged.len());
                    staged.push(Staged {
                        holder: stored.with_patch(patch),
                        is_new: false,
                    });
                }
                None => {
                    staged_by_key.insert(key, staged.len());
                    staged.push(Staged {
                        holder: PatchHolder::new(
                            variant.name(),
                            fingerprint,
                            patch,
                            source.clone(),
                        ),
                        is_new: true,
                    });
                }
            }
        }
        progress.set_progress((index + 1) as f64 / total as f64);
    }

    if progress.should_abort() {
        return Ok(aborted(outcome, variant, total));
    }
    if staged.is_empty() {
        return Ok(outcome);
    }

    let _guard = gate.acquire(staged.iter().map(|s| s.holder.key()));
    let staged = revalidate(staged, store, &mut outcome)?;
    if staged.is_empty() {
        return Ok(outcome);
    }

    let holders: Vec<PatchHolder> = staged.iter().map(|s| s.holder.clone()).collect();
    let inserted = store.upsert_batch(&holders).map_err(|e| {
        ExError::new(ExErrorKind::Persistence)
            .with_op(OP)
            .with_variant(variant.name())
            .with_message("batch commit failed")
            .with_source(e)
    })?;

    outcome.inserted = inserted;
    outcome.updated = holders.len() - inserted;
    outcome.affected = holders;
    Ok(outcome)
}

fn decode_and_fingerprint(
    variant: &SynthVariant,
    item: IngestItem,
) -> crate::errors::Result<(PatchData, crate::model::Fingerprint)> {
    let patch = match item {
        IngestItem::Raw(message) => variant.synth().patch_from_sysex(&message)?,
        IngestItem::Decoded(patch) => patch,
    };
    let fingerprint = identity::fingerprint(variant, &patch)?;
    Ok((patch, fingerprint))
}

/// Re-read every staged key under the gate; another writer may have stored
/// it since the first lookup
fn revalidate(
    staged: Vec<Staged>,
    store: &dyn PatchStore,
    outcome: &mut MergeOutcome,
) -> Result<Vec<Staged>, ExError> {
    let mut checked = Vec::with_capacity(staged.len());
    for entry in staged {
        let current = store.get(entry.holder.variant(), entry.holder.fingerprint())?;
        match current {
            Some(stored) if stored.patch().bytes() == entry.holder.patch().bytes() => {
                outcome.skipped += 1;
            }
            Some(stored) if entry.is_new => checked.push(Staged {
                holder: stored.with_patch(entry.holder.patch().clone()),
                is_new: false,
            }),
            Some(_) => checked.push(entry),
            None => checked.push(Staged {
                is_new: true,
                ..entry
            }),
        }
    }
    Ok(checked)
}

fn aborted(mut outcome: MergeOutcome, variant: &SynthVariant, at: usize) -> MergeOutcome {
    log_run_aborted!(OP, variant.name(), at);
    outcome.aborted = true;
    outcome
}
