//! Patch diff engine
//!
//! Within each compared region, named parameters are checked first; bytes no
//! parameter covers are compared one by one and runs of differing bytes are
//! merged into byte-range entries.

use super::model::{DiffEntry, DiffField, DiffMode, LayerDiff, PatchDiff};
use crate::capability::dispatch;
use crate::codec::ParameterDefinition;
use crate::model::PatchHolder;
use crate::variants::SynthVariant;
use std::ops::Range;

const CALLER: &str = "compute_diff";

/// Compare two stored patches of `variant`
///
/// Returns [`PatchDiff::Incomparable`] when either patch was captured from a
/// different variant. Layered patches are compared layer by layer when both
/// sides use the same layer layout.
pub fn compute_diff(
    variant: &SynthVariant,
    a: &PatchHolder,
    b: &PatchHolder,
    mode: DiffMode,
) -> PatchDiff {
    if a.variant() != b.variant() || a.variant() != variant.name() {
        let variant_b = if a.variant() != b.variant() {
            b.variant()
        } else {
            variant.name()
        };
        return PatchDiff::Incomparable {
            variant_a: a.variant().to_string(),
            variant_b: variant_b.to_string(),
        };
    }

    let data_a = a.patch().bytes();
    let data_b = b.patch().bytes();
    let parameters = variant.synth().parameters();
    let spans_a = a.patch().layers();

    let layers = if !spans_a.is_empty() && spans_a == b.patch().layers() {
        let titles = dispatch::layer_titles(variant, CALLER);
        spans_a
            .iter()
            .enumerate()
            .map(|(layer, span)| LayerDiff {
                layer,
                title: titles
                    .get(layer)
                    .cloned()
                    .unwrap_or_else(|| span.title.clone()),
                entries: diff_region(data_a, data_b, span.start..span.end(), parameters, mode),
            })
            .collect()
    } else {
        let len = data_a.len().max(data_b.len());
        vec![LayerDiff {
            layer: 0,
            title: "Patch".to_string(),
            entries: diff_region(data_a, data_b, 0..len, parameters, mode),
        }]
    };

    PatchDiff::Compared {
        variant: variant.name().to_string(),
        mode,
        name_a: a.name().to_string(),
        name_b: b.name().to_string(),
        layers,
    }
}

fn slice(data: &[u8], range: Range<usize>) -> Vec<u8> {
    let end = range.end.min(data.len());
    let start = range.start.min(end);
    data[start..end].to_vec()
}

fn diff_region(
    a: &[u8],
    b: &[u8],
    region: Range<usize>,
    parameters: &[ParameterDefinition],
    mode: DiffMode,
) -> Vec<DiffEntry> {
    let mut covered = vec![false; region.len()];
    let mut entries = Vec::new();

    for param in parameters {
        let range = param.range();
        if range.start < region.start || range.end > region.end {
            continue;
        }
        covered[range.start - region.start..range.end - region.start]
            .iter_mut()
            .for_each(|c| *c = true);
        if mode == DiffMode::IgnoreNames && !param.voice_relevant {
            continue;
        }
        let (value_a, value_b) = (slice(a, range.clone()), slice(b, range));
        if value_a != value_b {
            entries.push(DiffEntry {
                field: DiffField::Parameter {
                    name: param.name.clone(),
                    offset: param.offset,
                    len: param.len,
                },
                value_a,
                value_b,
            });
        }
    }

    let mut run: Option<usize> = None;
    for i in region.clone() {
        let differs = !covered[i - region.start] && a.get(i) != b.get(i);
        match (differs, run) {
            (true, None) => run = Some(i),
            (false, Some(start)) => {
                entries.push(byte_range(a, b, start..i));
                run = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run {
        entries.push(byte_range(a, b, start..region.end));
    }

    entries.sort_by_key(|e| e.field.start());
    entries
}

fn byte_range(a: &[u8], b: &[u8], range: Range<usize>) -> DiffEntry {
    DiffEntry {
        field: DiffField::ByteRange {
            start: range.start,
            end: range.end,
        },
        value_a: slice(a, range.clone()),
        value_b: slice(b, range),
    }
}
