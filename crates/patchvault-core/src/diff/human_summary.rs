//! Human-readable summary renderer for patch diffs.

use crate::diff::model::{DiffEntry, DiffField, DiffMode, PatchDiff};

/// Render a plain-text summary of a [`PatchDiff`].
pub fn render_human_summary(diff: &PatchDiff) -> String {
    let mut out = String::new();

    let (variant, mode, name_a, name_b, layers) = match diff {
        PatchDiff::Incomparable {
            variant_a,
            variant_b,
        } => {
            out.push_str("## Patch Diff\n\n");
            out.push_str(&format!(
                "_Not comparable: {variant_a} and {variant_b} are different synths._\n"
            ));
            return out;
        }
        PatchDiff::Compared {
            variant,
            mode,
            name_a,
            name_b,
            layers,
        } => (variant, mode, name_a, name_b, layers),
    };

    out.push_str(&format!("## Patch Diff: {variant}\n\n"));
    out.push_str(&format!("**A**: {}  \n**B**: {}\n", label(name_a), label(name_b)));
    let mode_label = match mode {
        DiffMode::AllParameters => "All parameters",
        DiffMode::IgnoreNames => "Ignoring names",
    };
    out.push_str(&format!("**Mode**: {mode_label}\n\n"));

    if diff.is_identical() {
        out.push_str("_No differences._\n");
        return out;
    }

    let layered = layers.len() > 1;
    for layer in layers {
        if layered {
            out.push_str(&format!(
                "### Layer {}: {} ({} changes)\n\n",
                layer.layer + 1,
                layer.title,
                layer.entries.len()
            ));
        }
        if layer.entries.is_empty() {
            out.push_str("_No differences._\n\n");
            continue;
        }
        for entry in &layer.entries {
            out.push_str(&render_entry(entry));
        }
        out.push('\n');
    }

    out
}

fn label(name: &str) -> &str {
    if name.is_empty() {
        "(unnamed)"
    } else {
        name
    }
}

fn render_entry(entry: &DiffEntry) -> String {
    match &entry.field {
        DiffField::Parameter { name, offset, .. } => format!(
            "- {} [{}]: {} -> {}\n",
            name,
            offset,
            value(&entry.value_a),
            value(&entry.value_b)
        ),
        DiffField::ByteRange { start, end } => format!(
            "- bytes {}..{}: {} -> {}\n",
            start,
            end,
            value(&entry.value_a),
            value(&entry.value_b)
        ),
    }
}

/// Single bytes as numbers, printable runs as quoted text, anything else hex
fn value(bytes: &[u8]) -> String {
    match bytes {
        [] => "-".to_string(),
        [b] => b.to_string(),
        _ if bytes.iter().all(|b| (0x20..0x7F).contains(b)) => {
            format!("\"{}\"", String::from_utf8_lossy(bytes).trim_end())
        }
        _ => hex::encode_upper(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::model::LayerDiff;

    fn compared(layers: Vec<LayerDiff>) -> PatchDiff {
        PatchDiff::Compared {
            variant: "OB-6".to_string(),
            mode: DiffMode::AllParameters,
            name_a: "Alpha".to_string(),
            name_b: String::new(),
            layers,
        }
    }

    #[test]
    fn test_summary_lists_entries() {
        let diff = compared(vec![LayerDiff {
            layer: 0,
            title: "Patch".to_string(),
            entries: vec![
                DiffEntry {
                    field: DiffField::Parameter {
                        name: "Filter Cutoff".to_string(),
                        offset: 12,
                        len: 1,
                    },
                    value_a: vec![40],
                    value_b: vec![52],
                },
                DiffEntry {
                    field: DiffField::ByteRange { start: 500, end: 502 },
                    value_a: vec![0x00, 0x8F],
                    value_b: vec![],
                },
            ],
        }]);
        let text = render_human_summary(&diff);
        assert!(text.contains("## Patch Diff: OB-6"));
        assert!(text.contains("**B**: (unnamed)"));
        assert!(text.contains("- Filter Cutoff [12]: 40 -> 52"));
        assert!(text.contains("- bytes 500..502: 008F -> -"));
        assert!(!text.contains("### Layer"));
    }

    #[test]
    fn test_summary_for_identical_and_incomparable() {
        let identical = render_human_summary(&compared(vec![]));
        assert!(identical.contains("_No differences._"));

        let incomparable = render_human_summary(&PatchDiff::Incomparable {
            variant_a: "OB-6".to_string(),
            variant_b: "Alesis Andromeda A6".to_string(),
        });
        assert!(incomparable.contains("Not comparable"));
    }

    #[test]
    fn test_names_render_as_text() {
        assert_eq!(value(b"Lead   "), "\"Lead\"");
        assert_eq!(value(&[7]), "7");
    }
}
