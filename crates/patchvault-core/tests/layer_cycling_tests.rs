#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::{Arc, Mutex};

use common::TestSynth;
use patchvault_core::context::{ContextEvent, SelectOutcome, SessionContext};
use patchvault_core::diff::{compute_diff, DiffField, DiffMode, PatchDiff};
use patchvault_core::identity::fingerprint_bytes;
use patchvault_core::model::{
    DataType, ImportSource, LayerSpan, MidiChannel, PatchData, PatchHolder,
};
use patchvault_core::variants::native_variant;
use patchvault_core::MidiMessage;

fn holder(variant: &str, seed: u8) -> PatchHolder {
    let data = PatchData::new(DataType::Patch, vec![0xF0, seed, 0x01, 0xF7], format!("T{}", seed));
    PatchHolder::new(
        variant,
        fingerprint_bytes(variant, data.bytes()),
        data,
        ImportSource::from_file("layers.syx"),
    )
}

fn layered_holder(variant: &str, bytes: Vec<u8>) -> PatchHolder {
    let half = bytes.len() / 2;
    let spans = vec![
        LayerSpan { title: "Upper".to_string(), start: 0, len: half },
        LayerSpan { title: "Lower".to_string(), start: half, len: bytes.len() - half },
    ];
    let data = PatchData::new(DataType::Patch, bytes, "Split").with_layers(spans);
    PatchHolder::new(
        variant,
        fingerprint_bytes(variant, data.bytes()),
        data,
        ImportSource::from_file("layers.syx"),
    )
}

#[test]
fn test_reselecting_cycles_through_layers_and_wraps() {
    let mut variant = TestSynth::new("Two Layers").with_layers(2).into_variant();
    variant.channel = MidiChannel::from_one_based(3);
    let mut ctx = SessionContext::new();
    ctx.set_active_variant("Two Layers");

    let first = ctx.select_patch(&variant, holder("Two Layers", 1)).unwrap();
    match &first {
        SelectOutcome::PatchSwitch { messages } => {
            assert_eq!(messages.len(), 2, "patch dump plus switch to layer 0");
            assert_eq!(
                messages[1],
                MidiMessage::control_change(MidiChannel::from_one_based(3).unwrap(), 0x50, 0)
            );
        }
        other => panic!("expected a patch switch, got {:?}", other),
    }
    assert_eq!(ctx.current_layer(), 0);

    let layers: Vec<usize> = (0..3)
        .map(|_| match ctx.select_patch(&variant, holder("Two Layers", 1)).unwrap() {
            SelectOutcome::LayerAdvance { layer, messages } => {
                assert_eq!(messages.len(), 1);
                layer
            }
            other => panic!("expected a layer advance, got {:?}", other),
        })
        .collect();

    assert_eq!(layers, vec![1, 0, 1]);
}

#[test]
fn test_other_patch_resets_layer() {
    let variant = TestSynth::new("Two Layers").with_layers(2).into_variant();
    let mut ctx = SessionContext::new();

    ctx.select_patch(&variant, holder("Two Layers", 1)).unwrap();
    ctx.select_patch(&variant, holder("Two Layers", 1)).unwrap();
    assert_eq!(ctx.current_layer(), 1);

    let outcome = ctx.select_patch(&variant, holder("Two Layers", 2)).unwrap();
    assert!(matches!(outcome, SelectOutcome::PatchSwitch { .. }));
    assert_eq!(ctx.current_layer(), 0);
    assert_eq!(ctx.compare_target().unwrap().name(), "T1");
}

#[test]
fn test_layer_changes_are_announced() {
    let variant = TestSynth::new("Three Layers").with_layers(3).into_variant();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut ctx = SessionContext::new();
    {
        let seen = Arc::clone(&seen);
        ctx.subscribe(move |event| seen.lock().unwrap().push(event.clone()));
    }

    let patch = holder("Three Layers", 9);
    let key = patch.key();
    ctx.select_patch(&variant, patch.clone()).unwrap();
    ctx.select_patch(&variant, patch).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            ContextEvent::PatchSelected { key: key.clone() },
            ContextEvent::LayerChanged { key, layer: 1 },
        ]
    );
}

#[test]
fn test_patch_spans_decide_layer_count_on_unlayered_synth() {
    let ob6 = native_variant("OB-6").unwrap();
    let patch = layered_holder("OB-6", vec![0; 1024]);
    let mut ctx = SessionContext::new();

    ctx.select_patch(&ob6, patch.clone()).unwrap();
    match ctx.select_patch(&ob6, patch.clone()).unwrap() {
        SelectOutcome::LayerAdvance { layer, .. } => assert_eq!(layer, 1),
        other => panic!("expected a layer advance, got {:?}", other),
    }
    ctx.select_patch(&ob6, patch).unwrap();
    assert_eq!(ctx.current_layer(), 0);
}

#[test]
fn test_layered_patches_diff_per_layer() {
    let variant = TestSynth::new("Two Layers").with_layers(2).into_variant();
    let a = vec![0u8; 8];
    let mut b = a.clone();
    b[1] = 5;
    b[6] = 7;

    let diff = compute_diff(
        &variant,
        &layered_holder("Two Layers", a),
        &layered_holder("Two Layers", b),
        DiffMode::AllParameters,
    );
    let PatchDiff::Compared { layers, .. } = diff else {
        panic!("expected a comparison");
    };

    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].title, "Part 1");
    assert_eq!(layers[1].title, "Part 2");
    assert!(matches!(&layers[0].entries[0].field, DiffField::Parameter { name, .. } if name == "Volume"));
    assert_eq!(layers[1].entries.len(), 1);
    assert_eq!(layers[1].entries[0].field, DiffField::ByteRange { start: 6, end: 7 });
    assert_eq!(layers[1].entries[0].value_b, vec![7]);
}
