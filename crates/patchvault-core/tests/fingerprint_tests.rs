#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{ob6_program, OB6_NAME_OFFSET};
use patchvault_core::identity::fingerprint_bytes;
use patchvault_core::model::{DataType, PatchData};
use patchvault_core::variants::native_variant;
use patchvault_core::fingerprint;
use proptest::prelude::*;

fn ob6_patch(bytes: Vec<u8>) -> PatchData {
    PatchData::new(DataType::Patch, bytes, "")
}

#[test]
fn test_renamed_patch_keeps_fingerprint() {
    let ob6 = native_variant("OB-6").unwrap();
    let original = ob6_patch(ob6_program(9, "Warm Pad"));
    let renamed = ob6_patch(ob6_program(9, "Cold Pad"));

    assert_eq!(
        fingerprint(&ob6, &original).unwrap(),
        fingerprint(&ob6, &renamed).unwrap()
    );
}

#[test]
fn test_sound_change_changes_fingerprint() {
    let ob6 = native_variant("OB-6").unwrap();
    let original = ob6_program(9, "Warm Pad");
    let mut brighter = original.clone();
    brighter[12] = 0x7F;

    assert_ne!(
        fingerprint(&ob6, &ob6_patch(original)).unwrap(),
        fingerprint(&ob6, &ob6_patch(brighter)).unwrap()
    );
}

#[test]
fn test_same_bytes_on_two_variants_do_not_collide() {
    let bytes = vec![0x11; 64];
    assert_ne!(fingerprint_bytes("OB-6", &bytes), fingerprint_bytes("Alesis Andromeda A6", &bytes));
}

proptest! {
    #[test]
    fn fingerprint_is_deterministic(data in proptest::collection::vec(0u8..0x80, 1024)) {
        let ob6 = native_variant("OB-6").unwrap();
        let a = fingerprint(&ob6, &ob6_patch(data.clone())).unwrap();
        let b = fingerprint(&ob6, &ob6_patch(data)).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn name_bytes_never_affect_fingerprint(
        data in proptest::collection::vec(0u8..0x80, 1024),
        name in proptest::collection::vec(0x20u8..0x7F, 20),
    ) {
        let ob6 = native_variant("OB-6").unwrap();
        let mut renamed = data.clone();
        renamed[OB6_NAME_OFFSET..OB6_NAME_OFFSET + 20].copy_from_slice(&name);
        prop_assert_eq!(
            fingerprint(&ob6, &ob6_patch(data)).unwrap(),
            fingerprint(&ob6, &ob6_patch(renamed)).unwrap()
        );
    }
}
