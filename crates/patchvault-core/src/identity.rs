//! Patch identity
//!
//! `fingerprint = sha256(variant ‖ 0x00 ‖ voice-relevant bytes)`, hex encoded.
//! The variant id is part of the input so that identical byte blocks of two
//! models never collide in the store.

use crate::errors::Result;
use crate::model::{Fingerprint, PatchData};
use crate::variants::SynthVariant;
use sha2::{Digest, Sha256};

/// Fingerprint of already filtered bytes
pub fn fingerprint_bytes(variant: &str, voice_relevant: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(variant.as_bytes());
    hasher.update([0u8]);
    hasher.update(voice_relevant);
    Fingerprint::from_hex(hex::encode(hasher.finalize()))
}

/// Fingerprint of `patch` as captured from `variant`
///
/// # Errors
///
/// Fails only when the variant's filter fails (scripted variants).
pub fn fingerprint(variant: &SynthVariant, patch: &PatchData) -> Result<Fingerprint> {
    let filtered = variant.synth().filter_voice_relevant_data(patch)?;
    Ok(fingerprint_bytes(variant.name(), &filtered))
}
