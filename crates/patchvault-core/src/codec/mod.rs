//! Protocol codec
//!
//! Every synth variant implements [`Synth`]: the bit-exact translation
//! between wire messages and [`PatchData`], plus accessors for the optional
//! capabilities it supports. Wire numbering is zero-based; conversion to
//! display numbering happens in [`crate::model::numbering`] and nowhere else.

pub mod assembler;
pub mod dsi_packing;
pub mod shift_packing;

use crate::capability::{
    DataFileLoad, GlobalSettings, HasBanks, Layer, Masterkeyboard, SoundExpander,
};
use crate::errors::{PatchVaultError, Result};
use crate::midi::MidiMessage;
use crate::model::{MidiChannel, PatchData};
use serde::{Deserialize, Serialize};

/// Named byte range inside a decoded patch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub offset: usize,
    pub len: usize,
    /// False for bytes that do not change the sound, such as the name
    pub voice_relevant: bool,
}

impl ParameterDefinition {
    pub fn new(name: &str, offset: usize, len: usize) -> Self {
        Self {
            name: name.to_string(),
            offset,
            len,
            voice_relevant: true,
        }
    }

    pub fn non_voice(name: &str, offset: usize, len: usize) -> Self {
        Self {
            voice_relevant: false,
            ..Self::new(name, offset, len)
        }
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Wire codec and capability set of one synth model
pub trait Synth: Send + Sync {
    /// Stable variant id, also used in fingerprints and store keys
    fn name(&self) -> &str;

    /// Identity request to send when probing for the device
    ///
    /// # Errors
    ///
    /// Scripted variants fail when the adaptation cannot build the message.
    fn device_detect(&self, channel: MidiChannel) -> Result<Vec<MidiMessage>>;

    /// Channel advertised by an identity response, `None` if the response
    /// does not come from this model
    fn channel_if_valid_device_response(&self, message: &MidiMessage) -> Option<MidiChannel>;

    /// Decode a program dump or edit buffer dump
    ///
    /// # Errors
    ///
    /// Returns `Decode` when length, header or device id do not match.
    fn patch_from_sysex(&self, message: &MidiMessage) -> Result<PatchData>;

    /// Messages that load `patch` into the synth's edit buffer
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedDataType` when the patch is not a program.
    fn patch_to_sysex(&self, patch: &PatchData, channel: MidiChannel) -> Result<Vec<MidiMessage>>;

    /// Fingerprint input: the data with non-audible bytes blanked
    ///
    /// # Errors
    ///
    /// Scripted variants fail when the adaptation's fingerprint call fails.
    fn filter_voice_relevant_data(&self, data: &PatchData) -> Result<Vec<u8>>;

    /// Named parameters for the diff engine; empty means "diff raw bytes"
    fn parameters(&self) -> &[ParameterDefinition] {
        &[]
    }

    fn has_banks(&self) -> Option<&dyn HasBanks> {
        None
    }

    fn data_file_load(&self) -> Option<&dyn DataFileLoad> {
        None
    }

    fn layer(&self) -> Option<&dyn Layer> {
        None
    }

    fn global_settings(&self) -> Option<&dyn GlobalSettings> {
        None
    }

    fn sound_expander(&self) -> Option<&dyn SoundExpander> {
        None
    }

    fn masterkeyboard(&self) -> Option<&dyn Masterkeyboard> {
        None
    }
}

/// Copy of `bytes` with `range` zeroed, clamped to the data length
pub fn blank_range(bytes: &[u8], range: std::ops::Range<usize>) -> Vec<u8> {
    let mut filtered = bytes.to_vec();
    let end = range.end.min(filtered.len());
    let start = range.start.min(end);
    filtered[start..end].iter_mut().for_each(|b| *b = 0);
    filtered
}

/// ASCII name from a fixed-width field, trailing blanks and NULs trimmed
pub fn name_from_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if (0x20..0x7F).contains(&b) { b as char } else { ' ' })
        .collect::<String>()
        .trim_end()
        .to_string()
}

pub(crate) fn decode_error(variant: &str, reason: impl Into<String>) -> PatchVaultError {
    PatchVaultError::Decode {
        variant: variant.to_string(),
        reason: reason.into(),
    }
}
