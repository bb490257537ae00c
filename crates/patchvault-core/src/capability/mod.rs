//! Capability model
//!
//! A synth variant implements zero or more narrow capability contracts.
//! Callers never cast: they ask the variant for a capability by tag and get
//! an optional handle back. The [`dispatch`] module wraps those handles with
//! the fallback policy used by batch operations.

pub mod dispatch;

use crate::codec::assembler::SysexAssembler;
use crate::errors::{CapabilityError, PatchVaultError, Result};
use crate::midi::MidiMessage;
use crate::model::{BankNumber, DataType, MidiChannel, PatchData};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type CapabilityResult<T> = std::result::Result<T, CapabilityError>;

/// Names of the optional capability contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CapabilityTag {
    DataFileLoad,
    HasBanks,
    Layer,
    GlobalSettings,
    SoundExpander,
    Masterkeyboard,
}

impl CapabilityTag {
    pub const ALL: [CapabilityTag; 6] = [
        CapabilityTag::DataFileLoad,
        CapabilityTag::HasBanks,
        CapabilityTag::Layer,
        CapabilityTag::GlobalSettings,
        CapabilityTag::SoundExpander,
        CapabilityTag::Masterkeyboard,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CapabilityTag::DataFileLoad => "DataFileLoad",
            CapabilityTag::HasBanks => "HasBanks",
            CapabilityTag::Layer => "Layer",
            CapabilityTag::GlobalSettings => "GlobalSettings",
            CapabilityTag::SoundExpander => "SoundExpander",
            CapabilityTag::Masterkeyboard => "Masterkeyboard",
        }
    }
}

impl std::fmt::Display for CapabilityTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared capability set of a variant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<CapabilityTag>);

impl CapabilitySet {
    pub fn contains(&self, tag: CapabilityTag) -> bool {
        self.0.contains(&tag)
    }

    pub fn insert(&mut self, tag: CapabilityTag) {
        self.0.insert(tag);
    }

    pub fn iter(&self) -> impl Iterator<Item = CapabilityTag> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<CapabilityTag> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = CapabilityTag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Banked program memory
pub trait HasBanks: Send + Sync {
    fn number_of_banks(&self) -> CapabilityResult<u32>;
    /// Programs per bank
    fn number_of_patches(&self) -> CapabilityResult<u32>;
    fn friendly_bank_name(&self, bank: BankNumber) -> CapabilityResult<String>;
}

/// One loadable data type as shown in a file-type picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFileDescription {
    pub data_type: DataType,
    pub name: String,
    pub can_request: bool,
    pub can_send: bool,
}

/// Requesting and loading data blocks other than (or besides) programs
pub trait DataFileLoad: Send + Sync {
    fn data_type_names(&self) -> Vec<DataFileDescription>;

    fn number_of_data_items(&self, data_type: DataType) -> CapabilityResult<u32>;

    fn request_data_item(
        &self,
        item_no: u32,
        data_type: DataType,
        channel: MidiChannel,
    ) -> CapabilityResult<Vec<MidiMessage>>;

    /// Cheap header check, no decoding
    fn is_data_file(&self, message: &MidiMessage, data_type: DataType) -> bool;

    /// Decode one complete frame that passed `is_data_file`
    ///
    /// # Errors
    ///
    /// Returns `Decode` when the frame does not match the expected layout.
    fn decode_data_item(&self, message: &MidiMessage, data_type: DataType) -> Result<PatchData>;

    /// Reassemble frames from possibly fragmented messages and decode every
    /// frame of the requested type, in arrival order
    ///
    /// A frame that exceeds `max_buffered_bytes` or fails to decode yields an
    /// `Err` entry in its position; other frames are unaffected.
    fn load_data(
        &self,
        messages: &[MidiMessage],
        data_type: DataType,
        max_buffered_bytes: usize,
    ) -> Vec<Result<PatchData>> {
        let mut assembler = SysexAssembler::new(max_buffered_bytes);
        let mut loaded = Vec::new();
        for message in messages {
            for frame in assembler.push(message.as_bytes()) {
                match frame {
                    Ok(frame) if self.is_data_file(&frame, data_type) => {
                        loaded.push(self.decode_data_item(&frame, data_type));
                    }
                    Ok(_) => {}
                    Err(e) => loaded.push(Err(e)),
                }
            }
        }
        if let Some(pending) = assembler.pending_len() {
            loaded.push(Err(PatchVaultError::IncompleteFrame { buffered: pending }));
        }
        loaded
    }
}

/// Multi-timbral patches made of independently addressable layers
pub trait Layer: Send + Sync {
    fn number_of_layers(&self) -> CapabilityResult<usize>;
    fn layer_titles(&self) -> CapabilityResult<Vec<String>>;
    fn switch_to_layer(
        &self,
        layer: usize,
        channel: MidiChannel,
    ) -> CapabilityResult<Vec<MidiMessage>>;
}

/// One decoded global setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingValue {
    pub name: String,
    pub value: i32,
    pub display: String,
}

/// Device-wide settings living outside programs
pub trait GlobalSettings: Send + Sync {
    fn settings_data_type(&self) -> DataType;
    fn request_global_settings(&self, channel: MidiChannel)
        -> CapabilityResult<Vec<MidiMessage>>;
    fn global_settings(&self, data: &PatchData) -> CapabilityResult<Vec<SettingValue>>;
}

/// Sound generator that can be driven from another keyboard
pub trait SoundExpander: Send + Sync {
    fn change_input_channel(
        &self,
        current: MidiChannel,
        new_channel: MidiChannel,
    ) -> CapabilityResult<Vec<MidiMessage>>;
    fn set_midi_control(
        &self,
        channel: MidiChannel,
        on: bool,
    ) -> CapabilityResult<Vec<MidiMessage>>;
}

/// Keyboard that can drive other sound generators
pub trait Masterkeyboard: Send + Sync {
    fn change_output_channel(
        &self,
        current: MidiChannel,
        new_channel: MidiChannel,
    ) -> CapabilityResult<Vec<MidiMessage>>;
    fn set_local_control(
        &self,
        channel: MidiChannel,
        on: bool,
    ) -> CapabilityResult<Vec<MidiMessage>>;
}
