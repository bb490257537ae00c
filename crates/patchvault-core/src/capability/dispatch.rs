//! Capability calls with safe defaults
//!
//! Batch operations iterate over every active variant. A variant that lacks a
//! capability, or whose implementation fails, gets the neutral default below
//! and a warning naming the caller, the variant and the capability. The batch
//! goes on.
//!
//! | call                    | default        |
//! |-------------------------|----------------|
//! | `number_of_banks`       | 1              |
//! | `number_of_patches`     | 0              |
//! | `friendly_bank_name`    | `"Bank <n>"`   |
//! | `data_files`            | none           |
//! | `number_of_layers`      | 1              |
//! | message producers       | no messages    |

use super::{CapabilityResult, CapabilityTag, DataFileDescription};
use crate::midi::MidiMessage;
use crate::model::{BankNumber, MidiChannel, ProgramNumber};
use crate::variants::SynthVariant;
use crate::log_capability_fallback;

fn or_default<T>(
    variant: &SynthVariant,
    caller: &str,
    tag: CapabilityTag,
    result: Option<CapabilityResult<T>>,
    default: impl FnOnce() -> T,
) -> T {
    match result {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            log_capability_fallback!(caller, variant.name(), tag.name(), e);
            default()
        }
        None => {
            log_capability_fallback!(caller, variant.name(), tag.name());
            default()
        }
    }
}

pub fn number_of_banks(variant: &SynthVariant, caller: &str) -> u32 {
    let result = variant.has_banks().map(|c| c.number_of_banks());
    or_default(variant, caller, CapabilityTag::HasBanks, result, || 1)
}

/// Programs per bank
pub fn number_of_patches(variant: &SynthVariant, caller: &str) -> u32 {
    let result = variant.has_banks().map(|c| c.number_of_patches());
    or_default(variant, caller, CapabilityTag::HasBanks, result, || 0)
}

pub fn friendly_bank_name(variant: &SynthVariant, caller: &str, bank: BankNumber) -> String {
    let result = variant.has_banks().map(|c| c.friendly_bank_name(bank));
    or_default(variant, caller, CapabilityTag::HasBanks, result, || {
        format!("Bank {}", bank.to_one_based())
    })
}

/// One `(bank, name)` pair per bank of `variant`
pub fn bank_list(variant: &SynthVariant, caller: &str) -> Vec<(BankNumber, String)> {
    (0..number_of_banks(variant, caller))
        .map(BankNumber::from_zero_based)
        .map(|bank| (bank, friendly_bank_name(variant, caller, bank)))
        .collect()
}

/// Program slot as shown to the user: bank name, then the zero-based number
/// inside the bank
///
/// A flat placement is split into banks first when the variant knows its
/// bank size.
pub fn friendly_program_name(variant: &SynthVariant, caller: &str, place: ProgramNumber) -> String {
    let place = match place.bank() {
        Some(_) => place,
        None => ProgramNumber::from_flat(place.to_zero_based(), number_of_patches(variant, caller))
            .unwrap_or(place),
    };
    match place.bank() {
        Some(bank) => format!(
            "{} {:03}",
            friendly_bank_name(variant, caller, bank),
            place.to_zero_based()
        ),
        None => format!("{:03}", place.to_zero_based()),
    }
}

/// Data blocks the variant can load, for pickers and `synths` listings
pub fn data_files(variant: &SynthVariant, caller: &str) -> Vec<DataFileDescription> {
    let result = variant.data_file_load().map(|c| Ok(c.data_type_names()));
    or_default(variant, caller, CapabilityTag::DataFileLoad, result, Vec::new)
}

pub fn number_of_layers(variant: &SynthVariant, caller: &str) -> usize {
    let result = variant.layer().map(|c| c.number_of_layers());
    or_default(variant, caller, CapabilityTag::Layer, result, || 1).max(1)
}

pub fn layer_titles(variant: &SynthVariant, caller: &str) -> Vec<String> {
    let result = variant.layer().map(|c| c.layer_titles());
    or_default(variant, caller, CapabilityTag::Layer, result, Vec::new)
}

pub fn switch_to_layer(variant: &SynthVariant, caller: &str, layer: usize) -> Vec<MidiMessage> {
    let channel = variant.channel_or_default();
    let result = variant.layer().map(|c| c.switch_to_layer(layer, channel));
    or_default(variant, caller, CapabilityTag::Layer, result, Vec::new)
}

pub fn change_input_channel(
    variant: &SynthVariant,
    caller: &str,
    new_channel: MidiChannel,
) -> Vec<MidiMessage> {
    let current = variant.channel_or_default();
    let result = variant
        .sound_expander()
        .map(|c| c.change_input_channel(current, new_channel));
    or_default(variant, caller, CapabilityTag::SoundExpander, result, Vec::new)
}

pub fn set_midi_control(variant: &SynthVariant, caller: &str, on: bool) -> Vec<MidiMessage> {
    let channel = variant.channel_or_default();
    let result = variant
        .sound_expander()
        .map(|c| c.set_midi_control(channel, on));
    or_default(variant, caller, CapabilityTag::SoundExpander, result, Vec::new)
}

pub fn change_output_channel(
    variant: &SynthVariant,
    caller: &str,
    new_channel: MidiChannel,
) -> Vec<MidiMessage> {
    let current = variant.channel_or_default();
    let result = variant
        .masterkeyboard()
        .map(|c| c.change_output_channel(current, new_channel));
    or_default(variant, caller, CapabilityTag::Masterkeyboard, result, Vec::new)
}

pub fn set_local_control(variant: &SynthVariant, caller: &str, on: bool) -> Vec<MidiMessage> {
    let channel = variant.channel_or_default();
    let result = variant
        .masterkeyboard()
        .map(|c| c.set_local_control(channel, on));
    or_default(variant, caller, CapabilityTag::Masterkeyboard, result, Vec::new)
}

/// Global settings request, empty when unsupported
pub fn request_global_settings(variant: &SynthVariant, caller: &str) -> Vec<MidiMessage> {
    let channel = variant.channel_or_default();
    let result = variant
        .global_settings()
        .map(|c| c.request_global_settings(channel));
    or_default(variant, caller, CapabilityTag::GlobalSettings, result, Vec::new)
}
