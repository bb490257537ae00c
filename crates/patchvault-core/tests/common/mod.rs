//! Shared helpers for patchvault-core integration tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use patchvault_core::capability::{CapabilityResult, HasBanks, Layer};
use patchvault_core::codec::{dsi_packing, ParameterDefinition, Synth};
use patchvault_core::errors::{CapabilityError, PatchVaultError, Result};
use patchvault_core::ingest::ProgressHandler;
use patchvault_core::model::{BankNumber, DataType, MidiChannel, PatchData};
use patchvault_core::{CapabilityTag, MidiMessage, SynthVariant};

#[allow(dead_code)]
pub const OB6_PROGRAM_LEN: usize = 1024;
#[allow(dead_code)]
pub const OB6_NAME_OFFSET: usize = 107;

/// Raw 1024 byte OB-6 program filled with `seed`, named `name`
#[allow(dead_code)]
pub fn ob6_program(seed: u8, name: &str) -> Vec<u8> {
    let mut data = vec![seed & 0x7F; OB6_PROGRAM_LEN];
    let mut padded = [b' '; 20];
    for (slot, byte) in padded.iter_mut().zip(name.bytes()) {
        *slot = byte;
    }
    data[OB6_NAME_OFFSET..OB6_NAME_OFFSET + 20].copy_from_slice(&padded);
    data
}

/// OB-6 program dump for bank 0 program `program`
#[allow(dead_code)]
pub fn ob6_dump(program: u8, data: &[u8]) -> MidiMessage {
    let mut body = vec![0x01, 0x2E, 0x02, 0x00, program];
    body.extend(dsi_packing::pack(data));
    MidiMessage::sysex(&body)
}

/// A message no codec accepts
#[allow(dead_code)]
pub fn garbage_dump() -> MidiMessage {
    MidiMessage::sysex(&[0x7D, 0x01, 0x02])
}

/// Progress handler that records fractions and can abort after N polls
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingProgress {
    pub fractions: Mutex<Vec<f64>>,
    polls: AtomicUsize,
    abort_after: Option<usize>,
    aborted: AtomicBool,
}

#[allow(dead_code)]
impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an abort once `should_abort` was polled `polls` times
    pub fn aborting_after(polls: usize) -> Self {
        Self {
            abort_after: Some(polls),
            ..Self::default()
        }
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }
}

impl ProgressHandler for RecordingProgress {
    fn set_progress(&self, fraction: f64) {
        self.fractions.lock().push(fraction);
    }

    fn should_abort(&self) -> bool {
        let polled = self.polls.fetch_add(1, Ordering::SeqCst);
        if self.abort_after.is_some_and(|limit| polled >= limit) {
            return true;
        }
        self.aborted.load(Ordering::SeqCst)
    }
}

/// Minimal synth used to exercise capability dispatch
///
/// Patches are the raw message bytes. `layers` > 0 declares the Layer
/// capability; `broken_banks` declares HasBanks with failing calls.
#[allow(dead_code)]
pub struct TestSynth {
    pub name: &'static str,
    pub layers: usize,
    pub broken_banks: bool,
    parameters: Vec<ParameterDefinition>,
}

#[allow(dead_code)]
impl TestSynth {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            layers: 0,
            broken_banks: false,
            parameters: vec![
                ParameterDefinition::new("Volume", 1, 1),
                ParameterDefinition::new("Cutoff", 2, 1),
            ],
        }
    }

    pub fn with_layers(mut self, layers: usize) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_broken_banks(mut self) -> Self {
        self.broken_banks = true;
        self
    }

    pub fn into_variant(self) -> SynthVariant {
        SynthVariant::new(Arc::new(self))
    }
}

impl Synth for TestSynth {
    fn name(&self) -> &str {
        self.name
    }

    fn device_detect(&self, _channel: MidiChannel) -> Result<Vec<MidiMessage>> {
        Ok(Vec::new())
    }

    fn channel_if_valid_device_response(&self, _message: &MidiMessage) -> Option<MidiChannel> {
        None
    }

    fn patch_from_sysex(&self, message: &MidiMessage) -> Result<PatchData> {
        if !message.is_sysex() || message.len() < 4 {
            return Err(PatchVaultError::Decode {
                variant: self.name.to_string(),
                reason: "too short".to_string(),
            });
        }
        Ok(PatchData::new(
            DataType::Patch,
            message.as_bytes().to_vec(),
            format!("T{}", message.as_bytes()[1]),
        ))
    }

    fn patch_to_sysex(&self, patch: &PatchData, _channel: MidiChannel) -> Result<Vec<MidiMessage>> {
        Ok(vec![MidiMessage::new(patch.bytes().to_vec())])
    }

    fn filter_voice_relevant_data(&self, data: &PatchData) -> Result<Vec<u8>> {
        Ok(data.bytes().to_vec())
    }

    fn parameters(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    fn has_banks(&self) -> Option<&dyn HasBanks> {
        self.broken_banks.then_some(self as &dyn HasBanks)
    }

    fn layer(&self) -> Option<&dyn Layer> {
        (self.layers > 0).then_some(self as &dyn Layer)
    }
}

impl HasBanks for TestSynth {
    fn number_of_banks(&self) -> CapabilityResult<u32> {
        Err(CapabilityError::new(CapabilityTag::HasBanks, "bank table unreadable"))
    }

    fn number_of_patches(&self) -> CapabilityResult<u32> {
        Err(CapabilityError::new(CapabilityTag::HasBanks, "bank table unreadable"))
    }

    fn friendly_bank_name(&self, _bank: BankNumber) -> CapabilityResult<String> {
        Err(CapabilityError::new(CapabilityTag::HasBanks, "bank table unreadable"))
    }
}

impl Layer for TestSynth {
    fn number_of_layers(&self) -> CapabilityResult<usize> {
        Ok(self.layers)
    }

    fn layer_titles(&self) -> CapabilityResult<Vec<String>> {
        Ok((0..self.layers).map(|i| format!("Part {}", i + 1)).collect())
    }

    fn switch_to_layer(
        &self,
        layer: usize,
        channel: MidiChannel,
    ) -> CapabilityResult<Vec<MidiMessage>> {
        Ok(vec![MidiMessage::control_change(channel, 0x50, layer as u8)])
    }
}
