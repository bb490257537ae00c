//! Variants backed by an external adaptation script
//!
//! The scripting runtime itself lives outside this crate. [`ScriptBridge`] is
//! the contract it must satisfy: call a named function with JSON arguments.
//! Every call runs under one process-wide lock because adaptation runtimes
//! are not re-entrant.

use crate::capability::{
    CapabilityResult, CapabilityTag, DataFileDescription, DataFileLoad, HasBanks, Layer,
};
use crate::codec::Synth;
use crate::errors::{CapabilityError, PatchVaultError, Result};
use crate::midi::{parse_stream, MidiMessage};
use crate::model::{BankNumber, DataType, LayerSpan, MidiChannel, PatchData, ProgramNumber};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

static SCRIPT_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Banks addressable with a 14-bit bank select
const MAX_BANKS: u32 = 1 << 14;

/// True while some thread is inside a bridge call
pub fn script_lock_is_held() -> bool {
    SCRIPT_LOCK.is_locked()
}

/// Call surface of an external adaptation runtime
pub trait ScriptBridge: Send + Sync {
    fn has_function(&self, name: &str) -> bool;

    /// Invoke `name` with positional JSON arguments
    ///
    /// # Errors
    ///
    /// Returns the runtime's error text when the call raises.
    fn call_method(&self, name: &str, args: &[Value]) -> std::result::Result<Value, String>;
}

mod functions {
    pub const NAME: &str = "name";
    pub const DEVICE_DETECT: &str = "createDeviceDetectMessage";
    pub const DEVICE_RESPONSE: &str = "channelIfValidDeviceResponse";
    pub const NUMBER_OF_BANKS: &str = "numberOfBanks";
    pub const PATCHES_PER_BANK: &str = "numberOfPatchesPerBank";
    pub const BANK_NAME: &str = "friendlyBankName";
    pub const IS_PROGRAM_DUMP: &str = "isSingleProgramDump";
    pub const IS_EDIT_BUFFER_DUMP: &str = "isEditBufferDump";
    pub const NAME_FROM_DUMP: &str = "nameFromDump";
    pub const NUMBER_FROM_DUMP: &str = "numberFromDump";
    pub const PROGRAM_DUMP_REQUEST: &str = "createProgramDumpRequest";
    pub const TO_EDIT_BUFFER: &str = "convertToEditBuffer";
    pub const TO_PROGRAM_DUMP: &str = "convertToProgramDump";
    pub const FINGERPRINT: &str = "calculateFingerprint";
    pub const BANK_DUMP_FINISHED: &str = "isBankDumpFinished";
    pub const NUMBER_OF_LAYERS: &str = "numberOfLayers";
    pub const LAYER_TITLES: &str = "layerTitles";
    pub const SWITCH_TO_LAYER: &str = "switchToLayer";

    pub const LOOKED_UP: [&str; 17] = [
        DEVICE_DETECT,
        DEVICE_RESPONSE,
        NUMBER_OF_BANKS,
        PATCHES_PER_BANK,
        BANK_NAME,
        IS_PROGRAM_DUMP,
        IS_EDIT_BUFFER_DUMP,
        NAME_FROM_DUMP,
        NUMBER_FROM_DUMP,
        PROGRAM_DUMP_REQUEST,
        TO_EDIT_BUFFER,
        TO_PROGRAM_DUMP,
        FINGERPRINT,
        BANK_DUMP_FINISHED,
        NUMBER_OF_LAYERS,
        LAYER_TITLES,
        SWITCH_TO_LAYER,
    ];
}

use functions as f;

/// Synth implemented by an adaptation script
///
/// Patch data of a scripted variant is the complete dump message; the
/// script owns its interpretation.
pub struct ScriptedSynth {
    bridge: Arc<dyn ScriptBridge>,
    name: String,
    functions: BTreeSet<&'static str>,
}

impl ScriptedSynth {
    /// Read the adaptation's name and the set of functions it provides
    ///
    /// # Errors
    ///
    /// Returns `Script` when `name` is missing or not a string.
    pub fn load(bridge: Arc<dyn ScriptBridge>) -> Result<Self> {
        let functions = {
            let _guard = SCRIPT_LOCK.lock();
            f::LOOKED_UP
                .into_iter()
                .filter(|name| bridge.has_function(name))
                .collect()
        };
        let mut synth = Self {
            bridge,
            name: String::new(),
            functions,
        };
        synth.name = synth
            .call(f::NAME, &[])?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| script_error(f::NAME, "expected a string"))?;
        Ok(synth)
    }

    pub fn provides(&self, function: &str) -> bool {
        self.functions.contains(function)
    }

    fn call(&self, function: &str, args: &[Value]) -> Result<Value> {
        let _guard = SCRIPT_LOCK.lock();
        tracing::trace!(variant = %self.name, function, "script call");
        self.bridge
            .call_method(function, args)
            .map_err(|message| script_error(function, message))
    }

    fn call_bool(&self, function: &str, args: &[Value]) -> Result<bool> {
        self.call(function, args)?
            .as_bool()
            .ok_or_else(|| script_error(function, "expected a boolean"))
    }

    fn call_int(&self, function: &str, args: &[Value]) -> Result<i64> {
        self.call(function, args)?
            .as_i64()
            .ok_or_else(|| script_error(function, "expected an integer"))
    }

    fn call_u32(&self, function: &str, args: &[Value]) -> Result<u32> {
        let value = self.call_int(function, args)?;
        u32::try_from(value).map_err(|_| script_error(function, format!("{} out of range", value)))
    }

    fn call_bytes(&self, function: &str, args: &[Value]) -> Result<Vec<u8>> {
        let value = self.call(function, args)?;
        let items = value
            .as_array()
            .ok_or_else(|| script_error(function, "expected a list of bytes"))?;
        items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| script_error(function, format!("{} is not a byte", item)))
            })
            .collect()
    }

    fn call_messages(&self, function: &str, args: &[Value]) -> Result<Vec<MidiMessage>> {
        Ok(parse_stream(&self.call_bytes(function, args)?))
    }

    fn is_program_dump(&self, message: &MidiMessage) -> Result<bool> {
        if !self.provides(f::IS_PROGRAM_DUMP) {
            return Ok(false);
        }
        self.call_bool(f::IS_PROGRAM_DUMP, &[bytes_arg(message.as_bytes())])
    }

    fn is_edit_buffer_dump(&self, message: &MidiMessage) -> Result<bool> {
        if !self.provides(f::IS_EDIT_BUFFER_DUMP) {
            return Ok(false);
        }
        self.call_bool(f::IS_EDIT_BUFFER_DUMP, &[bytes_arg(message.as_bytes())])
    }

    /// Bank dump completeness as judged by the adaptation
    ///
    /// # Errors
    ///
    /// Returns `Script` when the call fails.
    pub fn is_bank_dump_finished(&self, messages: &[MidiMessage]) -> Result<bool> {
        if !self.provides(f::BANK_DUMP_FINISHED) {
            return Ok(false);
        }
        let list: Vec<Value> = messages.iter().map(|m| bytes_arg(m.as_bytes())).collect();
        self.call_bool(f::BANK_DUMP_FINISHED, &[Value::Array(list)])
    }

    /// Split `message` evenly into the adaptation's layers
    ///
    /// Adaptations describe layers only by count and title, so every layer
    /// gets an equal share of the dump and the last one takes the remainder.
    fn layer_spans(&self, message: &MidiMessage) -> Vec<LayerSpan> {
        let layers = match self.number_of_layers() {
            Ok(layers) if layers > 1 && message.len() >= layers => layers,
            _ => return Vec::new(),
        };
        let titles = self.layer_titles().unwrap_or_default();
        let share = message.len() / layers;
        (0..layers)
            .map(|layer| {
                let start = layer * share;
                let len = if layer + 1 == layers {
                    message.len() - start
                } else {
                    share
                };
                LayerSpan {
                    title: titles
                        .get(layer)
                        .cloned()
                        .unwrap_or_else(|| format!("Layer {}", layer + 1)),
                    start,
                    len,
                }
            })
            .collect()
    }

    fn capability_error(tag: CapabilityTag, err: PatchVaultError) -> CapabilityError {
        CapabilityError::new(tag, err.to_string())
    }
}

fn script_error(function: &str, message: impl Into<String>) -> PatchVaultError {
    PatchVaultError::Script {
        function: function.to_string(),
        message: message.into(),
    }
}

fn bytes_arg(bytes: &[u8]) -> Value {
    Value::Array(bytes.iter().map(|&b| json!(b)).collect())
}

impl Synth for ScriptedSynth {
    fn name(&self) -> &str {
        &self.name
    }

    fn device_detect(&self, channel: MidiChannel) -> Result<Vec<MidiMessage>> {
        self.call_messages(f::DEVICE_DETECT, &[json!(channel.to_zero_based())])
    }

    fn channel_if_valid_device_response(&self, message: &MidiMessage) -> Option<MidiChannel> {
        let channel = self
            .call_int(f::DEVICE_RESPONSE, &[bytes_arg(message.as_bytes())])
            .ok()?;
        u8::try_from(channel)
            .ok()
            .and_then(MidiChannel::from_zero_based)
    }

    fn patch_from_sysex(&self, message: &MidiMessage) -> Result<PatchData> {
        let is_program = self.is_program_dump(message)?;
        if !is_program && !self.is_edit_buffer_dump(message)? {
            return Err(PatchVaultError::Decode {
                variant: self.name.clone(),
                reason: "adaptation does not recognise the message".to_string(),
            });
        }
        let name = if self.provides(f::NAME_FROM_DUMP) {
            self.call(f::NAME_FROM_DUMP, &[bytes_arg(message.as_bytes())])?
                .as_str()
                .map(|s| s.trim_end().to_string())
                .unwrap_or_default()
        } else {
            String::new()
        };
        let patch = PatchData::new(DataType::Patch, message.as_bytes().to_vec(), name)
            .with_layers(self.layer_spans(message));
        if is_program && self.provides(f::NUMBER_FROM_DUMP) && self.provides(f::PATCHES_PER_BANK)
        {
            let flat = self.call_u32(f::NUMBER_FROM_DUMP, &[bytes_arg(message.as_bytes())])?;
            let per_bank = self.call_u32(f::PATCHES_PER_BANK, &[])?;
            return Ok(patch.with_placement(ProgramNumber::from_flat(flat, per_bank)?));
        }
        Ok(patch)
    }

    fn patch_to_sysex(&self, patch: &PatchData, channel: MidiChannel) -> Result<Vec<MidiMessage>> {
        let message = bytes_arg(patch.bytes());
        if self.provides(f::TO_EDIT_BUFFER) {
            return self.call_messages(f::TO_EDIT_BUFFER, &[json!(channel.to_zero_based()), message]);
        }
        Ok(parse_stream(patch.bytes()))
    }

    fn filter_voice_relevant_data(&self, data: &PatchData) -> Result<Vec<u8>> {
        if !self.provides(f::FINGERPRINT) {
            return Ok(data.bytes().to_vec());
        }
        let digest = self.call(f::FINGERPRINT, &[bytes_arg(data.bytes())])?;
        digest
            .as_str()
            .map(|s| s.as_bytes().to_vec())
            .ok_or_else(|| script_error(f::FINGERPRINT, "expected a string"))
    }

    fn has_banks(&self) -> Option<&dyn HasBanks> {
        if self.provides(f::NUMBER_OF_BANKS) && self.provides(f::PATCHES_PER_BANK) {
            Some(self)
        } else {
            None
        }
    }

    fn data_file_load(&self) -> Option<&dyn DataFileLoad> {
        if self.provides(f::PROGRAM_DUMP_REQUEST) && self.provides(f::IS_PROGRAM_DUMP) {
            Some(self)
        } else {
            None
        }
    }

    fn layer(&self) -> Option<&dyn Layer> {
        if self.provides(f::NUMBER_OF_LAYERS) {
            Some(self)
        } else {
            None
        }
    }
}

impl HasBanks for ScriptedSynth {
    fn number_of_banks(&self) -> CapabilityResult<u32> {
        let banks = self
            .call_u32(f::NUMBER_OF_BANKS, &[])
            .map_err(|e| Self::capability_error(CapabilityTag::HasBanks, e))?;
        if banks > MAX_BANKS {
            return Err(CapabilityError::new(
                CapabilityTag::HasBanks,
                format!("numberOfBanks returned {}, at most {} are addressable", banks, MAX_BANKS),
            ));
        }
        Ok(banks)
    }

    fn number_of_patches(&self) -> CapabilityResult<u32> {
        self.call_u32(f::PATCHES_PER_BANK, &[])
            .map_err(|e| Self::capability_error(CapabilityTag::HasBanks, e))
    }

    fn friendly_bank_name(&self, bank: BankNumber) -> CapabilityResult<String> {
        if !self.provides(f::BANK_NAME) {
            return Ok(format!("Bank {}", bank.to_one_based()));
        }
        let value = self
            .call(f::BANK_NAME, &[json!(bank.to_zero_based())])
            .map_err(|e| Self::capability_error(CapabilityTag::HasBanks, e))?;
        value.as_str().map(str::to_string).ok_or_else(|| {
            CapabilityError::new(CapabilityTag::HasBanks, "friendlyBankName returned no string")
        })
    }
}

impl DataFileLoad for ScriptedSynth {
    fn data_type_names(&self) -> Vec<DataFileDescription> {
        vec![DataFileDescription {
            data_type: DataType::Patch,
            name: "Patch".to_string(),
            can_request: true,
            can_send: self.provides(f::TO_EDIT_BUFFER),
        }]
    }

    fn number_of_data_items(&self, data_type: DataType) -> CapabilityResult<u32> {
        if data_type != DataType::Patch {
            return Ok(0);
        }
        let banks = self.number_of_banks().unwrap_or(1);
        let per_bank = self.number_of_patches()?;
        banks.checked_mul(per_bank).ok_or_else(|| {
            CapabilityError::new(
                CapabilityTag::DataFileLoad,
                format!("{} banks of {} programs exceed the item range", banks, per_bank),
            )
        })
    }

    fn request_data_item(
        &self,
        item_no: u32,
        data_type: DataType,
        channel: MidiChannel,
    ) -> CapabilityResult<Vec<MidiMessage>> {
        if data_type != DataType::Patch {
            return Err(CapabilityError::new(
                CapabilityTag::DataFileLoad,
                format!("cannot request {}", data_type),
            ));
        }
        self.call_messages(
            f::PROGRAM_DUMP_REQUEST,
            &[json!(channel.to_zero_based()), json!(item_no)],
        )
        .map_err(|e| Self::capability_error(CapabilityTag::DataFileLoad, e))
    }

    fn is_data_file(&self, message: &MidiMessage, data_type: DataType) -> bool {
        data_type == DataType::Patch
            && (self.is_program_dump(message).unwrap_or(false)
                || self.is_edit_buffer_dump(message).unwrap_or(false))
    }

    fn decode_data_item(&self, message: &MidiMessage, data_type: DataType) -> Result<PatchData> {
        if data_type != DataType::Patch {
            return Err(PatchVaultError::UnsupportedDataType {
                variant: self.name.clone(),
                data_type: data_type.id(),
            });
        }
        self.patch_from_sysex(message)
    }
}

impl Layer for ScriptedSynth {
    fn number_of_layers(&self) -> CapabilityResult<usize> {
        let layers = self
            .call_u32(f::NUMBER_OF_LAYERS, &[])
            .map_err(|e| Self::capability_error(CapabilityTag::Layer, e))?;
        Ok(layers as usize)
    }

    fn layer_titles(&self) -> CapabilityResult<Vec<String>> {
        if !self.provides(f::LAYER_TITLES) {
            let layers = self.number_of_layers()?;
            return Ok((1..=layers).map(|l| format!("Layer {}", l)).collect());
        }
        let value = self
            .call(f::LAYER_TITLES, &[])
            .map_err(|e| Self::capability_error(CapabilityTag::Layer, e))?;
        value
            .as_array()
            .map(|titles| {
                titles
                    .iter()
                    .map(|t| t.as_str().unwrap_or_default().to_string())
                    .collect()
            })
            .ok_or_else(|| CapabilityError::new(CapabilityTag::Layer, "layerTitles returned no list"))
    }

    fn switch_to_layer(
        &self,
        layer: usize,
        channel: MidiChannel,
    ) -> CapabilityResult<Vec<MidiMessage>> {
        if !self.provides(f::SWITCH_TO_LAYER) {
            return Ok(Vec::new());
        }
        self.call_messages(
            f::SWITCH_TO_LAYER,
            &[json!(channel.to_zero_based()), json!(layer)],
        )
        .map_err(|e| Self::capability_error(CapabilityTag::Layer, e))
    }
}

impl ScriptedSynth {
    /// Program dump for slot `place`, as built by the adaptation
    ///
    /// # Errors
    ///
    /// Returns `Script` when the adaptation has no `convertToProgramDump` or
    /// the call fails.
    pub fn patch_to_program_dump(
        &self,
        patch: &PatchData,
        place: ProgramNumber,
        channel: MidiChannel,
    ) -> Result<Vec<MidiMessage>> {
        if !self.provides(f::TO_PROGRAM_DUMP) {
            return Err(script_error(f::TO_PROGRAM_DUMP, "not provided by adaptation"));
        }
        let per_bank = self.call_u32(f::PATCHES_PER_BANK, &[]).unwrap_or(0);
        let flat = place.to_flat(per_bank).ok_or_else(|| {
            script_error(f::TO_PROGRAM_DUMP, format!("program {} has no flat number", place))
        })?;
        self.call_messages(
            f::TO_PROGRAM_DUMP,
            &[json!(channel.to_zero_based()), bytes_arg(patch.bytes()), json!(flat)],
        )
    }
}
