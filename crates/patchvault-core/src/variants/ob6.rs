//! Sequential (DSI) OB-6
//!
//! Programs travel in the DSI packed-MS-bit format. Alternate tunings use the
//! MIDI Tuning Standard bulk dump; global parameters are changed over NRPN.

use crate::capability::{
    CapabilityResult, DataFileDescription, DataFileLoad, GlobalSettings, HasBanks,
    Masterkeyboard, SettingValue, SoundExpander,
};
use crate::codec::{
    blank_range, decode_error, dsi_packing, name_from_bytes, ParameterDefinition, Synth,
};
use crate::errors::{PatchVaultError, Result};
use crate::midi::{nrpn, MidiMessage};
use crate::model::{BankNumber, DataType, MidiChannel, PatchData, ProgramNumber};

const NAME: &str = "OB-6";

const DSI_ID: u8 = 0x01;
const OB6_ID: u8 = 0x2E;

const PROGRAM_DUMP: u8 = 0x02;
const EDIT_BUFFER_DUMP: u8 = 0x03;
const PROGRAM_DUMP_REQUEST: u8 = 0x05;
const GLOBAL_PARAMETER_REQUEST: u8 = 0x0E;
const GLOBAL_PARAMETER_DUMP: u8 = 0x0F;

const BANKS: u32 = 10;
const PROGRAMS_PER_BANK: u32 = 100;

const PROGRAM_LEN: usize = 1024;
const NAME_OFFSET: usize = 107;
const NAME_LEN: usize = 20;

/// `F0 01 2E 02 bank prog <1171> F7`
const PROGRAM_DUMP_LEN: usize = 6 + 1171 + 1;
/// `F0 01 2E 03 <1171> F7`
const EDIT_BUFFER_DUMP_LEN: usize = 4 + 1171 + 1;

// MIDI Tuning Standard bulk dump
const MTS_SUB_ID: u8 = 0x08;
const MTS_BULK_DUMP: u8 = 0x01;
const MTS_BULK_REQUEST: u8 = 0x00;
const TUNING_SLOTS: u32 = 17;
const TUNING_NAME_LEN: usize = 16;
const TUNING_DATA_LEN: usize = 128 * 3;
/// `F0 7E dev 08 01 slot <16 name> <384 data> checksum F7`
const TUNING_DUMP_LEN: usize = 6 + TUNING_NAME_LEN + TUNING_DATA_LEN + 2;

/// One global parameter: position in the global dump and its NRPN
struct GlobalParam {
    name: &'static str,
    nrpn: u16,
    max: u8,
    labels: &'static [&'static str],
}

const GLOBAL_PARAMS: &[GlobalParam] = &[
    GlobalParam { name: "Master Transpose", nrpn: 1024, max: 24, labels: &[] },
    GlobalParam { name: "Master Fine Tune", nrpn: 1025, max: 100, labels: &[] },
    GlobalParam { name: "MIDI Channel", nrpn: 1026, max: 16, labels: &["Omni"] },
    GlobalParam {
        name: "MIDI Clock Mode",
        nrpn: 1027,
        max: 4,
        labels: &["Off", "Master", "Slave", "Slave Thru", "Slave No S/S"],
    },
    GlobalParam { name: "MIDI Clock Cable", nrpn: 1028, max: 1, labels: &["MIDI", "USB"] },
    GlobalParam {
        name: "MIDI Param Send",
        nrpn: 1029,
        max: 2,
        labels: &["Off", "CC", "NRPN"],
    },
    GlobalParam {
        name: "MIDI Param Receive",
        nrpn: 1030,
        max: 2,
        labels: &["Off", "CC", "NRPN"],
    },
    GlobalParam { name: "MIDI Control Enable", nrpn: 1031, max: 1, labels: &["Off", "On"] },
    GlobalParam { name: "MIDI Sysex Cable", nrpn: 1032, max: 1, labels: &["MIDI", "USB"] },
    GlobalParam {
        name: "MIDI Out Select",
        nrpn: 1033,
        max: 2,
        labels: &["MIDI", "USB", "MIDI+USB"],
    },
    GlobalParam { name: "Local Control", nrpn: 1034, max: 1, labels: &["Off", "On"] },
    GlobalParam {
        name: "Seq Jack",
        nrpn: 1035,
        max: 4,
        labels: &["Normal", "Tri", "Gate", "Gate/Tri", "Off"],
    },
    GlobalParam {
        name: "Pot Mode",
        nrpn: 1036,
        max: 2,
        labels: &["Relative", "Pass Thru", "Jump"],
    },
    GlobalParam {
        name: "Sustain Polarity",
        nrpn: 1037,
        max: 3,
        labels: &["Normal", "Reversed", "Normal-Arp", "Reversed-Arp"],
    },
    GlobalParam { name: "Alt Tuning", nrpn: 1038, max: 16, labels: &[] },
    GlobalParam { name: "Velocity Response", nrpn: 1039, max: 7, labels: &[] },
    GlobalParam { name: "Aftertouch Response", nrpn: 1040, max: 3, labels: &[] },
    GlobalParam { name: "Stereo/Mono", nrpn: 1041, max: 1, labels: &["Stereo", "Mono"] },
    GlobalParam { name: "Arp Beat Sync", nrpn: 1042, max: 1, labels: &["Off", "Quantize"] },
];

const MIDI_CHANNEL_PARAM: usize = 2;
const MIDI_CONTROL_PARAM: usize = 7;
const LOCAL_CONTROL_PARAM: usize = 10;

/// OB-6 codec and capabilities
pub struct Ob6 {
    parameters: Vec<ParameterDefinition>,
}

impl Ob6 {
    pub fn new() -> Self {
        Self {
            parameters: program_parameters(),
        }
    }

    fn header(command: u8) -> [u8; 4] {
        [0xF0, DSI_ID, OB6_ID, command]
    }

    fn is_own(message: &MidiMessage, command: u8) -> bool {
        message.starts_with(&Self::header(command))
    }

    /// Request for flat program `flat`, wrapped around the bank range
    fn program_dump_request(&self, flat: u32) -> MidiMessage {
        let flat = flat % (BANKS * PROGRAMS_PER_BANK);
        MidiMessage::sysex(&[
            DSI_ID,
            OB6_ID,
            PROGRAM_DUMP_REQUEST,
            (flat / PROGRAMS_PER_BANK) as u8,
            (flat % PROGRAMS_PER_BANK) as u8,
        ])
    }

    fn global_parameter_request(&self) -> MidiMessage {
        MidiMessage::sysex(&[DSI_ID, OB6_ID, GLOBAL_PARAMETER_REQUEST])
    }

    fn require_program(&self, patch: &PatchData) -> Result<()> {
        if patch.data_type() != DataType::Patch || patch.bytes().len() != PROGRAM_LEN {
            return Err(PatchVaultError::UnsupportedDataType {
                variant: NAME.to_string(),
                data_type: patch.data_type().id(),
            });
        }
        Ok(())
    }

    fn decode_program(&self, message: &MidiMessage) -> Result<PatchData> {
        let bytes = message.as_bytes();
        let (placement, packed) = if Self::is_own(message, PROGRAM_DUMP) {
            if bytes.len() != PROGRAM_DUMP_LEN {
                return Err(decode_error(
                    NAME,
                    format!("program dump has {} bytes, expected {}", bytes.len(), PROGRAM_DUMP_LEN),
                ));
            }
            let (bank, program) = (u32::from(bytes[4]), u32::from(bytes[5]));
            if bank >= BANKS || program >= PROGRAMS_PER_BANK {
                return Err(decode_error(
                    NAME,
                    format!("program dump addresses bank {} program {}", bank, program),
                ));
            }
            let place = ProgramNumber::in_bank(BankNumber::from_zero_based(bank), program);
            (Some(place), &bytes[6..bytes.len() - 1])
        } else if Self::is_own(message, EDIT_BUFFER_DUMP) {
            if bytes.len() != EDIT_BUFFER_DUMP_LEN {
                return Err(decode_error(
                    NAME,
                    format!(
                        "edit buffer dump has {} bytes, expected {}",
                        bytes.len(),
                        EDIT_BUFFER_DUMP_LEN
                    ),
                ));
            }
            (None, &bytes[4..bytes.len() - 1])
        } else {
            return Err(decode_error(NAME, "not an OB-6 program or edit buffer dump"));
        };

        if !message.is_sysex() {
            return Err(decode_error(NAME, "dump is not terminated by F7"));
        }
        let data = dsi_packing::unpack(packed);
        let name = name_from_bytes(&data[NAME_OFFSET..NAME_OFFSET + NAME_LEN]);
        let patch = PatchData::new(DataType::Patch, data, name);
        Ok(match placement {
            Some(place) => patch.with_placement(place),
            None => patch,
        })
    }

    fn decode_global_settings(&self, message: &MidiMessage) -> Result<PatchData> {
        let bytes = message.as_bytes();
        if !Self::is_own(message, GLOBAL_PARAMETER_DUMP) || !message.is_sysex() {
            return Err(decode_error(NAME, "not an OB-6 global parameter dump"));
        }
        let data = dsi_packing::unpack(&bytes[4..bytes.len() - 1]);
        if data.len() < GLOBAL_PARAMS.len() {
            return Err(decode_error(
                NAME,
                format!("global dump carries {} of {} values", data.len(), GLOBAL_PARAMS.len()),
            ));
        }
        Ok(PatchData::new(DataType::GlobalSettings, data, "Global Settings"))
    }

    fn is_tuning_dump(message: &MidiMessage) -> bool {
        let bytes = message.as_bytes();
        bytes.len() == TUNING_DUMP_LEN
            && bytes[0] == 0xF0
            && bytes[1] == 0x7E
            && bytes[3] == MTS_SUB_ID
            && bytes[4] == MTS_BULK_DUMP
    }

    fn decode_tuning(&self, message: &MidiMessage) -> Result<PatchData> {
        if !Self::is_tuning_dump(message) || !message.is_sysex() {
            return Err(decode_error(NAME, "not a MIDI tuning bulk dump"));
        }
        let bytes = message.as_bytes();
        let checksum_at = TUNING_DUMP_LEN - 2;
        let expected = tuning_checksum(&bytes[1..checksum_at]);
        if bytes[checksum_at] != expected {
            return Err(decode_error(
                NAME,
                format!(
                    "tuning checksum {:02X} does not match {:02X}",
                    bytes[checksum_at], expected
                ),
            ));
        }
        let slot = u32::from(bytes[5]);
        let payload = bytes[6..checksum_at].to_vec();
        let name = name_from_bytes(&payload[..TUNING_NAME_LEN]);
        Ok(PatchData::new(DataType::AlternateTuning, payload, name)
            .with_placement(ProgramNumber::from_zero_based(slot)))
    }

    fn tuning_to_sysex(&self, tuning: &PatchData) -> Result<MidiMessage> {
        let payload = tuning.bytes();
        if payload.len() != TUNING_NAME_LEN + TUNING_DATA_LEN {
            return Err(decode_error(NAME, "tuning payload has the wrong size"));
        }
        let slot = tuning.placement().map(|p| p.to_zero_based()).unwrap_or(0);
        if slot >= TUNING_SLOTS {
            return Err(PatchVaultError::InvalidNumber {
                kind: "tuning slot",
                value: i64::from(slot),
            });
        }
        let slot = slot as u8;
        let mut body = vec![0x7E, 0x7F, MTS_SUB_ID, MTS_BULK_DUMP, slot];
        body.extend(payload.iter().map(|b| b & 0x7F));
        body.push(tuning_checksum(&body));
        Ok(MidiMessage::sysex(&body))
    }

    fn global_value(&self, param: usize, value: u16, channel: MidiChannel) -> Vec<MidiMessage> {
        nrpn(channel, GLOBAL_PARAMS[param].nrpn, value)
    }
}

impl Default for Ob6 {
    fn default() -> Self {
        Self::new()
    }
}

/// XOR of everything from the `7E` sub-id through the last data byte
fn tuning_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b) & 0x7F
}

fn program_parameters() -> Vec<ParameterDefinition> {
    let mut parameters: Vec<ParameterDefinition> = [
        "Osc 1 Frequency",
        "Osc 1 Fine",
        "Osc 1 Shape",
        "Osc 1 Pulse Width",
        "Osc 2 Frequency",
        "Osc 2 Fine",
        "Osc 2 Shape",
        "Osc 2 Pulse Width",
        "Osc Sync",
        "Sub Osc Level",
        "Noise Level",
        "Glide",
        "Filter Cutoff",
        "Filter Resonance",
        "Filter Env Amount",
        "Filter Mode",
        "Filter Attack",
        "Filter Decay",
        "Filter Sustain",
        "Filter Release",
        "Amp Attack",
        "Amp Decay",
        "Amp Sustain",
        "Amp Release",
        "LFO Frequency",
        "LFO Shape",
        "LFO Amount",
        "Distortion",
    ]
    .iter()
    .enumerate()
    .map(|(offset, name)| ParameterDefinition::new(name, offset, 1))
    .collect();
    parameters.push(ParameterDefinition::non_voice("Name", NAME_OFFSET, NAME_LEN));
    parameters
}

impl Synth for Ob6 {
    fn name(&self) -> &str {
        NAME
    }

    fn device_detect(&self, _channel: MidiChannel) -> Result<Vec<MidiMessage>> {
        // The OB-6 does not answer the universal inquiry; its global dump carries the channel
        Ok(vec![self.global_parameter_request()])
    }

    fn channel_if_valid_device_response(&self, message: &MidiMessage) -> Option<MidiChannel> {
        let globals = self.decode_global_settings(message).ok()?;
        match globals.bytes()[MIDI_CHANNEL_PARAM] {
            0 => MidiChannel::from_zero_based(0),
            one_based => MidiChannel::from_one_based(one_based),
        }
    }

    fn patch_from_sysex(&self, message: &MidiMessage) -> Result<PatchData> {
        self.decode_program(message)
    }

    fn patch_to_sysex(&self, patch: &PatchData, _channel: MidiChannel) -> Result<Vec<MidiMessage>> {
        if patch.data_type() == DataType::AlternateTuning {
            return Ok(vec![self.tuning_to_sysex(patch)?]);
        }
        self.require_program(patch)?;
        let mut body = vec![DSI_ID, OB6_ID, EDIT_BUFFER_DUMP];
        body.extend(dsi_packing::pack(patch.bytes()));
        Ok(vec![MidiMessage::sysex(&body)])
    }

    fn filter_voice_relevant_data(&self, data: &PatchData) -> Result<Vec<u8>> {
        Ok(match data.data_type() {
            DataType::Patch => {
                blank_range(data.bytes(), NAME_OFFSET..NAME_OFFSET + NAME_LEN)
            }
            DataType::AlternateTuning => blank_range(data.bytes(), 0..TUNING_NAME_LEN),
            _ => data.bytes().to_vec(),
        })
    }

    fn parameters(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    fn has_banks(&self) -> Option<&dyn HasBanks> {
        Some(self)
    }

    fn data_file_load(&self) -> Option<&dyn DataFileLoad> {
        Some(self)
    }

    fn global_settings(&self) -> Option<&dyn GlobalSettings> {
        Some(self)
    }

    fn sound_expander(&self) -> Option<&dyn SoundExpander> {
        Some(self)
    }

    fn masterkeyboard(&self) -> Option<&dyn Masterkeyboard> {
        Some(self)
    }
}

impl HasBanks for Ob6 {
    fn number_of_banks(&self) -> CapabilityResult<u32> {
        Ok(BANKS)
    }

    fn number_of_patches(&self) -> CapabilityResult<u32> {
        Ok(PROGRAMS_PER_BANK)
    }

    fn friendly_bank_name(&self, bank: BankNumber) -> CapabilityResult<String> {
        let first = bank.to_zero_based() * PROGRAMS_PER_BANK;
        Ok(format!("{:03} - {:03}", first, first + PROGRAMS_PER_BANK - 1))
    }
}

impl DataFileLoad for Ob6 {
    fn data_type_names(&self) -> Vec<DataFileDescription> {
        vec![
            DataFileDescription {
                data_type: DataType::Patch,
                name: "Patch".to_string(),
                can_request: true,
                can_send: true,
            },
            DataFileDescription {
                data_type: DataType::GlobalSettings,
                name: "Global Settings".to_string(),
                can_request: true,
                can_send: false,
            },
            DataFileDescription {
                data_type: DataType::AlternateTuning,
                name: "Alternate Tuning".to_string(),
                can_request: true,
                can_send: true,
            },
        ]
    }

    fn number_of_data_items(&self, data_type: DataType) -> CapabilityResult<u32> {
        Ok(match data_type {
            DataType::Patch => BANKS * PROGRAMS_PER_BANK,
            DataType::GlobalSettings => 1,
            DataType::AlternateTuning => TUNING_SLOTS,
            DataType::Other(_) => 0,
        })
    }

    fn request_data_item(
        &self,
        item_no: u32,
        data_type: DataType,
        _channel: MidiChannel,
    ) -> CapabilityResult<Vec<MidiMessage>> {
        Ok(match data_type {
            DataType::Patch => vec![self.program_dump_request(item_no)],
            DataType::GlobalSettings => vec![self.global_parameter_request()],
            DataType::AlternateTuning => vec![MidiMessage::sysex(&[
                0x7E,
                0x7F,
                MTS_SUB_ID,
                MTS_BULK_REQUEST,
                (item_no % TUNING_SLOTS) as u8,
            ])],
            DataType::Other(_) => Vec::new(),
        })
    }

    fn is_data_file(&self, message: &MidiMessage, data_type: DataType) -> bool {
        match data_type {
            DataType::Patch => {
                Self::is_own(message, PROGRAM_DUMP) || Self::is_own(message, EDIT_BUFFER_DUMP)
            }
            DataType::GlobalSettings => Self::is_own(message, GLOBAL_PARAMETER_DUMP),
            DataType::AlternateTuning => Self::is_tuning_dump(message),
            DataType::Other(_) => false,
        }
    }

    fn decode_data_item(&self, message: &MidiMessage, data_type: DataType) -> Result<PatchData> {
        match data_type {
            DataType::Patch => self.decode_program(message),
            DataType::GlobalSettings => self.decode_global_settings(message),
            DataType::AlternateTuning => self.decode_tuning(message),
            DataType::Other(id) => Err(PatchVaultError::UnsupportedDataType {
                variant: NAME.to_string(),
                data_type: id,
            }),
        }
    }
}

impl GlobalSettings for Ob6 {
    fn settings_data_type(&self) -> DataType {
        DataType::GlobalSettings
    }

    fn request_global_settings(&self, _channel: MidiChannel) -> CapabilityResult<Vec<MidiMessage>> {
        Ok(vec![self.global_parameter_request()])
    }

    fn global_settings(&self, data: &PatchData) -> CapabilityResult<Vec<SettingValue>> {
        let values = data.bytes();
        Ok(GLOBAL_PARAMS
            .iter()
            .zip(values.iter())
            .map(|(param, &raw)| {
                let value = raw.min(param.max);
                let display = param
                    .labels
                    .get(usize::from(value))
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| value.to_string());
                SettingValue {
                    name: param.name.to_string(),
                    value: i32::from(value),
                    display,
                }
            })
            .collect())
    }
}

impl SoundExpander for Ob6 {
    fn change_input_channel(
        &self,
        current: MidiChannel,
        new_channel: MidiChannel,
    ) -> CapabilityResult<Vec<MidiMessage>> {
        Ok(self.global_value(
            MIDI_CHANNEL_PARAM,
            u16::from(new_channel.to_one_based()),
            current,
        ))
    }

    fn set_midi_control(&self, channel: MidiChannel, on: bool) -> CapabilityResult<Vec<MidiMessage>> {
        Ok(self.global_value(MIDI_CONTROL_PARAM, u16::from(on), channel))
    }
}

impl Masterkeyboard for Ob6 {
    fn change_output_channel(
        &self,
        current: MidiChannel,
        new_channel: MidiChannel,
    ) -> CapabilityResult<Vec<MidiMessage>> {
        // One channel setting covers send and receive
        self.change_input_channel(current, new_channel)
    }

    fn set_local_control(&self, channel: MidiChannel, on: bool) -> CapabilityResult<Vec<MidiMessage>> {
        Ok(self.global_value(LOCAL_CONTROL_PARAM, u16::from(on), channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(name: &str, seed: u8) -> Vec<u8> {
        let mut data: Vec<u8> = (0..PROGRAM_LEN).map(|i| (i as u8).wrapping_mul(seed)).collect();
        let mut field = [b' '; NAME_LEN];
        field[..name.len()].copy_from_slice(name.as_bytes());
        data[NAME_OFFSET..NAME_OFFSET + NAME_LEN].copy_from_slice(&field);
        data
    }

    fn program_dump(bank: u8, prog: u8, data: &[u8]) -> MidiMessage {
        let mut body = vec![DSI_ID, OB6_ID, PROGRAM_DUMP, bank, prog];
        body.extend(dsi_packing::pack(data));
        MidiMessage::sysex(&body)
    }

    #[test]
    fn test_program_dump_decodes_name_and_place() {
        let ob6 = Ob6::new();
        let msg = program_dump(3, 42, &program("Brass Stab", 7));
        assert_eq!(msg.len(), PROGRAM_DUMP_LEN);

        let patch = ob6.patch_from_sysex(&msg).unwrap();
        assert_eq!(patch.name(), "Brass Stab");
        assert_eq!(patch.bytes().len(), PROGRAM_LEN);
        let place = patch.placement().unwrap();
        assert_eq!(place.bank().unwrap().to_zero_based(), 3);
        assert_eq!(place.to_zero_based(), 42);
    }

    #[test]
    fn test_edit_buffer_round_trip() {
        let ob6 = Ob6::new();
        let data = program("Pad", 3);
        let patch = PatchData::new(DataType::Patch, data.clone(), "Pad");
        let out = ob6.patch_to_sysex(&patch, MidiChannel::default()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), EDIT_BUFFER_DUMP_LEN);

        let decoded = ob6.patch_from_sysex(&out[0]).unwrap();
        assert_eq!(decoded.bytes(), &data[..]);
        assert_eq!(decoded.placement(), None);
    }

    #[test]
    fn test_program_and_edit_buffer_normalise_to_same_data() {
        let ob6 = Ob6::new();
        let data = program("Same", 5);
        let from_program = ob6.patch_from_sysex(&program_dump(0, 0, &data)).unwrap();
        let edit = ob6
            .patch_to_sysex(&from_program, MidiChannel::default())
            .unwrap();
        let from_edit = ob6.patch_from_sysex(&edit[0]).unwrap();
        assert_eq!(from_program.bytes(), from_edit.bytes());
        assert_eq!(from_program.name(), from_edit.name());
    }

    #[test]
    fn test_truncated_dump_is_a_decode_error() {
        let ob6 = Ob6::new();
        let msg = program_dump(0, 0, &program("X", 1));
        let mut bytes = msg.into_bytes();
        bytes.remove(100);
        let err = ob6.patch_from_sysex(&MidiMessage::new(bytes)).unwrap_err();
        assert!(matches!(err, PatchVaultError::Decode { .. }));
    }

    #[test]
    fn test_foreign_header_is_rejected() {
        let ob6 = Ob6::new();
        let msg = MidiMessage::sysex(&[0x01, 0x2D, PROGRAM_DUMP, 0, 0]);
        assert!(ob6.patch_from_sysex(&msg).is_err());
    }

    #[test]
    fn test_name_is_blanked_for_fingerprint() {
        let ob6 = Ob6::new();
        let a = PatchData::new(DataType::Patch, program("One", 9), "One");
        let b = PatchData::new(DataType::Patch, program("Two", 9), "Two");
        assert_ne!(a.bytes(), b.bytes());
        assert_eq!(
            ob6.filter_voice_relevant_data(&a).unwrap(),
            ob6.filter_voice_relevant_data(&b).unwrap()
        );
    }

    #[test]
    fn test_program_dump_request() {
        let ob6 = Ob6::new();
        let req = ob6
            .request_data_item(257, DataType::Patch, MidiChannel::default())
            .unwrap();
        assert_eq!(req[0].as_bytes(), &[0xF0, 0x01, 0x2E, 0x05, 2, 57, 0xF7]);
    }

    #[test]
    fn test_bank_names() {
        let ob6 = Ob6::new();
        assert_eq!(
            ob6.friendly_bank_name(BankNumber::from_zero_based(0)).unwrap(),
            "000 - 099"
        );
        assert_eq!(
            ob6.friendly_bank_name(BankNumber::from_zero_based(9)).unwrap(),
            "900 - 999"
        );
    }

    fn global_dump(values: &[u8]) -> MidiMessage {
        let mut body = vec![DSI_ID, OB6_ID, GLOBAL_PARAMETER_DUMP];
        body.extend(dsi_packing::pack(values));
        MidiMessage::sysex(&body)
    }

    #[test]
    fn test_device_response_reads_channel_from_globals() {
        let ob6 = Ob6::new();
        let mut values = vec![0u8; GLOBAL_PARAMS.len()];
        values[MIDI_CHANNEL_PARAM] = 5;
        let channel = ob6.channel_if_valid_device_response(&global_dump(&values));
        assert_eq!(channel, MidiChannel::from_one_based(5));

        values[MIDI_CHANNEL_PARAM] = 0;
        let omni = ob6.channel_if_valid_device_response(&global_dump(&values));
        assert_eq!(omni, MidiChannel::from_zero_based(0));

        let inquiry_reply = MidiMessage::sysex(&[0x7E, 0x7F, 0x06, 0x02, 0x01]);
        assert_eq!(ob6.channel_if_valid_device_response(&inquiry_reply), None);
    }

    #[test]
    fn test_global_settings_are_named() {
        let ob6 = Ob6::new();
        let mut values = vec![0u8; GLOBAL_PARAMS.len()];
        values[LOCAL_CONTROL_PARAM] = 1;
        values[3] = 2;
        let data = ob6.decode_global_settings(&global_dump(&values)).unwrap();
        let settings = GlobalSettings::global_settings(&ob6, &data).unwrap();
        assert_eq!(settings.len(), GLOBAL_PARAMS.len());
        assert_eq!(settings[LOCAL_CONTROL_PARAM].name, "Local Control");
        assert_eq!(settings[LOCAL_CONTROL_PARAM].display, "On");
        assert_eq!(settings[3].display, "Slave");
    }

    #[test]
    fn test_local_control_nrpn() {
        let ob6 = Ob6::new();
        let ch = MidiChannel::from_zero_based(1).unwrap();
        let msgs = ob6.set_local_control(ch, false).unwrap();
        let bytes: Vec<u8> = msgs.iter().flat_map(|m| m.as_bytes().to_vec()).collect();
        // 1034 = 8 * 128 + 10
        assert_eq!(bytes, vec![0xB1, 99, 8, 0xB1, 98, 10, 0xB1, 6, 0, 0xB1, 38, 0]);
    }

    #[test]
    fn test_tuning_dump_round_trip() {
        let ob6 = Ob6::new();
        let mut payload = b"Just Intonation ".to_vec();
        payload.extend((0..TUNING_DATA_LEN).map(|i| (i % 128) as u8));
        let tuning = PatchData::new(DataType::AlternateTuning, payload.clone(), "Just Intonation")
            .with_placement(ProgramNumber::from_zero_based(4));

        let msg = ob6
            .patch_to_sysex(&tuning, MidiChannel::default())
            .unwrap()
            .remove(0);
        assert_eq!(msg.len(), TUNING_DUMP_LEN);
        assert!(ob6.is_data_file(&msg, DataType::AlternateTuning));

        let decoded = ob6.decode_data_item(&msg, DataType::AlternateTuning).unwrap();
        assert_eq!(decoded.bytes(), &payload[..]);
        assert_eq!(decoded.name(), "Just Intonation");
        assert_eq!(decoded.placement().unwrap().to_zero_based(), 4);
    }

    #[test]
    fn test_tuning_slot_outside_range_is_rejected() {
        let ob6 = Ob6::new();
        let mut payload = vec![b' '; TUNING_NAME_LEN];
        payload.extend(vec![0u8; TUNING_DATA_LEN]);
        let tuning = PatchData::new(DataType::AlternateTuning, payload, "")
            .with_placement(ProgramNumber::from_zero_based(TUNING_SLOTS + 239));

        let err = ob6.patch_to_sysex(&tuning, MidiChannel::default()).unwrap_err();
        assert!(matches!(err, PatchVaultError::InvalidNumber { kind: "tuning slot", .. }));
    }

    #[test]
    fn test_tuning_checksum_mismatch_is_rejected() {
        let ob6 = Ob6::new();
        let mut payload = vec![b' '; TUNING_NAME_LEN];
        payload.extend(vec![0u8; TUNING_DATA_LEN]);
        let tuning = PatchData::new(DataType::AlternateTuning, payload, "");
        let mut bytes = ob6
            .patch_to_sysex(&tuning, MidiChannel::default())
            .unwrap()
            .remove(0)
            .into_bytes();
        let at = bytes.len() - 2;
        bytes[at] ^= 0x01;
        assert!(ob6
            .decode_data_item(&MidiMessage::new(bytes), DataType::AlternateTuning)
            .is_err());
    }
}
