//! Alesis Andromeda A6
//!
//! 16 banks of 128 programs. Program data is 2048 bytes, shift-packed into
//! 2341 wire bytes. The A6 does not accept its own edit buffer dump, so
//! sending a patch writes it to the last User program and selects it.

use crate::capability::{
    CapabilityResult, CapabilityTag, DataFileDescription, DataFileLoad, HasBanks,
};
use crate::codec::{
    blank_range, decode_error, name_from_bytes, shift_packing, ParameterDefinition, Synth,
};
use crate::errors::{CapabilityError, PatchVaultError, Result};
use crate::midi::MidiMessage;
use crate::model::{BankNumber, DataType, MidiChannel, PatchData, ProgramNumber};

const NAME: &str = "Alesis Andromeda A6";

const HEADER: [u8; 5] = [0xF0, 0x00, 0x00, 0x0E, 0x1D];
const PROGRAM_DUMP: u8 = 0x00;
const PROGRAM_DUMP_REQUEST: u8 = 0x01;
const EDIT_BUFFER_DUMP: u8 = 0x02;
const PROGRAM_EDIT_BUFFER: u8 = 0x10;

const DEVICE_INQUIRY: [u8; 6] = [0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7];
const INQUIRY_REPLY: [u8; 12] = [
    0xF0, 0x7E, 0x7F, 0x06, 0x02, 0x00, 0x00, 0x0E, 0x1D, 0x00, 0x00, 0x00,
];

const BANKS: u32 = 16;
const PROGRAMS_PER_BANK: u32 = 128;
const BANK_NAMES: [&str; 16] = [
    "User", "Preset1", "Preset2", "Card 1", "Card 2", "Card 3", "Card 4", "Card 5", "Card 6",
    "Card 7", "Card 8", "Card 9", "Card 10", "Card 11", "Card 12", "Card 13",
];

const PACKED_LEN: usize = 2341;
const PROGRAM_DUMP_LEN: usize = 8 + PACKED_LEN + 1;
const EDIT_BUFFER_DUMP_LEN: usize = 7 + PACKED_LEN + 1;
const NAME_OFFSET: usize = 2;
const NAME_LEN: usize = 16;

/// Slot the edit buffer stand-in is written to
const SEND_BANK: u8 = 0;
const SEND_PROGRAM: u8 = (PROGRAMS_PER_BANK - 1) as u8;

pub struct AndromedaA6 {
    parameters: Vec<ParameterDefinition>,
}

impl AndromedaA6 {
    pub fn new() -> Self {
        Self {
            parameters: vec![ParameterDefinition::non_voice("Name", NAME_OFFSET, NAME_LEN)],
        }
    }

    fn is_program_dump(message: &MidiMessage) -> bool {
        message.len() > 5 && message.starts_with(&HEADER) && message.as_bytes()[5] == PROGRAM_DUMP
    }

    fn is_edit_buffer_dump(message: &MidiMessage) -> bool {
        message.len() > 6
            && message.starts_with(&HEADER)
            && message.as_bytes()[5] == EDIT_BUFFER_DUMP
            && message.as_bytes()[6] == PROGRAM_EDIT_BUFFER
    }

    /// Request for flat program `flat`, wrapped around the bank range
    fn program_dump_request(&self, flat: u32) -> MidiMessage {
        let flat = flat % (BANKS * PROGRAMS_PER_BANK);
        MidiMessage::sysex(&[
            0x00,
            0x00,
            0x0E,
            0x1D,
            PROGRAM_DUMP_REQUEST,
            (flat / PROGRAMS_PER_BANK) as u8,
            (flat % PROGRAMS_PER_BANK) as u8,
        ])
    }

    fn program_dump(&self, patch: &PatchData, bank: u8, program: u8) -> Result<MidiMessage> {
        if patch.data_type() != DataType::Patch {
            return Err(PatchVaultError::UnsupportedDataType {
                variant: NAME.to_string(),
                data_type: patch.data_type().id(),
            });
        }
        let mut body = vec![0x00, 0x00, 0x0E, 0x1D, PROGRAM_DUMP, bank, program];
        body.extend(shift_packing::pack(patch.bytes()));
        Ok(MidiMessage::sysex(&body))
    }
}

impl Default for AndromedaA6 {
    fn default() -> Self {
        Self::new()
    }
}

impl Synth for AndromedaA6 {
    fn name(&self) -> &str {
        NAME
    }

    fn device_detect(&self, _channel: MidiChannel) -> Result<Vec<MidiMessage>> {
        Ok(vec![MidiMessage::new(DEVICE_INQUIRY.to_vec())])
    }

    fn channel_if_valid_device_response(&self, message: &MidiMessage) -> Option<MidiChannel> {
        // The reply carries no channel; any match counts as channel 1
        if message.len() > INQUIRY_REPLY.len() && message.starts_with(&INQUIRY_REPLY) {
            MidiChannel::from_zero_based(0)
        } else {
            None
        }
    }

    fn patch_from_sysex(&self, message: &MidiMessage) -> Result<PatchData> {
        let bytes = message.as_bytes();
        let (placement, packed) = if Self::is_program_dump(message) {
            if bytes.len() != PROGRAM_DUMP_LEN {
                return Err(decode_error(
                    NAME,
                    format!("program dump has {} bytes, expected {}", bytes.len(), PROGRAM_DUMP_LEN),
                ));
            }
            let (bank, program) = (u32::from(bytes[6]), u32::from(bytes[7]));
            if bank >= BANKS || program >= PROGRAMS_PER_BANK {
                return Err(decode_error(
                    NAME,
                    format!("program dump addresses bank {} program {}", bank, program),
                ));
            }
            let place = ProgramNumber::in_bank(BankNumber::from_zero_based(bank), program);
            (Some(place), &bytes[8..bytes.len() - 1])
        } else if Self::is_edit_buffer_dump(message) {
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
            (None, &bytes[7..bytes.len() - 1])
        } else {
            return Err(decode_error(NAME, "not an Andromeda program or edit buffer dump"));
        };

        if !message.is_sysex() {
            return Err(decode_error(NAME, "dump is not terminated by F7"));
        }
        let data = shift_packing::unpack(packed);
        let name = name_from_bytes(&data[NAME_OFFSET..NAME_OFFSET + NAME_LEN]);
        let patch = PatchData::new(DataType::Patch, data, name);
        Ok(match placement {
            Some(place) => patch.with_placement(place),
            None => patch,
        })
    }

    fn patch_to_sysex(&self, patch: &PatchData, channel: MidiChannel) -> Result<Vec<MidiMessage>> {
        let dump = self.program_dump(patch, SEND_BANK, SEND_PROGRAM)?;
        Ok(vec![dump, MidiMessage::program_change(channel, SEND_PROGRAM)])
    }

    fn filter_voice_relevant_data(&self, data: &PatchData) -> Result<Vec<u8>> {
        Ok(blank_range(data.bytes(), NAME_OFFSET..NAME_OFFSET + NAME_LEN))
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
}

impl HasBanks for AndromedaA6 {
    fn number_of_banks(&self) -> CapabilityResult<u32> {
        Ok(BANKS)
    }

    fn number_of_patches(&self) -> CapabilityResult<u32> {
        Ok(PROGRAMS_PER_BANK)
    }

    fn friendly_bank_name(&self, bank: BankNumber) -> CapabilityResult<String> {
        BANK_NAMES
            .get(bank.to_zero_based() as usize)
            .map(|name| name.to_string())
            .ok_or_else(|| {
                CapabilityError::new(
                    CapabilityTag::HasBanks,
                    format!("bank {} does not exist", bank),
                )
            })
    }
}

impl DataFileLoad for AndromedaA6 {
    fn data_type_names(&self) -> Vec<DataFileDescription> {
        vec![DataFileDescription {
            data_type: DataType::Patch,
            name: "Program".to_string(),
            can_request: true,
            can_send: true,
        }]
    }

    fn number_of_data_items(&self, data_type: DataType) -> CapabilityResult<u32> {
        Ok(match data_type {
            DataType::Patch => BANKS * PROGRAMS_PER_BANK,
            _ => 0,
        })
    }

    fn request_data_item(
        &self,
        item_no: u32,
        data_type: DataType,
        _channel: MidiChannel,
    ) -> CapabilityResult<Vec<MidiMessage>> {
        match data_type {
            DataType::Patch => Ok(vec![self.program_dump_request(item_no)]),
            other => Err(CapabilityError::new(
                CapabilityTag::DataFileLoad,
                format!("cannot request {}", other),
            )),
        }
    }

    fn is_data_file(&self, message: &MidiMessage, data_type: DataType) -> bool {
        data_type == DataType::Patch
            && (Self::is_program_dump(message) || Self::is_edit_buffer_dump(message))
    }

    fn decode_data_item(&self, message: &MidiMessage, data_type: DataType) -> Result<PatchData> {
        match data_type {
            DataType::Patch => self.patch_from_sysex(message),
            other => Err(PatchVaultError::UnsupportedDataType {
                variant: NAME.to_string(),
                data_type: other.id(),
            }),
        }
    }
}
