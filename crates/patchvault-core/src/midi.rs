//! Raw MIDI messages as exchanged with the transport

use crate::model::MidiChannel;
use serde::{Deserialize, Serialize};

pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;

/// One complete MIDI message (a sysex frame including `F0`/`F7`, or a
/// channel message)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MidiMessage(Vec<u8>);

impl MidiMessage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Wrap a sysex body in `F0 ... F7`
    pub fn sysex(body: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(body.len() + 2);
        bytes.push(SYSEX_START);
        bytes.extend_from_slice(body);
        bytes.push(SYSEX_END);
        Self(bytes)
    }

    pub fn program_change(channel: MidiChannel, program: u8) -> Self {
        Self(vec![0xC0 | channel.to_zero_based(), program & 0x7F])
    }

    pub fn control_change(channel: MidiChannel, controller: u8, value: u8) -> Self {
        Self(vec![
            0xB0 | channel.to_zero_based(),
            controller & 0x7F,
            value & 0x7F,
        ])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_sysex(&self) -> bool {
        self.0.len() >= 2
            && self.0.first() == Some(&SYSEX_START)
            && self.0.last() == Some(&SYSEX_END)
    }

    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.0.starts_with(prefix)
    }
}

impl From<Vec<u8>> for MidiMessage {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Non-registered parameter change as a CC 99/98/6/38 sequence
pub fn nrpn(channel: MidiChannel, parameter: u16, value: u16) -> Vec<MidiMessage> {
    let parameter = parameter & 0x3FFF;
    let value = value & 0x3FFF;
    vec![
        MidiMessage::control_change(channel, 99, (parameter >> 7) as u8),
        MidiMessage::control_change(channel, 98, (parameter & 0x7F) as u8),
        MidiMessage::control_change(channel, 6, (value >> 7) as u8),
        MidiMessage::control_change(channel, 38, (value & 0x7F) as u8),
    ]
}

/// Split a byte stream into sysex frames and channel messages
///
/// Running status and stray data bytes are dropped. Used for byte strings
/// returned by scripted adaptations, which may append a program change to a
/// dump.
pub fn parse_stream(bytes: &[u8]) -> Vec<MidiMessage> {
    let mut messages = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let status = bytes[i];
        let len = match status {
            SYSEX_START => match bytes[i..].iter().position(|&b| b == SYSEX_END) {
                Some(end) => end + 1,
                None => bytes.len() - i,
            },
            0x80..=0xBF | 0xE0..=0xEF => 3,
            0xC0..=0xDF => 2,
            _ => {
                i += 1;
                continue;
            }
        };
        let end = (i + len).min(bytes.len());
        messages.push(MidiMessage::new(bytes[i..end].to_vec()));
        i = end;
    }
    messages
}

/// Concatenate messages into one byte stream, as written to a `.syx` file
pub fn to_stream(messages: &[MidiMessage]) -> Vec<u8> {
    messages
        .iter()
        .flat_map(|m| m.as_bytes().iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sysex_wrapping() {
        let m = MidiMessage::sysex(&[0x7E, 0x7F, 0x06, 0x01]);
        assert_eq!(m.as_bytes(), &[0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7]);
        assert!(m.is_sysex());
        assert!(!MidiMessage::new(vec![0xC0, 1]).is_sysex());
    }

    #[test]
    fn test_parse_stream_keeps_trailing_program_change() {
        let msgs = parse_stream(&[0xF0, 0x00, 0x01, 0xF7, 0xC3, 0x7F, 0x12]);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].as_bytes(), &[0xF0, 0x00, 0x01, 0xF7]);
        assert_eq!(msgs[1].as_bytes(), &[0xC3, 0x7F]);
    }

    #[test]
    fn test_nrpn_sequence() {
        let ch = MidiChannel::from_zero_based(2).unwrap();
        let msgs = nrpn(ch, 1025, 300);
        let bytes = to_stream(&msgs);
        assert_eq!(
            bytes,
            vec![0xB2, 99, 8, 0xB2, 98, 1, 0xB2, 6, 2, 0xB2, 38, 44]
        );
    }
}
